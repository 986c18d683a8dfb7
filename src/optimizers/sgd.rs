//! Stochastic Gradient Descent (SGD) optimizer implementation
//!
//! Vanilla gradient descent: `parameter = parameter - learning_rate * gradient`,
//! with no momentum and no adaptive statistics.

use crate::optimizers::Optimizer;

/// Stochastic Gradient Descent optimizer.
///
/// `w = w - η * ∂L/∂w`, where η is the learning rate.
///
/// # Example
///
/// ```
/// use rust_convnet::optimizers::{Optimizer, Sgd};
///
/// let mut optimizer = Sgd::new(0.01);
/// let mut weights = vec![1.0, 2.0, 3.0];
/// let gradients = vec![0.1, 0.2, 0.3];
///
/// optimizer.update(&mut weights, &gradients);
/// assert!((weights[0] - 0.999).abs() < 1e-6);
/// ```
pub struct Sgd {
    learning_rate: f32,
}

impl Sgd {
    /// Creates a new SGD optimizer with the specified learning rate.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for Sgd {
    /// Apply `parameter[i] -= learning_rate * gradient[i]` for each slot.
    ///
    /// # Panics
    ///
    /// Panics if `parameters` and `gradients` have different lengths.
    fn update(&mut self, parameters: &mut [f32], gradients: &[f32]) {
        assert_eq!(
            parameters.len(),
            gradients.len(),
            "Parameters and gradients must have the same length"
        );

        for (param, grad) in parameters.iter_mut().zip(gradients.iter()) {
            *param -= self.learning_rate * grad;
        }
    }

    fn reset(&mut self) {
        // Vanilla SGD has no state to reset
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sgd_new() {
        let optimizer = Sgd::new(0.01);
        assert_eq!(optimizer.learning_rate(), 0.01);
    }

    #[test]
    fn test_sgd_update() {
        let mut optimizer = Sgd::new(0.1);
        let mut params = vec![1.0, 2.0, 3.0];
        let grads = vec![0.1, 0.2, 0.3];

        optimizer.update(&mut params, &grads);

        assert!((params[0] - 0.99).abs() < 1e-6);
        assert!((params[1] - 1.98).abs() < 1e-6);
        assert!((params[2] - 2.97).abs() < 1e-6);
    }

    #[test]
    fn test_sgd_multiple_updates() {
        let mut optimizer = Sgd::new(0.01);
        let mut params = vec![1.0, 1.0];
        let grads = vec![1.0, -1.0];

        optimizer.update(&mut params, &grads);
        assert!((params[0] - 0.99).abs() < 1e-6);
        assert!((params[1] - 1.01).abs() < 1e-6);

        optimizer.update(&mut params, &grads);
        assert!((params[0] - 0.98).abs() < 1e-6);
        assert!((params[1] - 1.02).abs() < 1e-6);
    }

    #[test]
    fn test_sgd_learning_rate_update() {
        let mut optimizer = Sgd::new(0.1);
        optimizer.set_learning_rate(0.01);
        assert_eq!(optimizer.learning_rate(), 0.01);

        let mut params = vec![1.0];
        let grads = vec![1.0];
        optimizer.update(&mut params, &grads);
        assert!((params[0] - 0.99).abs() < 1e-6);
    }

    #[test]
    fn test_sgd_reset_is_noop() {
        let mut optimizer = Sgd::new(0.01);
        optimizer.reset();
        assert_eq!(optimizer.learning_rate(), 0.01);
    }

    #[test]
    #[should_panic(expected = "Parameters and gradients must have the same length")]
    fn test_sgd_mismatched_lengths() {
        let mut optimizer = Sgd::new(0.01);
        let mut params = vec![1.0, 2.0];
        let grads = vec![0.1, 0.2, 0.3];
        optimizer.update(&mut params, &grads);
    }

    #[test]
    fn test_sgd_zero_learning_rate() {
        let mut optimizer = Sgd::new(0.0);
        let mut params = vec![1.0, 2.0, 3.0];
        let original = params.clone();
        let grads = vec![0.1, 0.2, 0.3];

        optimizer.update(&mut params, &grads);

        assert_eq!(params, original);
    }
}
