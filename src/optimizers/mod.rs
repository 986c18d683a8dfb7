//! Optimizer abstractions for parameter updates
//!
//! Optimizers define how gradients modify model parameters. The library
//! ships vanilla stochastic gradient descent; the trait keeps the update
//! rule behind a uniform interface so learnable layers never know which
//! algorithm is stepping their parameters.
//!
//! # Example
//!
//! ```
//! use rust_convnet::optimizers::{Optimizer, Sgd};
//!
//! let mut optimizer = Sgd::new(0.1);
//! let mut weights = vec![1.0, 2.0];
//! let gradients = vec![0.5, 0.5];
//! optimizer.update(&mut weights, &gradients);
//! assert!((weights[0] - 0.95).abs() < 1e-6);
//! ```

pub mod sgd;

pub use sgd::Sgd;

/// Core trait for parameter-update algorithms.
///
/// Learnable layers own one optimizer per parameter group and call
/// [`Optimizer::update`] at the end of their backward pass, after the batch
/// gradients have been reduced.
pub trait Optimizer {
    /// Apply the update rule to `parameters` in place.
    ///
    /// Gradients must already be reduced over the batch; one slot per
    /// parameter.
    ///
    /// # Panics
    ///
    /// Implementations may panic if `parameters` and `gradients` have
    /// different lengths.
    fn update(&mut self, parameters: &mut [f32], gradients: &[f32]);

    /// Clear any accumulated internal state.
    ///
    /// A no-op for stateless optimizers.
    fn reset(&mut self);

    /// Current base learning rate.
    fn learning_rate(&self) -> f32;

    /// Replace the base learning rate, e.g. for a decay schedule.
    fn set_learning_rate(&mut self, lr: f32);
}

/// Optimizer selection as it appears in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    Sgd,
}

impl OptimizerKind {
    /// Parse a configuration string (case insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sgd" => Some(OptimizerKind::Sgd),
            _ => None,
        }
    }

    /// Instantiate the selected optimizer.
    pub fn build(self, learning_rate: f32) -> Sgd {
        match self {
            OptimizerKind::Sgd => Sgd::new(learning_rate),
        }
    }
}
