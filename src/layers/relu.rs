//! ReLU activation layer
//!
//! Elementwise `max(0, x)`. The forward input is cached so the backward
//! pass can zero the gradient wherever the activation was clipped.

use crate::error::CnnError;
use crate::layers::Layer;
use crate::tensor::Tensor;

/// Rectified linear unit activation.
pub struct ReluLayer {
    cached_input: Option<Tensor>,
}

impl ReluLayer {
    pub fn new() -> Self {
        Self { cached_input: None }
    }
}

impl Default for ReluLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for ReluLayer {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, CnnError> {
        log::debug!("relu forward: {}", input.shape());
        self.cached_input = Some(input.clone());
        Ok(input.relu())
    }

    /// Gradient passes through where the cached input was positive and is
    /// zeroed elsewhere. The subgradient at exactly zero is taken as zero.
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, CnnError> {
        let input = self
            .cached_input
            .as_ref()
            .ok_or(CnnError::BackwardBeforeForward { layer: self.name() })?;
        if input.shape() != grad.shape() {
            return Err(CnnError::ShapeMismatch {
                op: "relu_backward",
                left: input.shape(),
                right: grad.shape(),
            });
        }

        let mut out = grad.clone();
        for (g, &x) in out.data_mut().iter_mut().zip(input.data().iter()) {
            if x <= 0.0 {
                *g = 0.0;
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "relu"
    }

    fn parameter_count(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu_forward_clips_negatives() {
        let mut layer = ReluLayer::new();
        let input = Tensor::from_vec(1, 1, 1, 4, vec![-1.0, 0.0, 0.5, 2.0]).unwrap();
        let out = layer.forward(&input).unwrap();
        assert_eq!(out.data(), &[0.0, 0.0, 0.5, 2.0]);
    }

    #[test]
    fn test_relu_backward_masks_gradient() {
        let mut layer = ReluLayer::new();
        let input = Tensor::from_vec(1, 1, 1, 4, vec![-1.0, 0.0, 0.5, 2.0]).unwrap();
        layer.forward(&input).unwrap();

        let grad = Tensor::from_vec(1, 1, 1, 4, vec![1.0, 1.0, 1.0, 1.0]).unwrap();
        let grad_input = layer.backward(&grad).unwrap();
        assert_eq!(grad_input.data(), &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_relu_backward_before_forward() {
        let mut layer = ReluLayer::new();
        let grad = Tensor::new(1, 1, 1, 4);
        assert!(layer.backward(&grad).is_err());
    }
}
