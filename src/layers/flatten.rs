//! Flatten layer implementation
//!
//! Bridges the spatial stage of the network to the dense stage by
//! collapsing `(B, C, R, W)` activations into `(B, 1, 1, C*R*W)` row
//! vectors. Backward restores the cached spatial shape.

use crate::error::CnnError;
use crate::layers::Layer;
use crate::tensor::{Shape, Tensor};

/// Collapses channels, rows, and cols into a single feature axis.
pub struct FlattenLayer {
    cached_shape: Option<Shape>,
}

impl FlattenLayer {
    pub fn new() -> Self {
        Self { cached_shape: None }
    }
}

impl Default for FlattenLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for FlattenLayer {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, CnnError> {
        self.cached_shape = Some(input.shape());
        let out = input.flatten();
        log::debug!("flatten forward: {} -> {}", input.shape(), out.shape());
        Ok(out)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, CnnError> {
        let shape = self
            .cached_shape
            .ok_or(CnnError::BackwardBeforeForward { layer: self.name() })?;
        grad.reshape(shape)
    }

    fn name(&self) -> &'static str {
        "flatten"
    }

    fn parameter_count(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_forward_shape() {
        let mut layer = FlattenLayer::new();
        let input = Tensor::new(2, 3, 4, 5);
        let out = layer.forward(&input).unwrap();
        assert_eq!(out.shape(), Shape::new(2, 1, 1, 60));
    }

    #[test]
    fn test_flatten_backward_restores_shape() {
        let mut layer = FlattenLayer::new();
        let input = Tensor::from_vec(1, 2, 2, 2, (0..8).map(|i| i as f32).collect()).unwrap();
        let flat = layer.forward(&input).unwrap();
        let restored = layer.backward(&flat).unwrap();
        assert_eq!(restored, input);
    }

    #[test]
    fn test_flatten_backward_before_forward() {
        let mut layer = FlattenLayer::new();
        assert!(layer.backward(&Tensor::new(1, 1, 1, 8)).is_err());
    }
}
