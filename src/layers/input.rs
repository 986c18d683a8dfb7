//! Input layer implementation
//!
//! The input layer performs no computation. It anchors the front of the
//! network and validates that incoming batches match the configured sample
//! shape, so a mis-sized dataset fails loudly at the first forward pass
//! instead of deep inside a convolution.

use crate::error::CnnError;
use crate::layers::Layer;
use crate::tensor::{Shape, Tensor};

/// Identity layer that validates the per-sample input shape.
///
/// The batch axis is free; channels, rows, and cols must match the
/// configured shape exactly.
pub struct InputLayer {
    channels: usize,
    rows: usize,
    cols: usize,
}

impl InputLayer {
    /// Creates an input layer expecting `(channels, rows, cols)` samples.
    pub fn new(channels: usize, rows: usize, cols: usize) -> Self {
        Self {
            channels,
            rows,
            cols,
        }
    }
}

impl Layer for InputLayer {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, CnnError> {
        let s = input.shape();
        if s.channels != self.channels || s.rows != self.rows || s.cols != self.cols {
            return Err(CnnError::InvalidInput {
                layer: self.name(),
                expected: Shape::new(s.batches, self.channels, self.rows, self.cols),
                got: s,
            });
        }
        log::debug!("input forward: {}", s);
        Ok(input.clone())
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, CnnError> {
        Ok(grad.clone())
    }

    fn name(&self) -> &'static str {
        "input"
    }

    fn parameter_count(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_passes_matching_shape() {
        let mut layer = InputLayer::new(1, 28, 28);
        let batch = Tensor::new(4, 1, 28, 28);
        let out = layer.forward(&batch).unwrap();
        assert_eq!(out, batch);
    }

    #[test]
    fn test_input_rejects_wrong_shape() {
        let mut layer = InputLayer::new(1, 28, 28);
        let batch = Tensor::new(4, 3, 28, 28);
        let err = layer.forward(&batch).unwrap_err();
        assert!(err.to_string().contains("input"));
    }

    #[test]
    fn test_input_backward_is_identity() {
        let mut layer = InputLayer::new(1, 2, 2);
        let grad = Tensor::from_vec(1, 1, 2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(layer.backward(&grad).unwrap(), grad);
    }

    #[test]
    fn test_input_has_no_parameters() {
        let layer = InputLayer::new(1, 28, 28);
        assert_eq!(layer.parameter_count(), 0);
    }
}
