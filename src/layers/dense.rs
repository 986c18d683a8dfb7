//! Fully connected (dense) layer implementation
//!
//! Affine projection `y = x W + b` over flattened feature rows. The whole
//! layer is expressed through tensor operations: the batched matrix
//! multiply broadcasts one shared weight matrix across the batch, and the
//! gradients fall out of the same primitives (transpose, matmul, batch
//! reductions).

use crate::error::CnnError;
use crate::layers::Layer;
use crate::optimizers::{Optimizer, Sgd};
use crate::tensor::{Shape, Tensor};
use crate::utils::SimpleRng;

/// Fully connected layer with He-initialized weights and zero biases.
///
/// Weights live in a `(1, 1, input_size, output_size)` tensor and biases
/// in `(1, 1, 1, output_size)`. The backward pass averages the weight
/// gradient over the batch, sums the bias gradient over the batch, and
/// steps both with the layer's own SGD instance after the input gradient
/// has been computed from the pre-update weights.
pub struct DenseLayer {
    weights: Tensor,
    biases: Tensor,
    optimizer: Sgd,
    cached_input: Option<Tensor>,
}

impl DenseLayer {
    /// Creates a dense layer with He-initialized weights and zero biases.
    pub fn new(
        input_size: usize,
        output_size: usize,
        learning_rate: f32,
        rng: &mut SimpleRng,
    ) -> Self {
        let mut weights = Tensor::new(1, 1, input_size, output_size);
        weights.he_init(rng);

        Self {
            weights,
            biases: Tensor::new(1, 1, 1, output_size),
            optimizer: Sgd::new(learning_rate),
            cached_input: None,
        }
    }

    /// Creates a layer from explicit parameters, bypassing random
    /// initialization. Useful for tests that need known weights.
    pub fn from_parts(
        weights: Tensor,
        biases: Tensor,
        learning_rate: f32,
    ) -> Result<Self, CnnError> {
        let w = weights.shape();
        let b = biases.shape();
        if w.batches != 1 || w.channels != 1 || b != Shape::new(1, 1, 1, w.cols) {
            return Err(CnnError::ShapeMismatch {
                op: "dense_from_parts",
                left: w,
                right: b,
            });
        }
        Ok(Self {
            weights,
            biases,
            optimizer: Sgd::new(learning_rate),
            cached_input: None,
        })
    }

    /// Borrow the current weight matrix.
    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    /// Borrow the current bias row.
    pub fn biases(&self) -> &Tensor {
        &self.biases
    }
}

impl Layer for DenseLayer {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, CnnError> {
        let mut out = input.matmul(&self.weights)?;
        out.add_biases(&self.biases)?;
        log::debug!(
            "dense forward: {} x {} -> {}",
            input.shape(),
            self.weights.shape(),
            out.shape()
        );
        self.cached_input = Some(input.clone());
        Ok(out)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, CnnError> {
        let input = self
            .cached_input
            .as_ref()
            .ok_or(CnnError::BackwardBeforeForward { layer: self.name() })?;

        // dL/dW = mean over batch of input^T x grad; dL/db = batch sum.
        let grad_weights = input.transpose().matmul(grad)?.mean_batches();
        let grad_biases = grad.sum_batches();

        // Input gradient from the pre-update weights.
        let grad_input = grad.matmul(&self.weights.transpose())?;

        self.optimizer
            .update(self.weights.data_mut(), grad_weights.data());
        self.optimizer
            .update(self.biases.data_mut(), grad_biases.data());

        Ok(grad_input)
    }

    fn name(&self) -> &'static str {
        "fully_connected"
    }

    fn parameter_count(&self) -> usize {
        self.weights.shape().len() + self.biases.shape().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_forward_known_values() {
        // y = x W + b with identity-like weights.
        let weights = Tensor::from_vec(1, 1, 2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let biases = Tensor::from_vec(1, 1, 1, 2, vec![0.5, -0.5]).unwrap();
        let mut layer = DenseLayer::from_parts(weights, biases, 0.01).unwrap();

        let input = Tensor::from_vec(2, 1, 1, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let out = layer.forward(&input).unwrap();
        assert_eq!(out.data(), &[1.5, 1.5, 3.5, 3.5]);
    }

    #[test]
    fn test_dense_parameter_count() {
        let mut rng = SimpleRng::new(3);
        let layer = DenseLayer::new(100, 10, 0.01, &mut rng);
        assert_eq!(layer.parameter_count(), 100 * 10 + 10);
    }

    #[test]
    fn test_dense_from_parts_rejects_mismatched_bias() {
        let weights = Tensor::new(1, 1, 4, 3);
        let biases = Tensor::new(1, 1, 1, 4);
        assert!(DenseLayer::from_parts(weights, biases, 0.01).is_err());
    }

    #[test]
    fn test_dense_backward_before_forward() {
        let mut rng = SimpleRng::new(3);
        let mut layer = DenseLayer::new(4, 2, 0.01, &mut rng);
        assert!(layer.backward(&Tensor::new(1, 1, 1, 2)).is_err());
    }

    #[test]
    fn test_dense_backward_input_gradient() {
        // With W = [[2, 0], [0, 3]] the input gradient is grad W^T.
        let weights = Tensor::from_vec(1, 1, 2, 2, vec![2.0, 0.0, 0.0, 3.0]).unwrap();
        let biases = Tensor::new(1, 1, 1, 2);
        let mut layer = DenseLayer::from_parts(weights, biases, 0.0).unwrap();

        let input = Tensor::from_vec(1, 1, 1, 2, vec![1.0, 1.0]).unwrap();
        layer.forward(&input).unwrap();

        let grad = Tensor::from_vec(1, 1, 1, 2, vec![1.0, 1.0]).unwrap();
        let grad_input = layer.backward(&grad).unwrap();
        assert_eq!(grad_input.data(), &[2.0, 3.0]);
    }

    #[test]
    fn test_dense_backward_updates_parameters() {
        // lr = 1.0 makes the parameter step equal to minus the gradient.
        let weights = Tensor::from_vec(1, 1, 1, 2, vec![0.0, 0.0]).unwrap();
        let biases = Tensor::from_vec(1, 1, 1, 2, vec![0.0, 0.0]).unwrap();
        let mut layer = DenseLayer::from_parts(weights, biases, 1.0).unwrap();

        // Two samples: inputs 1 and 3, output gradient 1 for both units.
        let input = Tensor::from_vec(2, 1, 1, 1, vec![1.0, 3.0]).unwrap();
        layer.forward(&input).unwrap();
        let grad = Tensor::from_vec(2, 1, 1, 2, vec![1.0, 1.0, 1.0, 1.0]).unwrap();
        layer.backward(&grad).unwrap();

        // Weight gradient is the batch mean (1*1 + 3*1)/2 = 2; bias
        // gradient is the batch sum 2.
        assert_eq!(layer.weights().data(), &[-2.0, -2.0]);
        assert_eq!(layer.biases().data(), &[-2.0, -2.0]);
    }

    #[test]
    fn test_dense_he_init_nonzero_weights_zero_biases() {
        let mut rng = SimpleRng::new(11);
        let layer = DenseLayer::new(8, 4, 0.01, &mut rng);
        assert!(layer.weights().data().iter().any(|&w| w != 0.0));
        assert!(layer.biases().data().iter().all(|&b| b == 0.0));
    }
}
