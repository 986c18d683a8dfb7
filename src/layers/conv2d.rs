//! 2D convolutional layer implementation
//!
//! Learns a bank of square filters applied to every spatial position of
//! the input. The layer has no bias term; a following dense stage carries
//! the affine offset for this architecture.

use crate::error::CnnError;
use crate::layers::Layer;
use crate::optimizers::{Optimizer, Sgd};
use crate::tensor::Tensor;
use crate::utils::SimpleRng;

/// Convolutional layer with a `(filters, in_channels, k, k)` weight bank.
///
/// Weights are He-initialized. The backward pass computes the input
/// gradient against the pre-update filters, averages the filter gradient
/// over the batch, and then steps the filters with the layer's own SGD
/// instance.
pub struct Conv2DLayer {
    filters: Tensor,
    stride: usize,
    padding: usize,
    optimizer: Sgd,
    cached_input: Option<Tensor>,
}

impl Conv2DLayer {
    /// Creates a convolutional layer with He-initialized filters.
    pub fn new(
        in_channels: usize,
        num_filters: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        learning_rate: f32,
        rng: &mut SimpleRng,
    ) -> Self {
        let mut filters = Tensor::new(num_filters, in_channels, kernel_size, kernel_size);
        filters.he_init(rng);

        Self {
            filters,
            stride,
            padding,
            optimizer: Sgd::new(learning_rate),
            cached_input: None,
        }
    }

    /// Creates a layer from an explicit filter bank, bypassing random
    /// initialization. Useful for tests with known kernels.
    pub fn from_parts(filters: Tensor, stride: usize, padding: usize, learning_rate: f32) -> Self {
        Self {
            filters,
            stride,
            padding,
            optimizer: Sgd::new(learning_rate),
            cached_input: None,
        }
    }

    /// Borrow the current filter bank.
    pub fn filters(&self) -> &Tensor {
        &self.filters
    }
}

impl Layer for Conv2DLayer {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, CnnError> {
        let out = input.convolve(&self.filters, self.stride, self.padding)?;
        log::debug!(
            "conv2d forward: {} * {} -> {}",
            input.shape(),
            self.filters.shape(),
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

        // Input gradient must use the filters as they were in the forward
        // pass, so it is computed before the SGD step.
        let grad_input = grad.conv_input_grad(&self.filters, self.stride, self.padding)?;

        let grad_filters = input
            .conv_filter_grad(grad, &self.filters, self.stride, self.padding)?
            .scale(1.0 / input.batches() as f32);
        self.optimizer
            .update(self.filters.data_mut(), grad_filters.data());

        log::debug!("conv2d backward: grad {} -> {}", grad.shape(), grad_input.shape());
        Ok(grad_input)
    }

    fn name(&self) -> &'static str {
        "conv2d"
    }

    fn parameter_count(&self) -> usize {
        self.filters.shape().len()
    }
}
