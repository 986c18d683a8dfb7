//! Layer trait definition
//!
//! Defines the uniform forward/backward contract every layer implements.
//! The network composes layers as `Box<dyn Layer>` trait objects, so adding
//! a new layer type never touches the training loop.

use crate::error::CnnError;
use crate::tensor::Tensor;

/// Core trait for network layers.
///
/// A layer maps a 4-axis activation tensor to another 4-axis activation
/// tensor. During the forward pass a layer caches whatever it needs for
/// gradient computation (typically its input); the backward pass consumes
/// the gradient of the loss with respect to the layer's output and returns
/// the gradient with respect to its input.
///
/// Learnable layers apply their own parameter update inside `backward`,
/// after computing the input gradient from the pre-update parameters.
pub trait Layer {
    /// Forward propagation.
    ///
    /// Caches intermediate state for the next `backward` call. Shape
    /// violations surface as errors rather than panics.
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, CnnError>;

    /// Backward propagation.
    ///
    /// `grad` is the loss gradient at this layer's output; the result is
    /// the loss gradient at this layer's input. Calling this without a
    /// preceding `forward` is a [`CnnError::BackwardBeforeForward`] error.
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, CnnError>;

    /// Short layer name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Total count of trainable parameters (weights plus biases).
    fn parameter_count(&self) -> usize;

    /// Toggle training mode.
    ///
    /// Only layers whose behavior differs between training and inference
    /// (dropout) override this; the default is a no-op.
    fn set_training(&mut self, _training: bool) {}
}
