//! Softmax output layer
//!
//! Converts the final dense layer's class scores into a probability
//! distribution. Paired with the cross-entropy loss, the backward pass
//! collapses to the well-known shortcut `probabilities - targets`, so the
//! gradient fed into this layer is the one-hot target batch itself rather
//! than a loss derivative.

use crate::error::CnnError;
use crate::layers::Layer;
use crate::tensor::{Shape, Tensor};

/// Softmax head over `(batches, 1, 1, classes)` score vectors.
pub struct SoftmaxLayer {
    cached_output: Option<Tensor>,
}

impl SoftmaxLayer {
    pub fn new() -> Self {
        Self {
            cached_output: None,
        }
    }
}

impl Default for SoftmaxLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for SoftmaxLayer {
    /// Normalizes each sample's class scores into probabilities.
    ///
    /// The dense stage emits `(B, 1, 1, K)` rows while the softmax kernel
    /// reduces along the channel axis, so the scores are viewed as
    /// `(B, K, 1, 1)` first. Both shapes index the same flat buffer
    /// identically, making the view a metadata change.
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, CnnError> {
        let s = input.shape();
        if s.channels != 1 || s.rows != 1 {
            return Err(CnnError::InvalidInput {
                layer: self.name(),
                expected: Shape::new(s.batches, 1, 1, s.cols),
                got: s,
            });
        }

        let scores = input.reshape(Shape::new(s.batches, s.cols, 1, 1))?;
        let probs = scores.softmax().reshape(s)?;
        log::debug!("softmax forward: {}", s);
        self.cached_output = Some(probs.clone());
        Ok(probs)
    }

    /// Combined softmax plus cross-entropy gradient.
    ///
    /// `grad` must be the one-hot target batch with the same shape as the
    /// cached probabilities; the result is `probabilities - targets`.
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, CnnError> {
        let probs = self
            .cached_output
            .as_ref()
            .ok_or(CnnError::BackwardBeforeForward { layer: self.name() })?;
        probs.sub(grad)
    }

    fn name(&self) -> &'static str {
        "softmax"
    }

    fn parameter_count(&self) -> usize {
        0
    }
}
