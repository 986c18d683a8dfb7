//! Dropout layer implementation for regularization
//!
//! During training, randomly zeroes a fraction of activations and scales
//! the survivors by 1/(1-drop_rate) so the expected activation is
//! preserved (inverted dropout). During inference the layer is the
//! identity.

use crate::error::CnnError;
use crate::layers::Layer;
use crate::tensor::Tensor;
use crate::utils::SimpleRng;

/// Dropout regularization layer.
///
/// Holds its own RNG clone so mask generation is reproducible under a
/// fixed seed regardless of what other components draw from the source
/// generator.
pub struct DropoutLayer {
    drop_rate: f32,
    training: bool,
    mask: Vec<f32>,
    rng: SimpleRng,
}

impl DropoutLayer {
    /// Creates a new dropout layer.
    ///
    /// # Panics
    ///
    /// Panics unless `drop_rate` is in `[0.0, 1.0)`.
    pub fn new(drop_rate: f32, rng: &mut SimpleRng) -> Self {
        assert!(
            (0.0..1.0).contains(&drop_rate),
            "drop_rate must be in range [0.0, 1.0)"
        );

        Self {
            drop_rate,
            training: true,
            mask: Vec::new(),
            rng: rng.clone(),
        }
    }

    pub fn drop_rate(&self) -> f32 {
        self.drop_rate
    }

    pub fn is_training(&self) -> bool {
        self.training
    }
}

impl Layer for DropoutLayer {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, CnnError> {
        if !self.training {
            return Ok(input.clone());
        }

        let total = input.data().len();
        let scale = 1.0 / (1.0 - self.drop_rate);
        if self.mask.len() != total {
            self.mask.resize(total, 0.0);
        }

        let mut out = input.clone();
        for (i, v) in out.data_mut().iter_mut().enumerate() {
            if self.rng.next_f32() > self.drop_rate {
                self.mask[i] = 1.0;
                *v *= scale;
            } else {
                self.mask[i] = 0.0;
                *v = 0.0;
            }
        }
        log::debug!(
            "dropout forward: {} with rate {}",
            input.shape(),
            self.drop_rate
        );
        Ok(out)
    }

    /// Applies the mask saved by the last forward pass, so gradient flows
    /// only through the units that were kept.
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, CnnError> {
        if !self.training {
            return Ok(grad.clone());
        }
        if self.mask.len() != grad.data().len() {
            return Err(CnnError::BackwardBeforeForward { layer: self.name() });
        }

        let scale = 1.0 / (1.0 - self.drop_rate);
        let mut out = grad.clone();
        for (g, &m) in out.data_mut().iter_mut().zip(self.mask.iter()) {
            *g *= m * scale;
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "dropout"
    }

    fn parameter_count(&self) -> usize {
        0
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }
}
