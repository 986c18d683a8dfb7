//! Network composition and the mini-batch SGD training loop
//!
//! A `Network` is an ordered stack of boxed layers plus training
//! hyperparameters. It implements [`Layer`] itself (forward chains in
//! order, backward chains in reverse), so a trained network can in
//! principle be embedded as a stage of a larger one.
//!
//! Training follows the classic mini-batch loop: stack samples into a
//! batch tensor, forward, compute categorical cross-entropy, then feed the
//! one-hot target batch into the backward chain. The softmax head turns
//! that target into the combined softmax/cross-entropy gradient, and every
//! learnable layer steps its own parameters on the way down.

use crate::error::CnnError;
use crate::layers::Layer;
use crate::optimizers::OptimizerKind;
use crate::tensor::Tensor;

/// Feed-forward network with mini-batch SGD training.
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
    epochs: usize,
    batch_size: usize,
    learning_rate: f32,
    optimizer: OptimizerKind,
}

impl Network {
    /// Categorical cross-entropy averaged over the batch.
    ///
    /// `-1/B * sum_b sum_k target * ln(p)` with probabilities clamped to
    /// at least 1e-9 before the logarithm, so a confidently wrong
    /// prediction produces a large finite loss instead of infinity.
    pub fn cross_entropy(predictions: &Tensor, targets: &Tensor) -> Result<f32, CnnError> {
        if predictions.shape() != targets.shape() {
            return Err(CnnError::ShapeMismatch {
                op: "cross_entropy",
                left: predictions.shape(),
                right: targets.shape(),
            });
        }

        let mut total = 0.0f32;
        for (&p, &t) in predictions.data().iter().zip(targets.data().iter()) {
            if t != 0.0 {
                total -= t * p.max(1e-9).ln();
            }
        }
        Ok(total / predictions.batches() as f32)
    }

    /// Train on the full dataset for the configured number of epochs.
    ///
    /// Mini-batches are assembled in dataset order; the final short batch
    /// runs at its natural size, so each epoch processes exactly
    /// `ceil(N / batch_size)` batches. After every epoch the held-out set
    /// is evaluated and the epoch's loss and accuracy are logged.
    pub fn train(
        &mut self,
        train_images: &[Tensor],
        train_labels: &[Tensor],
        eval_images: &[Tensor],
        eval_labels: &[Tensor],
    ) -> Result<(), CnnError> {
        if train_images.len() != train_labels.len() {
            return Err(CnnError::InvalidConfig(format!(
                "training set has {} images but {} labels",
                train_images.len(),
                train_labels.len()
            )));
        }
        if train_images.is_empty() {
            return Err(CnnError::InvalidConfig(
                "training set is empty".to_string(),
            ));
        }

        let total = train_images.len();
        for epoch in 1..=self.epochs {
            self.set_training(true);

            let mut epoch_loss = 0.0f32;
            let mut batches = 0usize;
            let mut start = 0usize;
            while start < total {
                let end = (start + self.batch_size).min(total);
                let batch = Tensor::stack(&train_images[start..end])?;
                let targets = Tensor::stack(&train_labels[start..end])?;

                let predictions = self.forward(&batch)?;
                epoch_loss += Self::cross_entropy(&predictions, &targets)?;
                batches += 1;

                // The softmax head expects the one-hot targets here.
                self.backward(&targets)?;
                start = end;
            }

            let accuracy = self.evaluate(eval_images, eval_labels)?;
            log::info!(
                "epoch {}/{}: {} batches, loss {:.4} (avg {:.4}), eval accuracy {:.2}%",
                epoch,
                self.epochs,
                batches,
                epoch_loss,
                epoch_loss / batches as f32,
                accuracy
            );
        }
        Ok(())
    }

    /// Classification accuracy in percent over a labeled set.
    ///
    /// Each sample is forwarded individually in inference mode and its
    /// argmax compared against the one-hot label's argmax.
    pub fn evaluate(&mut self, inputs: &[Tensor], targets: &[Tensor]) -> Result<f32, CnnError> {
        if inputs.len() != targets.len() {
            return Err(CnnError::InvalidConfig(format!(
                "evaluation set has {} images but {} labels",
                inputs.len(),
                targets.len()
            )));
        }
        if inputs.is_empty() {
            return Err(CnnError::InvalidConfig(
                "evaluation set is empty".to_string(),
            ));
        }

        self.set_training(false);
        let mut matches = 0usize;
        for (input, target) in inputs.iter().zip(targets.iter()) {
            let prediction = self.forward(input)?;
            if prediction.argmax() == target.argmax() {
                matches += 1;
            }
        }
        Ok(100.0 * matches as f32 / inputs.len() as f32)
    }

    /// Single inference pass in evaluation mode.
    pub fn predict(&mut self, input: &Tensor) -> Result<Tensor, CnnError> {
        self.set_training(false);
        self.forward(input)
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn optimizer(&self) -> OptimizerKind {
        self.optimizer
    }

    /// Number of layers in the stack.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl Layer for Network {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, CnnError> {
        let mut current = input.clone();
        for layer in self.layers.iter_mut() {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, CnnError> {
        let mut current = grad.clone();
        for layer in self.layers.iter_mut().rev() {
            current = layer.backward(&current)?;
        }
        Ok(current)
    }

    fn name(&self) -> &'static str {
        "network"
    }

    fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    fn set_training(&mut self, training: bool) {
        for layer in self.layers.iter_mut() {
            layer.set_training(training);
        }
    }
}

/// Builder for [`Network`].
///
/// Layers are pushed in forward order; `build` validates the
/// hyperparameters.
pub struct NetworkBuilder {
    layers: Vec<Box<dyn Layer>>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer to the stack.
    pub fn add_layer(mut self, layer: Box<dyn Layer>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Finalize the network.
    ///
    /// Rejects an empty stack, zero epochs or batch size, and a
    /// non-positive learning rate.
    pub fn build(
        self,
        batch_size: usize,
        epochs: usize,
        optimizer: OptimizerKind,
        learning_rate: f32,
    ) -> Result<Network, CnnError> {
        if self.layers.is_empty() {
            return Err(CnnError::InvalidConfig(
                "network must contain at least one layer".to_string(),
            ));
        }
        if batch_size == 0 {
            return Err(CnnError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if epochs == 0 {
            return Err(CnnError::InvalidConfig(
                "epochs must be at least 1".to_string(),
            ));
        }
        if learning_rate <= 0.0 {
            return Err(CnnError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                learning_rate
            )));
        }

        Ok(Network {
            layers: self.layers,
            epochs,
            batch_size,
            learning_rate,
            optimizer,
        })
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{FlattenLayer, InputLayer, SoftmaxLayer};

    fn tiny_network() -> Network {
        NetworkBuilder::new()
            .add_layer(Box::new(InputLayer::new(1, 1, 4)))
            .add_layer(Box::new(FlattenLayer::new()))
            .add_layer(Box::new(SoftmaxLayer::new()))
            .build(2, 1, OptimizerKind::Sgd, 0.1)
            .unwrap()
    }

    #[test]
    fn test_builder_rejects_empty_stack() {
        let result = NetworkBuilder::new().build(2, 1, OptimizerKind::Sgd, 0.1);
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_bad_hyperparameters() {
        let build = |batch, epochs, lr| {
            NetworkBuilder::new()
                .add_layer(Box::new(FlattenLayer::new()))
                .build(batch, epochs, OptimizerKind::Sgd, lr)
        };
        assert!(build(0, 1, 0.1).is_err());
        assert!(build(2, 0, 0.1).is_err());
        assert!(build(2, 1, 0.0).is_err());
        assert!(build(2, 1, -0.5).is_err());
        assert!(build(2, 1, 0.1).is_ok());
    }

    #[test]
    fn test_network_forward_chains_layers() {
        let mut network = tiny_network();
        let input = Tensor::from_vec(1, 1, 1, 4, vec![0.0, 0.0, 0.0, 0.0]).unwrap();
        let out = network.forward(&input).unwrap();
        for k in 0..4 {
            assert!((out.get(0, 0, 0, k) - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_cross_entropy_zero_on_perfect_match() {
        let predictions = Tensor::from_vec(1, 1, 1, 3, vec![0.0, 1.0, 0.0]).unwrap();
        let targets = predictions.clone();
        let loss = Network::cross_entropy(&predictions, &targets).unwrap();
        assert!(loss.abs() < 1e-6);
    }

    #[test]
    fn test_cross_entropy_positive_on_miss() {
        let predictions = Tensor::from_vec(1, 1, 1, 3, vec![0.8, 0.1, 0.1]).unwrap();
        let targets = Tensor::from_vec(1, 1, 1, 3, vec![0.0, 1.0, 0.0]).unwrap();
        let loss = Network::cross_entropy(&predictions, &targets).unwrap();
        assert!(loss > 0.0);
        assert!((loss - (0.1f32).ln().abs()).abs() < 1e-5);
    }

    #[test]
    fn test_cross_entropy_clamps_zero_probability() {
        let predictions = Tensor::from_vec(1, 1, 1, 2, vec![1.0, 0.0]).unwrap();
        let targets = Tensor::from_vec(1, 1, 1, 2, vec![0.0, 1.0]).unwrap();
        let loss = Network::cross_entropy(&predictions, &targets).unwrap();
        assert!(loss.is_finite());
        assert!(loss > 10.0);
    }

    #[test]
    fn test_cross_entropy_shape_mismatch() {
        let predictions = Tensor::new(1, 1, 1, 3);
        let targets = Tensor::new(1, 1, 1, 2);
        assert!(Network::cross_entropy(&predictions, &targets).is_err());
    }

    #[test]
    fn test_evaluate_rejects_length_mismatch() {
        let mut network = tiny_network();
        let inputs = vec![Tensor::new(1, 1, 1, 4)];
        let targets: Vec<Tensor> = Vec::new();
        assert!(network.evaluate(&inputs, &targets).is_err());
    }

    #[test]
    fn test_parameter_count_sums_layers() {
        let network = tiny_network();
        assert_eq!(network.parameter_count(), 0);
        assert_eq!(network.layer_count(), 3);
    }
}
