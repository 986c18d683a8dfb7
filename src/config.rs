//! Configuration structures for training
//!
//! Training hyperparameters are loadable from JSON files so experiments
//! can be re-run without recompiling.
//!
//! # Example
//!
//! ```json
//! {
//!   "epochs": 5,
//!   "batch_size": 32,
//!   "learning_rate": 0.01,
//!   "optimizer": "sgd",
//!   "seed": 42
//! }
//! ```

use crate::error::CnnError;
use crate::optimizers::OptimizerKind;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Training hyperparameters parsed from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Number of passes over the training set (must be at least 1)
    pub epochs: usize,

    /// Mini-batch size (must be at least 1)
    pub batch_size: usize,

    /// SGD step size (must be positive)
    pub learning_rate: f32,

    /// Optimizer kind; only "sgd" is supported
    pub optimizer: String,

    /// Seed for weight initialization and dropout masks; omit for a
    /// time-based seed
    pub seed: Option<u64>,
}

impl TrainingConfig {
    /// Resolve the optimizer string into an [`OptimizerKind`].
    pub fn optimizer_kind(&self) -> Result<OptimizerKind, CnnError> {
        OptimizerKind::parse(&self.optimizer).ok_or_else(|| {
            CnnError::InvalidConfig(format!(
                "unknown optimizer '{}', expected 'sgd'",
                self.optimizer
            ))
        })
    }
}

/// Loads and validates a training configuration from a JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrainingConfig, CnnError> {
    let contents = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &TrainingConfig) -> Result<(), CnnError> {
    if config.epochs == 0 {
        return Err(CnnError::InvalidConfig(
            "epochs must be at least 1".to_string(),
        ));
    }
    if config.batch_size == 0 {
        return Err(CnnError::InvalidConfig(
            "batch_size must be at least 1".to_string(),
        ));
    }
    if config.learning_rate <= 0.0 || !config.learning_rate.is_finite() {
        return Err(CnnError::InvalidConfig(format!(
            "learning_rate must be positive, got {}",
            config.learning_rate
        )));
    }
    config.optimizer_kind()?;
    Ok(())
}
