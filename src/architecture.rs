//! Architecture configuration structures
//!
//! Defines network topologies via JSON files so architectures can be
//! changed without recompiling. Validation simulates the per-sample
//! activation shape through the whole stack, so a kernel that doesn't fit
//! or a dense layer wired to the wrong feature count is rejected at load
//! time rather than at the first forward pass.
//!
//! # Example
//!
//! ```json
//! {
//!   "layers": [
//!     { "layer_type": "input", "channels": 1, "rows": 28, "cols": 28 },
//!     { "layer_type": "conv2d", "in_channels": 1, "num_filters": 8, "kernel_size": 3 },
//!     { "layer_type": "relu" },
//!     { "layer_type": "maxpool", "pool_h": 2, "pool_w": 2 },
//!     { "layer_type": "flatten" },
//!     { "layer_type": "dense", "input_size": 1352, "output_size": 10 },
//!     { "layer_type": "softmax" }
//!   ]
//! }
//! ```

use crate::error::CnnError;
use crate::layers::{
    Conv2DLayer, DenseLayer, DropoutLayer, FlattenLayer, InputLayer, Layer, MaxPoolingLayer,
    ReluLayer, SoftmaxLayer,
};
use crate::tensor::Shape;
use crate::utils::SimpleRng;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Configuration for a single layer.
///
/// Required fields depend on `layer_type`:
///
/// - **input**: `channels`, `rows`, `cols`
/// - **conv2d**: `in_channels`, `num_filters`, `kernel_size`; optional
///   `stride` (default 1) and `padding` (default 0)
/// - **maxpool**: `pool_h`, `pool_w`
/// - **dense**: `input_size`, `output_size`
/// - **dropout**: `drop_rate` in `[0.0, 1.0)`
/// - **relu**, **flatten**, **softmax**: no parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerConfig {
    /// One of: "input", "conv2d", "relu", "maxpool", "flatten", "dense",
    /// "dropout", "softmax"
    pub layer_type: String,

    // Input layer parameters
    pub channels: Option<usize>,
    pub rows: Option<usize>,
    pub cols: Option<usize>,

    // Conv2D layer parameters
    pub in_channels: Option<usize>,
    pub num_filters: Option<usize>,
    pub kernel_size: Option<usize>,
    pub stride: Option<usize>,
    pub padding: Option<usize>,

    // MaxPooling layer parameters
    pub pool_h: Option<usize>,
    pub pool_w: Option<usize>,

    // Dense layer parameters
    pub input_size: Option<usize>,
    pub output_size: Option<usize>,

    // Dropout layer parameters
    pub drop_rate: Option<f32>,
}

/// Ordered layer stack defining the network structure.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    pub layers: Vec<LayerConfig>,
}

/// Loads and validates an architecture configuration from a JSON file.
pub fn load_architecture<P: AsRef<Path>>(path: P) -> Result<ArchitectureConfig, CnnError> {
    let contents = fs::read_to_string(path)?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_architecture(&config)?;
    Ok(config)
}

fn incoming_shape(incoming: Option<Shape>, index: usize) -> Result<Shape, CnnError> {
    incoming.ok_or_else(|| {
        CnnError::InvalidConfig(format!(
            "layer {}: no input layer precedes this layer",
            index
        ))
    })
}

fn require(field: Option<usize>, index: usize, name: &str) -> Result<usize, CnnError> {
    field.ok_or_else(|| {
        CnnError::InvalidConfig(format!("layer {}: missing required field '{}'", index, name))
    })
}

fn require_positive(field: Option<usize>, index: usize, name: &str) -> Result<usize, CnnError> {
    let value = require(field, index, name)?;
    if value == 0 {
        return Err(CnnError::InvalidConfig(format!(
            "layer {}: '{}' must be greater than 0",
            index, name
        )));
    }
    Ok(value)
}

/// Validates the architecture by simulating the per-sample activation
/// shape through the stack.
///
/// The first layer must be `input`; every following layer is checked
/// against the shape the previous layers produce.
pub fn validate_architecture(config: &ArchitectureConfig) -> Result<(), CnnError> {
    if config.layers.is_empty() {
        return Err(CnnError::InvalidConfig(
            "architecture must have at least one layer".to_string(),
        ));
    }
    if config.layers[0].layer_type.to_lowercase() != "input" {
        return Err(CnnError::InvalidConfig(
            "architecture must start with an input layer".to_string(),
        ));
    }

    let mut shape: Option<Shape> = None;
    for (i, layer) in config.layers.iter().enumerate() {
        shape = Some(validate_layer(layer, i, shape)?);
    }
    Ok(())
}

/// Validates one layer and returns the per-sample shape it produces.
fn validate_layer(
    layer: &LayerConfig,
    index: usize,
    incoming: Option<Shape>,
) -> Result<Shape, CnnError> {
    let layer_type = layer.layer_type.to_lowercase();

    match layer_type.as_str() {
        "input" => {
            if index != 0 {
                return Err(CnnError::InvalidConfig(format!(
                    "layer {}: input layer is only allowed at position 0",
                    index
                )));
            }
            let channels = require_positive(layer.channels, index, "channels")?;
            let rows = require_positive(layer.rows, index, "rows")?;
            let cols = require_positive(layer.cols, index, "cols")?;
            Ok(Shape::new(1, channels, rows, cols))
        }
        "conv2d" => {
            let s = incoming_shape(incoming, index)?;
            let in_channels = require_positive(layer.in_channels, index, "in_channels")?;
            let num_filters = require_positive(layer.num_filters, index, "num_filters")?;
            let kernel_size = require_positive(layer.kernel_size, index, "kernel_size")?;
            let stride = layer.stride.unwrap_or(1);
            let padding = layer.padding.unwrap_or(0);
            if stride == 0 {
                return Err(CnnError::InvalidConfig(format!(
                    "layer {}: stride must be greater than 0",
                    index
                )));
            }
            if in_channels != s.channels {
                return Err(CnnError::InvalidConfig(format!(
                    "layer {}: in_channels is {} but the previous layer produces {} channels",
                    index, in_channels, s.channels
                )));
            }
            let span_rows = s.rows as isize + 2 * padding as isize - kernel_size as isize;
            let span_cols = s.cols as isize + 2 * padding as isize - kernel_size as isize;
            if span_rows < 0 || span_cols < 0 {
                return Err(CnnError::InvalidConfig(format!(
                    "layer {}: kernel {} does not fit a {}x{} input with padding {}",
                    index, kernel_size, s.rows, s.cols, padding
                )));
            }
            Ok(Shape::new(
                1,
                num_filters,
                span_rows as usize / stride + 1,
                span_cols as usize / stride + 1,
            ))
        }
        "relu" => incoming_shape(incoming, index),
        "maxpool" => {
            let s = incoming_shape(incoming, index)?;
            let pool_h = require_positive(layer.pool_h, index, "pool_h")?;
            let pool_w = require_positive(layer.pool_w, index, "pool_w")?;
            if pool_h > s.rows || pool_w > s.cols {
                return Err(CnnError::InvalidConfig(format!(
                    "layer {}: pool window {}x{} does not fit a {}x{} input",
                    index, pool_h, pool_w, s.rows, s.cols
                )));
            }
            Ok(Shape::new(1, s.channels, s.rows / pool_h, s.cols / pool_w))
        }
        "flatten" => {
            let s = incoming_shape(incoming, index)?;
            Ok(Shape::new(1, 1, 1, s.channels * s.rows * s.cols))
        }
        "dense" => {
            let s = incoming_shape(incoming, index)?;
            let input_size = require_positive(layer.input_size, index, "input_size")?;
            let output_size = require_positive(layer.output_size, index, "output_size")?;
            let features = s.channels * s.rows * s.cols;
            if s.channels != 1 || s.rows != 1 {
                return Err(CnnError::InvalidConfig(format!(
                    "layer {}: dense layers need flattened input, got shape {}",
                    index, s
                )));
            }
            if input_size != features {
                return Err(CnnError::InvalidConfig(format!(
                    "layer {}: input_size is {} but the previous layer produces {} features",
                    index, input_size, features
                )));
            }
            Ok(Shape::new(1, 1, 1, output_size))
        }
        "dropout" => {
            let drop_rate = layer.drop_rate.ok_or_else(|| {
                CnnError::InvalidConfig(format!(
                    "layer {}: missing required field 'drop_rate'",
                    index
                ))
            })?;
            if !(0.0..1.0).contains(&drop_rate) {
                return Err(CnnError::InvalidConfig(format!(
                    "layer {}: drop_rate must be in range [0.0, 1.0)",
                    index
                )));
            }
            incoming_shape(incoming, index)
        }
        "softmax" => {
            let s = incoming_shape(incoming, index)?;
            if s.channels != 1 || s.rows != 1 {
                return Err(CnnError::InvalidConfig(format!(
                    "layer {}: softmax needs a class-score row, got shape {}",
                    index, s
                )));
            }
            Ok(s)
        }
        _ => Err(CnnError::InvalidConfig(format!(
            "layer {}: invalid layer type '{}'",
            index, layer.layer_type
        ))),
    }
}

/// Builds the boxed layer stack described by a validated configuration.
///
/// Learnable layers receive `learning_rate` and draw their initial
/// parameters from `rng`, so the same seed reproduces the same model.
pub fn build_model(
    config: &ArchitectureConfig,
    learning_rate: f32,
    rng: &mut SimpleRng,
) -> Result<Vec<Box<dyn Layer>>, CnnError> {
    validate_architecture(config)?;

    let mut layers: Vec<Box<dyn Layer>> = Vec::new();
    for (i, layer_config) in config.layers.iter().enumerate() {
        let layer_type = layer_config.layer_type.to_lowercase();
        match layer_type.as_str() {
            "input" => {
                let channels = require(layer_config.channels, i, "channels")?;
                let rows = require(layer_config.rows, i, "rows")?;
                let cols = require(layer_config.cols, i, "cols")?;
                layers.push(Box::new(InputLayer::new(channels, rows, cols)));
            }
            "conv2d" => {
                let in_channels = require(layer_config.in_channels, i, "in_channels")?;
                let num_filters = require(layer_config.num_filters, i, "num_filters")?;
                let kernel_size = require(layer_config.kernel_size, i, "kernel_size")?;
                let stride = layer_config.stride.unwrap_or(1);
                let padding = layer_config.padding.unwrap_or(0);
                layers.push(Box::new(Conv2DLayer::new(
                    in_channels,
                    num_filters,
                    kernel_size,
                    stride,
                    padding,
                    learning_rate,
                    rng,
                )));
            }
            "relu" => layers.push(Box::new(ReluLayer::new())),
            "maxpool" => {
                let pool_h = require(layer_config.pool_h, i, "pool_h")?;
                let pool_w = require(layer_config.pool_w, i, "pool_w")?;
                layers.push(Box::new(MaxPoolingLayer::new(pool_h, pool_w)));
            }
            "flatten" => layers.push(Box::new(FlattenLayer::new())),
            "dense" => {
                let input_size = require(layer_config.input_size, i, "input_size")?;
                let output_size = require(layer_config.output_size, i, "output_size")?;
                layers.push(Box::new(DenseLayer::new(
                    input_size,
                    output_size,
                    learning_rate,
                    rng,
                )));
            }
            "dropout" => {
                let drop_rate = layer_config.drop_rate.ok_or_else(|| {
                    CnnError::InvalidConfig(format!("layer {}: missing drop_rate", i))
                })?;
                layers.push(Box::new(DropoutLayer::new(drop_rate, rng)));
            }
            "softmax" => layers.push(Box::new(SoftmaxLayer::new())),
            _ => {
                return Err(CnnError::InvalidConfig(format!(
                    "layer {}: invalid layer type '{}'",
                    i, layer_config.layer_type
                )));
            }
        }
    }
    Ok(layers)
}
