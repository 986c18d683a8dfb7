//! Error taxonomy for tensor operations, layers, and configuration
//!
//! Every fallible operation in the library surfaces one of these variants
//! immediately at the point of the violation; there is no retry or silent
//! coercion. Shape errors always name the operation and both operand shapes
//! so a failing training run reports exactly where the chain broke.

use crate::tensor::Shape;
use thiserror::Error;

/// Errors produced by tensor operations, layers, the network, and the
/// configuration/data loaders.
#[derive(Debug, Error)]
pub enum CnnError {
    /// Two operands' dimensions violate an operation's contract.
    #[error("shape mismatch in {op}: left operand {left}, right operand {right}")]
    ShapeMismatch {
        op: &'static str,
        left: Shape,
        right: Shape,
    },

    /// A single operand violates an operation's contract (for example a
    /// pooling window larger than the spatial plane).
    #[error("invalid operand for {op}: {message} (operand shape {shape})")]
    InvalidOperand {
        op: &'static str,
        shape: Shape,
        message: String,
    },

    /// The input layer received data whose shape differs from the
    /// configured input shape.
    #[error("invalid input to {layer} layer: expected {expected}, got {got}")]
    InvalidInput {
        layer: &'static str,
        expected: Shape,
        got: Shape,
    },

    /// `backward` was called on a layer with no cached forward pass.
    #[error("{layer} backward called before forward")]
    BackwardBeforeForward { layer: &'static str },

    /// A configuration file or builder argument is out of range or
    /// inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A dataset file is malformed (bad magic number, truncated payload).
    #[error("invalid data file {path}: {message}")]
    InvalidData { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}
