//! Hand-written convolutional neural network library
//!
//! This library implements the full training and inference pipeline of a
//! small CNN for fixed-size grayscale image classification (28x28 inputs,
//! 10 classes) without any external numerical crates. All tensor
//! arithmetic, convolution, pooling, activation, loss, and gradient-descent
//! update logic is written by hand over a flat `Vec<f32>` store.
//!
//! # Modules
//!
//! - `tensor`: 4-axis tensor engine (convolution, matmul, pooling, softmax, ...)
//! - `layers`: Layer trait and implementations (Input, Conv2D, Dense, ...)
//! - `network`: Network composition, mini-batch SGD training loop, evaluation
//! - `optimizers`: Optimizer trait and SGD implementation
//! - `utils`: Seedable RNG for reproducible initialization
//! - `config`: Training hyperparameter configuration (JSON)
//! - `architecture`: Architecture configuration and model building (JSON)
//! - `data`: IDX-format image/label loading and one-hot encoding
//! - `error`: Error taxonomy shared by all modules

pub mod architecture;
pub mod config;
pub mod data;
pub mod error;
pub mod layers;
pub mod network;
pub mod optimizers;
pub mod tensor;
pub mod utils;

pub use error::CnnError;
pub use network::{Network, NetworkBuilder};
pub use tensor::{Shape, Tensor};
