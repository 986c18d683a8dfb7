//! Layer abstractions for the convolutional network
//!
//! This module provides the Layer trait and the concrete layer types that
//! compose the network: input validation, convolution, dense projection,
//! activations, pooling, flattening, dropout, and the softmax head.

mod r#trait;
pub mod conv2d;
pub mod dense;
pub mod dropout;
pub mod flatten;
pub mod input;
pub mod maxpool;
pub mod relu;
pub mod softmax;

// Re-export the Layer trait and concrete layers for convenience
pub use r#trait::Layer;
pub use conv2d::Conv2DLayer;
pub use dense::DenseLayer;
pub use dropout::DropoutLayer;
pub use flatten::FlattenLayer;
pub use input::InputLayer;
pub use maxpool::MaxPoolingLayer;
pub use relu::ReluLayer;
pub use softmax::SoftmaxLayer;
