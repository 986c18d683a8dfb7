// mnist_cnn.rs
// Trains a small CNN on MNIST using the rust-convnet library.
// Expected files:
//   ./data/train-images.idx3-ubyte
//   ./data/train-labels.idx1-ubyte
//   ./data/t10k-images.idx3-ubyte
//   ./data/t10k-labels.idx1-ubyte
//
// Hyperparameters come from ./config/training.json when present, or the
// built-in defaults below.
//
// Note: educational implementation (no BLAS/GEMM), so it is intentionally slow.

use std::path::Path;
use std::process;
use std::time::Instant;

use rust_convnet::config::{self, TrainingConfig};
use rust_convnet::layers::{
    Conv2DLayer, DenseLayer, FlattenLayer, InputLayer, Layer, MaxPoolingLayer, ReluLayer,
    SoftmaxLayer,
};
use rust_convnet::utils::SimpleRng;
use rust_convnet::{data, CnnError, Network, NetworkBuilder};

// MNIST constants.
const IMG_H: usize = 28;
const IMG_W: usize = 28;
const TRAIN_SAMPLES: usize = 60_000;
const TEST_SAMPLES: usize = 10_000;

// CNN topology: 1x28x28 -> conv(8, 3x3) -> ReLU -> 2x2 maxpool -> FC(10) -> softmax.
const CONV_FILTERS: usize = 8;
const KERNEL: usize = 3;
const POOL: usize = 2;
const FC_IN: usize = CONV_FILTERS * ((IMG_H - KERNEL + 1) / POOL) * ((IMG_W - KERNEL + 1) / POOL);

const CONFIG_PATH: &str = "./config/training.json";

fn default_config() -> TrainingConfig {
    TrainingConfig {
        epochs: 3,
        batch_size: 32,
        learning_rate: 0.01,
        optimizer: "sgd".to_string(),
        seed: Some(42),
    }
}

fn build_network(cfg: &TrainingConfig, rng: &mut SimpleRng) -> Result<Network, CnnError> {
    let lr = cfg.learning_rate;
    NetworkBuilder::new()
        .add_layer(Box::new(InputLayer::new(1, IMG_H, IMG_W)))
        .add_layer(Box::new(Conv2DLayer::new(
            1,
            CONV_FILTERS,
            KERNEL,
            1,
            0,
            lr,
            rng,
        )))
        .add_layer(Box::new(ReluLayer::new()))
        .add_layer(Box::new(MaxPoolingLayer::new(POOL, POOL)))
        .add_layer(Box::new(FlattenLayer::new()))
        .add_layer(Box::new(DenseLayer::new(FC_IN, 10, lr, rng)))
        .add_layer(Box::new(SoftmaxLayer::new()))
        .build(cfg.batch_size, cfg.epochs, cfg.optimizer_kind()?, lr)
}

fn run() -> Result<(), CnnError> {
    let cfg = if Path::new(CONFIG_PATH).exists() {
        println!("Loading config from {}", CONFIG_PATH);
        config::load_config(CONFIG_PATH)?
    } else {
        default_config()
    };

    println!("Loading MNIST...");
    let train_images = data::load_idx_images("./data/train-images.idx3-ubyte", Some(TRAIN_SAMPLES))?;
    let train_labels = data::load_idx_labels("./data/train-labels.idx1-ubyte", Some(TRAIN_SAMPLES))?;
    let test_images = data::load_idx_images("./data/t10k-images.idx3-ubyte", Some(TEST_SAMPLES))?;
    let test_labels = data::load_idx_labels("./data/t10k-labels.idx1-ubyte", Some(TEST_SAMPLES))?;
    println!("Train: {} | Test: {}", train_images.len(), test_images.len());

    let mut rng = match cfg.seed {
        Some(seed) => SimpleRng::new(seed),
        None => {
            let mut rng = SimpleRng::new(0);
            rng.reseed_from_time();
            rng
        }
    };
    let mut network = build_network(&cfg, &mut rng)?;
    println!(
        "Training CNN ({} parameters) for {} epochs, batch size {}, lr {}",
        network.parameter_count(),
        cfg.epochs,
        cfg.batch_size,
        cfg.learning_rate
    );

    let start = Instant::now();
    network.train(&train_images, &train_labels, &test_images, &test_labels)?;
    println!("Training took {:.1}s", start.elapsed().as_secs_f32());

    println!("Testing...");
    let accuracy = network.evaluate(&test_images, &test_labels)?;
    println!("Test Accuracy: {:.2}%", accuracy);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}
