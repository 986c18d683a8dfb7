// Numerical gradient checking with central finite differences. Analytic
// gradients are recovered through the public API: layers are built with
// learning rate 1.0, so after one backward pass the parameter step equals
// minus the gradient exactly.

use rust_convnet::layers::{Conv2DLayer, DenseLayer, Layer, SoftmaxLayer};
use rust_convnet::tensor::Tensor;
use rust_convnet::Network;

const EPSILON: f32 = 1e-3;
const TOLERANCE: f32 = 1e-2;

fn relative_error(a: f32, b: f32) -> f32 {
    (a - b).abs() / a.abs().max(b.abs()).max(1e-6)
}

// Cross-entropy of softmax(dense(x)) against a one-hot target.
fn dense_softmax_loss(weights: &Tensor, biases: &Tensor, input: &Tensor, target: &Tensor) -> f32 {
    let mut dense = DenseLayer::from_parts(weights.clone(), biases.clone(), 1.0).unwrap();
    let mut softmax = SoftmaxLayer::new();
    let scores = dense.forward(input).unwrap();
    let probs = softmax.forward(&scores).unwrap();
    Network::cross_entropy(&probs, target).unwrap()
}

fn dense_fixture() -> (Tensor, Tensor, Tensor, Tensor) {
    let weights = Tensor::from_vec(1, 1, 2, 3, vec![0.3, -0.5, 0.8, 0.1, 0.9, -0.2]).unwrap();
    let biases = Tensor::from_vec(1, 1, 1, 3, vec![0.05, -0.1, 0.2]).unwrap();
    let input = Tensor::from_vec(1, 1, 1, 2, vec![0.7, -1.2]).unwrap();
    let target = Tensor::from_vec(1, 1, 1, 3, vec![0.0, 1.0, 0.0]).unwrap();
    (weights, biases, input, target)
}

// Run one forward/backward pass and return (weight step, bias step,
// input gradient). With lr = 1.0 the steps are the analytic gradients.
fn dense_analytic_gradients(
    weights: &Tensor,
    biases: &Tensor,
    input: &Tensor,
    target: &Tensor,
) -> (Vec<f32>, Vec<f32>, Tensor) {
    let mut dense = DenseLayer::from_parts(weights.clone(), biases.clone(), 1.0).unwrap();
    let mut softmax = SoftmaxLayer::new();

    let scores = dense.forward(input).unwrap();
    softmax.forward(&scores).unwrap();
    let grad_scores = softmax.backward(target).unwrap();
    let grad_input = dense.backward(&grad_scores).unwrap();

    let grad_w: Vec<f32> = weights
        .data()
        .iter()
        .zip(dense.weights().data().iter())
        .map(|(before, after)| before - after)
        .collect();
    let grad_b: Vec<f32> = biases
        .data()
        .iter()
        .zip(dense.biases().data().iter())
        .map(|(before, after)| before - after)
        .collect();
    (grad_w, grad_b, grad_input)
}

#[test]
fn test_dense_weight_gradients_match_finite_differences() {
    let (weights, biases, input, target) = dense_fixture();
    let (grad_w, _, _) = dense_analytic_gradients(&weights, &biases, &input, &target);

    for i in 0..weights.data().len() {
        let mut plus = weights.clone();
        let mut minus = weights.clone();
        plus.data_mut()[i] += EPSILON;
        minus.data_mut()[i] -= EPSILON;

        let numerical = (dense_softmax_loss(&plus, &biases, &input, &target)
            - dense_softmax_loss(&minus, &biases, &input, &target))
            / (2.0 * EPSILON);

        assert!(
            relative_error(grad_w[i], numerical) < TOLERANCE,
            "weight {}: analytic {} vs numerical {}",
            i,
            grad_w[i],
            numerical
        );
    }
}

#[test]
fn test_dense_bias_gradients_match_finite_differences() {
    let (weights, biases, input, target) = dense_fixture();
    let (_, grad_b, _) = dense_analytic_gradients(&weights, &biases, &input, &target);

    for i in 0..biases.data().len() {
        let mut plus = biases.clone();
        let mut minus = biases.clone();
        plus.data_mut()[i] += EPSILON;
        minus.data_mut()[i] -= EPSILON;

        let numerical = (dense_softmax_loss(&weights, &plus, &input, &target)
            - dense_softmax_loss(&weights, &minus, &input, &target))
            / (2.0 * EPSILON);

        assert!(
            relative_error(grad_b[i], numerical) < TOLERANCE,
            "bias {}: analytic {} vs numerical {}",
            i,
            grad_b[i],
            numerical
        );
    }
}

#[test]
fn test_dense_input_gradients_match_finite_differences() {
    let (weights, biases, input, target) = dense_fixture();
    let (_, _, grad_input) = dense_analytic_gradients(&weights, &biases, &input, &target);

    for i in 0..input.data().len() {
        let mut plus = input.clone();
        let mut minus = input.clone();
        plus.data_mut()[i] += EPSILON;
        minus.data_mut()[i] -= EPSILON;

        let numerical = (dense_softmax_loss(&weights, &biases, &plus, &target)
            - dense_softmax_loss(&weights, &biases, &minus, &target))
            / (2.0 * EPSILON);

        assert!(
            relative_error(grad_input.data()[i], numerical) < TOLERANCE,
            "input {}: analytic {} vs numerical {}",
            i,
            grad_input.data()[i],
            numerical
        );
    }
}

// Quadratic loss 0.5 * sum(out^2) over the convolution output; its
// gradient at the output is the output itself, which keeps the check
// independent of the classification head.
fn conv_quadratic_loss(input: &Tensor, filters: &Tensor) -> f32 {
    let out = input.convolve(filters, 1, 0).unwrap();
    0.5 * out.data().iter().map(|v| v * v).sum::<f32>()
}

#[test]
fn test_conv_filter_gradients_match_finite_differences() {
    let input = Tensor::from_vec(
        1,
        1,
        3,
        3,
        vec![0.2, -0.4, 0.6, 0.8, -1.0, 0.1, -0.3, 0.5, 0.7],
    )
    .unwrap();
    let filters = Tensor::from_vec(1, 1, 2, 2, vec![0.4, -0.2, 0.1, 0.3]).unwrap();

    let mut layer = Conv2DLayer::from_parts(filters.clone(), 1, 0, 1.0);
    let out = layer.forward(&input).unwrap();
    layer.backward(&out).unwrap();
    let grad_f: Vec<f32> = filters
        .data()
        .iter()
        .zip(layer.filters().data().iter())
        .map(|(before, after)| before - after)
        .collect();

    for i in 0..filters.data().len() {
        let mut plus = filters.clone();
        let mut minus = filters.clone();
        plus.data_mut()[i] += EPSILON;
        minus.data_mut()[i] -= EPSILON;

        let numerical = (conv_quadratic_loss(&input, &plus) - conv_quadratic_loss(&input, &minus))
            / (2.0 * EPSILON);

        assert!(
            relative_error(grad_f[i], numerical) < TOLERANCE,
            "filter {}: analytic {} vs numerical {}",
            i,
            grad_f[i],
            numerical
        );
    }
}

#[test]
fn test_conv_input_gradients_match_finite_differences() {
    let input = Tensor::from_vec(
        1,
        1,
        3,
        3,
        vec![0.2, -0.4, 0.6, 0.8, -1.0, 0.1, -0.3, 0.5, 0.7],
    )
    .unwrap();
    let filters = Tensor::from_vec(1, 1, 2, 2, vec![0.4, -0.2, 0.1, 0.3]).unwrap();

    let mut layer = Conv2DLayer::from_parts(filters.clone(), 1, 0, 0.0);
    let out = layer.forward(&input).unwrap();
    let grad_input = layer.backward(&out).unwrap();

    for i in 0..input.data().len() {
        let mut plus = input.clone();
        let mut minus = input.clone();
        plus.data_mut()[i] += EPSILON;
        minus.data_mut()[i] -= EPSILON;

        let numerical = (conv_quadratic_loss(&plus, &filters) - conv_quadratic_loss(&minus, &filters))
            / (2.0 * EPSILON);

        assert!(
            relative_error(grad_input.data()[i], numerical) < TOLERANCE,
            "input {}: analytic {} vs numerical {}",
            i,
            grad_input.data()[i],
            numerical
        );
    }
}
