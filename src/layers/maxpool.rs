//! Max pooling layer implementation
//!
//! Downsamples each channel plane over non-overlapping windows, keeping the
//! maximum of each window. The backward pass routes the incoming gradient
//! only to each window's maximum position; when a window holds ties, the
//! first maximum in row-major scan order receives the whole gradient.

use crate::error::CnnError;
use crate::layers::Layer;
use crate::tensor::Tensor;

/// Non-overlapping max pooling with a fixed window.
pub struct MaxPoolingLayer {
    pool_h: usize,
    pool_w: usize,
    cached_input: Option<Tensor>,
}

impl MaxPoolingLayer {
    /// Creates a pooling layer with a `pool_h x pool_w` window.
    pub fn new(pool_h: usize, pool_w: usize) -> Self {
        Self {
            pool_h,
            pool_w,
            cached_input: None,
        }
    }
}

impl Layer for MaxPoolingLayer {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, CnnError> {
        let out = input.max_pool(self.pool_h, self.pool_w)?;
        log::debug!("maxpool forward: {} -> {}", input.shape(), out.shape());
        self.cached_input = Some(input.clone());
        Ok(out)
    }

    /// Recomputes each window's argmax from the cached input and scatters
    /// the gradient there; every other position receives zero.
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, CnnError> {
        let input = self
            .cached_input
            .as_ref()
            .ok_or(CnnError::BackwardBeforeForward { layer: self.name() })?;

        let s = input.shape();
        let g = grad.shape();
        if g.batches != s.batches
            || g.channels != s.channels
            || g.rows != s.rows / self.pool_h
            || g.cols != s.cols / self.pool_w
        {
            return Err(CnnError::ShapeMismatch {
                op: "max_pool_backward",
                left: s,
                right: g,
            });
        }

        let mut grad_input = Tensor::from_shape(s);
        for b in 0..g.batches {
            for c in 0..g.channels {
                for py in 0..g.rows {
                    for px in 0..g.cols {
                        let mut best_r = py * self.pool_h;
                        let mut best_c = px * self.pool_w;
                        let mut best = input.get(b, c, best_r, best_c);
                        for dy in 0..self.pool_h {
                            for dx in 0..self.pool_w {
                                let r = py * self.pool_h + dy;
                                let col = px * self.pool_w + dx;
                                let v = input.get(b, c, r, col);
                                if v > best {
                                    best = v;
                                    best_r = r;
                                    best_c = col;
                                }
                            }
                        }
                        let current = grad_input.get(b, c, best_r, best_c);
                        grad_input.set(b, c, best_r, best_c, current + grad.get(b, c, py, px));
                    }
                }
            }
        }
        Ok(grad_input)
    }

    fn name(&self) -> &'static str {
        "max_pooling"
    }

    fn parameter_count(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Shape;

    #[test]
    fn test_maxpool_forward() {
        let mut layer = MaxPoolingLayer::new(2, 2);
        let input = Tensor::from_vec(
            1,
            1,
            4,
            4,
            vec![
                1.0, 2.0, 3.0, 4.0, //
                5.0, 6.0, 7.0, 8.0, //
                9.0, 10.0, 11.0, 12.0, //
                13.0, 14.0, 15.0, 16.0,
            ],
        )
        .unwrap();
        let out = layer.forward(&input).unwrap();
        assert_eq!(out.shape(), Shape::new(1, 1, 2, 2));
        assert_eq!(out.data(), &[6.0, 8.0, 14.0, 16.0]);
    }

    #[test]
    fn test_maxpool_backward_routes_to_max() {
        let mut layer = MaxPoolingLayer::new(2, 2);
        let input = Tensor::from_vec(
            1,
            1,
            2,
            2,
            vec![
                1.0, 9.0, //
                3.0, 4.0,
            ],
        )
        .unwrap();
        layer.forward(&input).unwrap();

        let grad = Tensor::from_vec(1, 1, 1, 1, vec![5.0]).unwrap();
        let grad_input = layer.backward(&grad).unwrap();
        assert_eq!(grad_input.data(), &[0.0, 5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_maxpool_backward_tie_goes_to_first() {
        let mut layer = MaxPoolingLayer::new(2, 2);
        let input = Tensor::from_vec(1, 1, 2, 2, vec![7.0, 7.0, 7.0, 7.0]).unwrap();
        layer.forward(&input).unwrap();

        let grad = Tensor::from_vec(1, 1, 1, 1, vec![1.0]).unwrap();
        let grad_input = layer.backward(&grad).unwrap();
        assert_eq!(grad_input.data(), &[1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_maxpool_backward_before_forward() {
        let mut layer = MaxPoolingLayer::new(2, 2);
        assert!(layer.backward(&Tensor::new(1, 1, 1, 1)).is_err());
    }

    #[test]
    fn test_maxpool_discards_trailing_edge_gradient() {
        // 3x3 input with a 2x2 window: row/col 2 never enter a window, so
        // their gradient stays zero.
        let mut layer = MaxPoolingLayer::new(2, 2);
        let mut input = Tensor::new(1, 1, 3, 3);
        for r in 0..3 {
            for c in 0..3 {
                input.set(0, 0, r, c, (r * 3 + c) as f32);
            }
        }
        layer.forward(&input).unwrap();

        let grad = Tensor::from_vec(1, 1, 1, 1, vec![1.0]).unwrap();
        let grad_input = layer.backward(&grad).unwrap();
        // Max of the single window is at (1, 1).
        assert_eq!(grad_input.get(0, 0, 1, 1), 1.0);
        for c in 0..3 {
            assert_eq!(grad_input.get(0, 0, 2, c), 0.0);
        }
        for r in 0..3 {
            assert_eq!(grad_input.get(0, 0, r, 2), 0.0);
        }
    }
}
