//! 4-axis tensor engine
//!
//! This module provides the numeric core of the library: a dense 4-D tensor
//! (batches, channels, rows, cols) backed by a single flat `Vec<f32>` plus
//! computed offsets. The flat layout keeps the convolution and matrix
//! multiply inner loops cache friendly.
//!
//! Tensors are value-like: every operation allocates and returns a new
//! tensor, leaving its operands unmodified, with two documented in-place
//! exceptions (`add_biases` and `he_init`). Any operand whose dimensions
//! violate an operation's contract produces a descriptive
//! [`CnnError::ShapeMismatch`] or [`CnnError::InvalidOperand`]; nothing is
//! ever silently broadcast outside the matrix-multiply rule documented on
//! [`Tensor::matmul`].

use crate::error::CnnError;
use crate::utils::SimpleRng;
use std::fmt;

/// Dimensions of a 4-axis tensor: (batches, channels, rows, cols).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub batches: usize,
    pub channels: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn new(batches: usize, channels: usize, rows: usize, cols: usize) -> Self {
        Self {
            batches,
            channels,
            rows,
            cols,
        }
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.batches * self.channels * self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear offset of `(b, c, r, col)` in the row-major backing store.
    #[inline]
    pub fn index(&self, b: usize, c: usize, r: usize, col: usize) -> usize {
        ((b * self.channels + c) * self.rows + r) * self.cols + col
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}x{}",
            self.batches, self.channels, self.rows, self.cols
        )
    }
}

/// Dense 4-axis tensor over `f32`.
///
/// The backing store always holds exactly `batches * channels * rows * cols`
/// elements in row-major order: `index = ((b*C + c)*R + r)*W + col`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: Vec<f32>,
}

impl Tensor {
    /// Create a zero-filled tensor with the given dimensions.
    pub fn new(batches: usize, channels: usize, rows: usize, cols: usize) -> Self {
        let shape = Shape::new(batches, channels, rows, cols);
        Self {
            data: vec![0.0; shape.len()],
            shape,
        }
    }

    /// Create a zero-filled tensor from a shape.
    pub fn from_shape(shape: Shape) -> Self {
        Self {
            data: vec![0.0; shape.len()],
            shape,
        }
    }

    /// Create a tensor from an existing flat buffer.
    ///
    /// Fails if the buffer length does not match the shape's element count.
    pub fn from_vec(
        batches: usize,
        channels: usize,
        rows: usize,
        cols: usize,
        data: Vec<f32>,
    ) -> Result<Self, CnnError> {
        let shape = Shape::new(batches, channels, rows, cols);
        if data.len() != shape.len() {
            return Err(CnnError::InvalidOperand {
                op: "from_vec",
                shape,
                message: format!(
                    "buffer holds {} elements but the shape requires {}",
                    data.len(),
                    shape.len()
                ),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn batches(&self) -> usize {
        self.shape.batches
    }

    pub fn channels(&self) -> usize {
        self.shape.channels
    }

    pub fn rows(&self) -> usize {
        self.shape.rows
    }

    pub fn cols(&self) -> usize {
        self.shape.cols
    }

    /// Read one element.
    #[inline]
    pub fn get(&self, b: usize, c: usize, r: usize, col: usize) -> f32 {
        self.data[self.shape.index(b, c, r, col)]
    }

    /// Write one element.
    #[inline]
    pub fn set(&mut self, b: usize, c: usize, r: usize, col: usize, value: f32) {
        let i = self.shape.index(b, c, r, col);
        self.data[i] = value;
    }

    /// Borrow the flat backing store.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutably borrow the flat backing store.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Elementwise addition. Operand shapes must be identical.
    pub fn add(&self, other: &Tensor) -> Result<Tensor, CnnError> {
        if self.shape != other.shape {
            return Err(CnnError::ShapeMismatch {
                op: "add",
                left: self.shape,
                right: other.shape,
            });
        }
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a + b)
            .collect();
        Ok(Tensor {
            shape: self.shape,
            data,
        })
    }

    /// Elementwise subtraction. Operand shapes must be identical.
    pub fn sub(&self, other: &Tensor) -> Result<Tensor, CnnError> {
        if self.shape != other.shape {
            return Err(CnnError::ShapeMismatch {
                op: "sub",
                left: self.shape,
                right: other.shape,
            });
        }
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a - b)
            .collect();
        Ok(Tensor {
            shape: self.shape,
            data,
        })
    }

    /// Multiply every element by a scalar.
    pub fn scale(&self, factor: f32) -> Tensor {
        Tensor {
            shape: self.shape,
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    /// Batched matrix multiply over the last two axes.
    ///
    /// Treats each (batch, channel) slice as a 2-D matrix and requires
    /// `self.cols == other.rows`. A singleton batch or channel axis on
    /// either operand is broadcast across the other operand's corresponding
    /// axis; this is the rule that lets one shared `(1,1,in,out)` weight
    /// matrix apply to every sample of a `(B,1,1,in)` activation. Output
    /// shape: `(max(b1,b2), max(c1,c2), self.rows, other.cols)`.
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor, CnnError> {
        let a = self.shape;
        let b = other.shape;

        let batches_ok = a.batches == b.batches || a.batches == 1 || b.batches == 1;
        let channels_ok = a.channels == b.channels || a.channels == 1 || b.channels == 1;
        if a.cols != b.rows || !batches_ok || !channels_ok {
            return Err(CnnError::ShapeMismatch {
                op: "matmul",
                left: a,
                right: b,
            });
        }

        let out_batches = a.batches.max(b.batches);
        let out_channels = a.channels.max(b.channels);
        let mut out = Tensor::new(out_batches, out_channels, a.rows, b.cols);

        for batch in 0..out_batches {
            let ab = if a.batches == 1 { 0 } else { batch };
            let bb = if b.batches == 1 { 0 } else { batch };
            for ch in 0..out_channels {
                let ac = if a.channels == 1 { 0 } else { ch };
                let bc = if b.channels == 1 { 0 } else { ch };
                for i in 0..a.rows {
                    for j in 0..b.cols {
                        let mut sum = 0.0f32;
                        for k in 0..a.cols {
                            sum += self.get(ab, ac, i, k) * other.get(bb, bc, k, j);
                        }
                        out.set(batch, ch, i, j, sum);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Swap the row and column axes, preserving batches and channels.
    pub fn transpose(&self) -> Tensor {
        let s = self.shape;
        let mut out = Tensor::new(s.batches, s.channels, s.cols, s.rows);
        for b in 0..s.batches {
            for c in 0..s.channels {
                for r in 0..s.rows {
                    for col in 0..s.cols {
                        out.set(b, c, col, r, self.get(b, c, r, col));
                    }
                }
            }
        }
        out
    }

    /// 2-D convolution (direct cross-correlation, no kernel flip).
    ///
    /// `filters` has shape `(out_channels, in_channels, kH, kW)` and its
    /// `in_channels` must equal this tensor's channel count. The input is
    /// zero-padded symmetrically by `padding` on rows and columns; output
    /// spatial extent is `(in + 2*padding - k) / stride + 1`. A kernel
    /// larger than the padded input, or a zero stride, is an error.
    pub fn convolve(
        &self,
        filters: &Tensor,
        stride: usize,
        padding: usize,
    ) -> Result<Tensor, CnnError> {
        if stride == 0 {
            return Err(CnnError::InvalidOperand {
                op: "convolve",
                shape: self.shape,
                message: "stride must be at least 1".to_string(),
            });
        }
        let s = self.shape;
        let f = filters.shape;
        if f.channels != s.channels {
            return Err(CnnError::ShapeMismatch {
                op: "convolve",
                left: s,
                right: f,
            });
        }
        let span_rows = s.rows as isize + 2 * padding as isize - f.rows as isize;
        let span_cols = s.cols as isize + 2 * padding as isize - f.cols as isize;
        if span_rows < 0 || span_cols < 0 {
            return Err(CnnError::ShapeMismatch {
                op: "convolve",
                left: s,
                right: f,
            });
        }
        let out_rows = span_rows as usize / stride + 1;
        let out_cols = span_cols as usize / stride + 1;
        let pad = padding as isize;

        let mut out = Tensor::new(s.batches, f.batches, out_rows, out_cols);
        for b in 0..s.batches {
            for oc in 0..f.batches {
                for oy in 0..out_rows {
                    for ox in 0..out_cols {
                        let mut sum = 0.0f32;
                        for ic in 0..s.channels {
                            for ky in 0..f.rows {
                                for kx in 0..f.cols {
                                    // Padded coordinate back in input space.
                                    let iy = (oy * stride + ky) as isize - pad;
                                    let ix = (ox * stride + kx) as isize - pad;
                                    if iy >= 0
                                        && iy < s.rows as isize
                                        && ix >= 0
                                        && ix < s.cols as isize
                                    {
                                        sum += self.get(b, ic, iy as usize, ix as usize)
                                            * filters.get(oc, ic, ky, kx);
                                    }
                                }
                            }
                        }
                        out.set(b, oc, oy, ox, sum);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Gradient of a convolution with respect to its filters.
    ///
    /// `self` is the original forward input; `grad_output` is the gradient
    /// flowing back into the convolution's output. The result has the
    /// filters' shape and accumulates, over batches and output positions,
    /// `input[b][c][oy*stride+ky-padding][ox*stride+kx-padding] * grad[b][f][oy][ox]`
    /// with every access bounds-checked against the input extent. Batch
    /// averaging is left to the caller.
    pub fn conv_filter_grad(
        &self,
        grad_output: &Tensor,
        filters: &Tensor,
        stride: usize,
        padding: usize,
    ) -> Result<Tensor, CnnError> {
        let s = self.shape;
        let g = grad_output.shape;
        let f = filters.shape;
        if g.batches != s.batches || g.channels != f.batches || f.channels != s.channels {
            return Err(CnnError::ShapeMismatch {
                op: "conv_filter_grad",
                left: s,
                right: g,
            });
        }
        let pad = padding as isize;

        let mut grad_filters = Tensor::from_shape(f);
        for b in 0..s.batches {
            for oc in 0..f.batches {
                for ic in 0..s.channels {
                    for oy in 0..g.rows {
                        for ox in 0..g.cols {
                            let gval = grad_output.get(b, oc, oy, ox);
                            for ky in 0..f.rows {
                                for kx in 0..f.cols {
                                    let iy = (oy * stride + ky) as isize - pad;
                                    let ix = (ox * stride + kx) as isize - pad;
                                    if iy >= 0
                                        && iy < s.rows as isize
                                        && ix >= 0
                                        && ix < s.cols as isize
                                    {
                                        let i = f.index(oc, ic, ky, kx);
                                        grad_filters.data[i] +=
                                            self.get(b, ic, iy as usize, ix as usize) * gval;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(grad_filters)
    }

    /// Gradient of a convolution with respect to its input.
    ///
    /// `self` is the gradient at the convolution's output. The result is a
    /// transposed convolution against `filters` with spatial extent
    /// `(grad_rows - 1) * stride - 2*padding + kH` (and likewise for
    /// columns), which recovers the forward input's extent; padding is
    /// accounted for on this path as well.
    pub fn conv_input_grad(
        &self,
        filters: &Tensor,
        stride: usize,
        padding: usize,
    ) -> Result<Tensor, CnnError> {
        let g = self.shape;
        let f = filters.shape;
        if g.channels != f.batches {
            return Err(CnnError::ShapeMismatch {
                op: "conv_input_grad",
                left: g,
                right: f,
            });
        }
        let in_rows =
            (g.rows as isize - 1) * stride as isize - 2 * padding as isize + f.rows as isize;
        let in_cols =
            (g.cols as isize - 1) * stride as isize - 2 * padding as isize + f.cols as isize;
        if in_rows <= 0 || in_cols <= 0 {
            return Err(CnnError::InvalidOperand {
                op: "conv_input_grad",
                shape: g,
                message: format!(
                    "reconstructed input extent {}x{} is not positive",
                    in_rows, in_cols
                ),
            });
        }
        let (in_rows, in_cols) = (in_rows as usize, in_cols as usize);
        let pad = padding as isize;

        let mut grad_input = Tensor::new(g.batches, f.channels, in_rows, in_cols);
        for b in 0..g.batches {
            for oc in 0..f.batches {
                for oy in 0..g.rows {
                    for ox in 0..g.cols {
                        let gval = self.get(b, oc, oy, ox);
                        for ic in 0..f.channels {
                            for ky in 0..f.rows {
                                for kx in 0..f.cols {
                                    let iy = (oy * stride + ky) as isize - pad;
                                    let ix = (ox * stride + kx) as isize - pad;
                                    if iy >= 0
                                        && iy < in_rows as isize
                                        && ix >= 0
                                        && ix < in_cols as isize
                                    {
                                        let i = grad_input.shape.index(
                                            b,
                                            ic,
                                            iy as usize,
                                            ix as usize,
                                        );
                                        grad_input.data[i] += gval * filters.get(oc, ic, ky, kx);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(grad_input)
    }

    /// Max pooling over non-overlapping `pool_h x pool_w` windows.
    ///
    /// Output extents are floor-divided (`rows / pool_h`, `cols / pool_w`);
    /// trailing rows and columns that do not fill a window are discarded.
    /// No padding is applied.
    pub fn max_pool(&self, pool_h: usize, pool_w: usize) -> Result<Tensor, CnnError> {
        let s = self.shape;
        if pool_h == 0 || pool_w == 0 || pool_h > s.rows || pool_w > s.cols {
            return Err(CnnError::InvalidOperand {
                op: "max_pool",
                shape: s,
                message: format!("pool window {}x{} does not fit", pool_h, pool_w),
            });
        }
        let out_rows = s.rows / pool_h;
        let out_cols = s.cols / pool_w;

        let mut out = Tensor::new(s.batches, s.channels, out_rows, out_cols);
        for b in 0..s.batches {
            for c in 0..s.channels {
                for py in 0..out_rows {
                    for px in 0..out_cols {
                        let mut best = f32::NEG_INFINITY;
                        for dy in 0..pool_h {
                            for dx in 0..pool_w {
                                let v = self.get(b, c, py * pool_h + dy, px * pool_w + dx);
                                if v > best {
                                    best = v;
                                }
                            }
                        }
                        out.set(b, c, py, px, best);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Collapse channels/rows/cols into a single column axis.
    ///
    /// The result has shape `(batches, 1, 1, channels*rows*cols)` with
    /// element order `index = channel*rows*cols + row*cols + col`. Because
    /// the backing store is row-major, this is a metadata change over the
    /// same element order.
    pub fn flatten(&self) -> Tensor {
        let s = self.shape;
        Tensor {
            shape: Shape::new(s.batches, 1, 1, s.channels * s.rows * s.cols),
            data: self.data.clone(),
        }
    }

    /// Reinterpret the element buffer under a new shape.
    ///
    /// The inverse of [`Tensor::flatten`]; fails unless the element counts
    /// match.
    pub fn reshape(&self, shape: Shape) -> Result<Tensor, CnnError> {
        if shape.len() != self.shape.len() {
            return Err(CnnError::ShapeMismatch {
                op: "reshape",
                left: self.shape,
                right: shape,
            });
        }
        Ok(Tensor {
            shape,
            data: self.data.clone(),
        })
    }

    /// Softmax along the channel axis, independently per (batch, row, col).
    ///
    /// The maximum channel value is subtracted before exponentiation so
    /// large logits cannot overflow.
    pub fn softmax(&self) -> Tensor {
        let s = self.shape;
        let mut out = Tensor::from_shape(s);
        for b in 0..s.batches {
            for r in 0..s.rows {
                for col in 0..s.cols {
                    let mut max_value = f32::NEG_INFINITY;
                    for c in 0..s.channels {
                        let v = self.get(b, c, r, col);
                        if v > max_value {
                            max_value = v;
                        }
                    }

                    let mut sum = 0.0f32;
                    for c in 0..s.channels {
                        let e = (self.get(b, c, r, col) - max_value).exp();
                        out.set(b, c, r, col, e);
                        sum += e;
                    }

                    let inv_sum = 1.0 / sum;
                    for c in 0..s.channels {
                        let v = out.get(b, c, r, col) * inv_sum;
                        out.set(b, c, r, col, v);
                    }
                }
            }
        }
        out
    }

    /// Elementwise rectified linear unit: `max(0, x)`.
    pub fn relu(&self) -> Tensor {
        Tensor {
            shape: self.shape,
            data: self.data.iter().map(|v| v.max(0.0)).collect(),
        }
    }

    /// Add a `(1,1,1,N)` bias row vector in place to every batch row.
    ///
    /// `self` must be shaped `(batches, C, 1, N)`. This is one of the two
    /// documented in-place operations.
    pub fn add_biases(&mut self, bias: &Tensor) -> Result<(), CnnError> {
        let s = self.shape;
        let b = bias.shape;
        if b.batches != 1 || b.channels != 1 || b.rows != 1 || s.rows != 1 || s.cols != b.cols {
            return Err(CnnError::ShapeMismatch {
                op: "add_biases",
                left: s,
                right: b,
            });
        }
        for batch in 0..s.batches {
            for c in 0..s.channels {
                for j in 0..s.cols {
                    let i = s.index(batch, c, 0, j);
                    self.data[i] += bias.data[j];
                }
            }
        }
        Ok(())
    }

    /// He initialization in place: each element becomes
    /// `N(0,1) * sqrt(2 / fan_in)` where `fan_in = rows * cols`.
    ///
    /// The second documented in-place operation. The RNG is injected so
    /// initialization is reproducible under a fixed seed.
    pub fn he_init(&mut self, rng: &mut SimpleRng) {
        let fan_in = (self.shape.rows * self.shape.cols) as f32;
        let scale = (2.0 / fan_in).sqrt();
        for v in &mut self.data {
            *v = rng.next_gaussian_f32() * scale;
        }
    }

    /// Sum across the batch axis, collapsing it to 1.
    pub fn sum_batches(&self) -> Tensor {
        let s = self.shape;
        let mut out = Tensor::new(1, s.channels, s.rows, s.cols);
        for b in 0..s.batches {
            for c in 0..s.channels {
                for r in 0..s.rows {
                    for col in 0..s.cols {
                        let i = out.shape.index(0, c, r, col);
                        out.data[i] += self.get(b, c, r, col);
                    }
                }
            }
        }
        out
    }

    /// Average across the batch axis, collapsing it to 1.
    pub fn mean_batches(&self) -> Tensor {
        self.sum_batches().scale(1.0 / self.shape.batches as f32)
    }

    /// Index of the largest element in the flat buffer.
    ///
    /// Used on `(1,1,1,K)` class-score vectors to pick the predicted label;
    /// ties resolve to the earliest index.
    pub fn argmax(&self) -> usize {
        let mut best = 0usize;
        let mut best_value = f32::NEG_INFINITY;
        for (i, &v) in self.data.iter().enumerate() {
            if v > best_value {
                best_value = v;
                best = i;
            }
        }
        best
    }

    /// Stack per-sample tensors (batch axis 1) into one batch tensor.
    ///
    /// Every sample must share the same `(1, c, r, w)` shape; the result is
    /// `(samples.len(), c, r, w)` in the given order.
    pub fn stack(samples: &[Tensor]) -> Result<Tensor, CnnError> {
        let first = samples
            .first()
            .ok_or_else(|| CnnError::InvalidConfig("cannot stack an empty sample set".into()))?;
        let s = first.shape;
        if s.batches != 1 {
            return Err(CnnError::InvalidOperand {
                op: "stack",
                shape: s,
                message: "samples must have a singleton batch axis".to_string(),
            });
        }

        let mut out = Tensor::new(samples.len(), s.channels, s.rows, s.cols);
        let sample_len = s.len();
        for (i, sample) in samples.iter().enumerate() {
            if sample.shape != s {
                return Err(CnnError::ShapeMismatch {
                    op: "stack",
                    left: s,
                    right: sample.shape,
                });
            }
            out.data[i * sample_len..(i + 1) * sample_len].copy_from_slice(&sample.data);
        }
        Ok(out)
    }
}
