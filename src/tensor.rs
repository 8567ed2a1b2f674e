//! Tensor Operations for the Recurrent Network
//!
//! This module provides a minimal tensor library sized for a single-layer
//! recurrent network. Tensors store a flat array with shape information; the
//! operations are the ones the recurrence actually uses, which are matrix by
//! vector rather than matrix by matrix.
//!
//! ## Core Concepts
//!
//! - **Data**: Flat `Vec<f32>` storing all elements in row-major order
//! - **Shape**: Dimensions of the tensor (e.g., `[hidden, vocab]`)
//!
//! ## Example
//!
//! ```rust
//! use puck::Tensor;
//!
//! // A 2x3 matrix applied to a length-3 vector
//! let w = Tensor::new(vec![1.0, 0.0, 2.0, 0.0, 1.0, 0.0], vec![2, 3]);
//! let x = Tensor::new(vec![1.0, 2.0, 3.0], vec![3]);
//! let y = w.matvec(&x);
//! assert_eq!(y.data, vec![7.0, 2.0]);
//! ```
//!
//! ## Performance
//!
//! Matrix-vector products switch to parallel row processing via Rayon above
//! a work threshold; below it the sequential loop wins because the parallel
//! dispatch overhead dominates.

use rayon::prelude::*;

/// Work size (in multiply-adds) above which matvec kernels go parallel
const PARALLEL_THRESHOLD: usize = 1_000;

/// A one- or two-dimensional array of f32 values
///
/// Data is stored contiguously in row-major order. Shape mismatches between
/// operands are programming errors and panic with a message naming both
/// shapes.
#[derive(Clone, Debug)]
pub struct Tensor {
    /// Flat storage of all tensor elements
    pub data: Vec<f32>,
    /// Shape of the tensor (dimensions)
    pub shape: Vec<usize>,
}

impl Tensor {
    /// Create a new tensor with given data and shape
    ///
    /// # Panics
    ///
    /// Panics if the product of shape dimensions doesn't equal data length
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        let expected_size: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected_size,
            "Data length ({}) doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            expected_size
        );
        Self { data, shape }
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: Vec<usize>) -> Self {
        let size: usize = shape.iter().product();
        Self::new(vec![0.0; size], shape)
    }

    /// Matrix-vector product: `[m, n] x [n] -> [m]`
    ///
    /// Each output element is the dot product of one matrix row with the
    /// vector. Rows are processed in parallel when `m * n` exceeds the work
    /// threshold.
    ///
    /// # Panics
    ///
    /// Panics unless `self` is 2-D, `x` is 1-D, and the inner dimensions
    /// match.
    pub fn matvec(&self, x: &Tensor) -> Tensor {
        assert_eq!(self.shape.len(), 2, "matvec needs a 2-D matrix, got {:?}", self.shape);
        assert_eq!(x.shape.len(), 1, "matvec needs a 1-D vector, got {:?}", x.shape);
        let m = self.shape[0];
        let n = self.shape[1];
        assert_eq!(
            n, x.shape[0],
            "matvec dimensions incompatible: [{}, {}] x [{}]",
            m, n, x.shape[0]
        );

        let row_dot = |i: usize| -> f32 {
            let row = &self.data[i * n..(i + 1) * n];
            row.iter().zip(&x.data).map(|(w, v)| w * v).sum()
        };

        let result: Vec<f32> = if m * n >= PARALLEL_THRESHOLD {
            (0..m).into_par_iter().map(row_dot).collect()
        } else {
            (0..m).map(row_dot).collect()
        };

        Tensor::new(result, vec![m])
    }

    /// Transposed matrix-vector product: `[m, n]^T x [m] -> [n]`
    ///
    /// Computes `out[j] = sum_i self[i, j] * y[i]` without materializing the
    /// transpose. Used to pull output gradients back through a weight matrix.
    ///
    /// # Panics
    ///
    /// Panics unless `self` is 2-D, `y` is 1-D, and `y` matches the row
    /// count.
    pub fn matvec_t(&self, y: &Tensor) -> Tensor {
        assert_eq!(self.shape.len(), 2, "matvec_t needs a 2-D matrix, got {:?}", self.shape);
        assert_eq!(y.shape.len(), 1, "matvec_t needs a 1-D vector, got {:?}", y.shape);
        let m = self.shape[0];
        let n = self.shape[1];
        assert_eq!(
            m, y.shape[0],
            "matvec_t dimensions incompatible: [{}, {}]^T x [{}]",
            m, n, y.shape[0]
        );

        let col_dot = |j: usize| -> f32 {
            (0..m).map(|i| self.data[i * n + j] * y.data[i]).sum()
        };

        let result: Vec<f32> = if m * n >= PARALLEL_THRESHOLD {
            (0..n).into_par_iter().map(col_dot).collect()
        } else {
            (0..n).map(col_dot).collect()
        };

        Tensor::new(result, vec![n])
    }

    /// Copy one column of a 2-D tensor into a fresh vector
    ///
    /// For a one-hot input this is the whole matrix-vector product: the
    /// product of a matrix with a one-hot vector selects a single column.
    pub fn column(&self, j: usize) -> Tensor {
        assert_eq!(self.shape.len(), 2, "column needs a 2-D matrix, got {:?}", self.shape);
        let m = self.shape[0];
        let n = self.shape[1];
        assert!(j < n, "column index {} out of range for shape {:?}", j, self.shape);

        let data: Vec<f32> = (0..m).map(|i| self.data[i * n + j]).collect();
        Tensor::new(data, vec![m])
    }

    /// Element-wise addition of two same-shape tensors
    pub fn add(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            self.shape, other.shape,
            "Shapes must match for addition: {:?} + {:?}",
            self.shape, other.shape
        );
        let result = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a + b)
            .collect();
        Tensor::new(result, self.shape.clone())
    }

    /// Element-wise tanh
    pub fn tanh(&self) -> Tensor {
        let result = self.data.iter().map(|&x| x.tanh()).collect();
        Tensor::new(result, self.shape.clone())
    }

    /// Softmax of a 1-D logits vector
    ///
    /// Uses the numerically stable version:
    ///
    /// ```text
    /// softmax(x)[i] = exp(x[i] - max(x)) / sum(exp(x[j] - max(x)))
    /// ```
    ///
    /// Subtracting the maximum prevents overflow in exp() while producing
    /// the same result (the max factors cancel out).
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not 1-D.
    pub fn softmax(&self) -> Tensor {
        assert_eq!(self.shape.len(), 1, "softmax needs a 1-D vector, got {:?}", self.shape);

        let max = self.data.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let exp_values: Vec<f32> = self.data.iter().map(|&x| (x - max).exp()).collect();
        let sum: f32 = exp_values.iter().sum();
        let result = exp_values.iter().map(|&x| x / sum).collect();

        Tensor::new(result, self.shape.clone())
    }

    /// Accumulate an outer product: `self[i, j] += col[i] * row[j]`
    ///
    /// This is the weight-gradient update shape: the gradient of a matrix
    /// used as `W x` is the outer product of the downstream gradient with
    /// the input vector.
    ///
    /// # Panics
    ///
    /// Panics unless `self` is `[col.len(), row.len()]`.
    pub fn add_outer(&mut self, col: &Tensor, row: &Tensor) {
        assert_eq!(self.shape.len(), 2, "add_outer target must be 2-D, got {:?}", self.shape);
        let m = self.shape[0];
        let n = self.shape[1];
        assert_eq!(
            (m, n),
            (col.data.len(), row.data.len()),
            "add_outer dimensions incompatible: [{}, {}] += [{}] x [{}]",
            m,
            n,
            col.data.len(),
            row.data.len()
        );

        for i in 0..m {
            let c = col.data[i];
            let out_row = &mut self.data[i * n..(i + 1) * n];
            for (o, &r) in out_row.iter_mut().zip(&row.data) {
                *o += c * r;
            }
        }
    }

    /// Accumulate a vector into one column: `self[i, j] += v[i]`
    ///
    /// The one-hot counterpart of [`Tensor::add_outer`]: an outer product
    /// with a one-hot row vector touches exactly one column.
    pub fn add_to_column(&mut self, j: usize, v: &Tensor) {
        assert_eq!(self.shape.len(), 2, "add_to_column target must be 2-D, got {:?}", self.shape);
        let m = self.shape[0];
        let n = self.shape[1];
        assert!(j < n, "column index {} out of range for shape {:?}", j, self.shape);
        assert_eq!(
            m,
            v.data.len(),
            "add_to_column dimensions incompatible: [{}, {}] column += [{}]",
            m,
            n,
            v.data.len()
        );

        for i in 0..m {
            self.data[i * n + j] += v.data[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matvec_small() {
        let w = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let x = Tensor::new(vec![1.0, 0.0, -1.0], vec![3]);
        let y = w.matvec(&x);
        assert_eq!(y.shape, vec![2]);
        assert_eq!(y.data, vec![-2.0, -2.0]);
    }

    #[test]
    fn matvec_large_matches_sequential() {
        // Cross the parallel threshold and compare against a hand loop
        let m = 40;
        let n = 50;
        let w = Tensor::new((0..m * n).map(|i| (i % 7) as f32 - 3.0).collect(), vec![m, n]);
        let x = Tensor::new((0..n).map(|i| (i % 5) as f32 * 0.5).collect(), vec![n]);

        let y = w.matvec(&x);
        for i in 0..m {
            let expected: f32 = (0..n).map(|j| w.data[i * n + j] * x.data[j]).sum();
            assert!((y.data[i] - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn matvec_t_matches_transpose() {
        let w = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let y = Tensor::new(vec![1.0, -1.0], vec![2]);
        let out = w.matvec_t(&y);
        assert_eq!(out.shape, vec![3]);
        assert_eq!(out.data, vec![-3.0, -3.0, -3.0]);
    }

    #[test]
    fn column_extracts() {
        let w = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let c = w.column(1);
        assert_eq!(c.data, vec![2.0, 5.0]);

        // Column extraction equals matvec with a one-hot vector
        let one_hot = Tensor::new(vec![0.0, 1.0, 0.0], vec![3]);
        assert_eq!(w.matvec(&one_hot).data, c.data);
    }

    #[test]
    fn softmax_is_a_distribution() {
        let logits = Tensor::new(vec![1.0, 2.0, 3.0, -1.0], vec![4]);
        let probs = logits.softmax();

        let sum: f32 = probs.data.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs.data.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn softmax_survives_large_logits() {
        // Direct exponentiation of 1000 overflows f32; max-subtraction must not
        let logits = Tensor::new(vec![1000.0, 999.0, 998.0], vec![3]);
        let probs = logits.softmax();

        assert!(probs.data.iter().all(|p| p.is_finite()));
        let sum: f32 = probs.data.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs.data[0] > probs.data[1]);
    }

    #[test]
    fn softmax_of_zeros_is_uniform() {
        let probs = Tensor::zeros(vec![8]).softmax();
        for &p in &probs.data {
            assert!((p - 0.125).abs() < 1e-6);
        }
    }

    #[test]
    fn add_outer_accumulates() {
        let mut w = Tensor::zeros(vec![2, 3]);
        let col = Tensor::new(vec![1.0, 2.0], vec![2]);
        let row = Tensor::new(vec![3.0, 4.0, 5.0], vec![3]);

        w.add_outer(&col, &row);
        w.add_outer(&col, &row);
        assert_eq!(w.data, vec![6.0, 8.0, 10.0, 12.0, 16.0, 20.0]);
    }

    #[test]
    fn add_to_column_matches_one_hot_outer() {
        let v = Tensor::new(vec![1.5, -2.5], vec![2]);

        let mut direct = Tensor::zeros(vec![2, 3]);
        direct.add_to_column(2, &v);

        let mut via_outer = Tensor::zeros(vec![2, 3]);
        let one_hot = Tensor::new(vec![0.0, 0.0, 1.0], vec![3]);
        via_outer.add_outer(&v, &one_hot);

        assert_eq!(direct.data, via_outer.data);
    }

    #[test]
    #[should_panic(expected = "matvec dimensions incompatible")]
    fn matvec_rejects_mismatched_shapes() {
        let w = Tensor::zeros(vec![2, 3]);
        let x = Tensor::zeros(vec![4]);
        w.matvec(&x);
    }

    #[test]
    #[should_panic(expected = "doesn't match shape")]
    fn new_rejects_wrong_data_length() {
        Tensor::new(vec![1.0, 2.0], vec![3]);
    }
}
