//! Read-only pairs of vector collections the engine iterates over.

use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::linalg::sparse_dot;
use crate::matrix::{CsrMatrix, DenseMatrix, Float};
use crate::metric::{EuclideanMetric, Metric};
use crate::norms::sqeuclidean_row_norms;

/// Two collections X and Y plus the distance between their samples.
///
/// Implementations are immutable for the lifetime of a run and are shared
/// by reference across all workers.
pub trait DatasetsPair: Sync {
    fn n_samples_x(&self) -> usize;

    fn n_samples_y(&self) -> usize;

    fn n_features(&self) -> usize;

    /// Rank-preserving surrogate of the distance between `X[i]` and `Y[j]`.
    fn surrogate_dist(&self, i: usize, j: usize) -> f64;

    fn surrogate_to_dist(&self, rdist: f64) -> f64;

    fn dist_to_surrogate(&self, dist: f64) -> f64;

    #[inline]
    fn dist(&self, i: usize, j: usize) -> f64 {
        self.surrogate_to_dist(self.surrogate_dist(i, j))
    }
}

#[derive(Debug)]
struct SqNorms {
    x: Vec<f64>,
    y: Vec<f64>,
}

/// Dense X and dense Y of the same element type.
#[derive(Debug)]
pub struct DenseDenseDatasetsPair<'a, T: Float, M: Metric> {
    x: DenseMatrix<'a, T>,
    y: DenseMatrix<'a, T>,
    sq_norms: Option<SqNorms>,
    _metric: PhantomData<M>,
}

impl<'a, T: Float, M: Metric> DenseDenseDatasetsPair<'a, T, M> {
    pub fn new(x: DenseMatrix<'a, T>, y: DenseMatrix<'a, T>) -> Result<Self> {
        if x.n_cols() != y.n_cols() {
            return Err(Error::shape(
                format!("Y with {} features", x.n_cols()),
                format!("Y with {} features", y.n_cols()),
            ));
        }
        Ok(Self {
            x,
            y,
            sq_norms: None,
            _metric: PhantomData,
        })
    }

}

impl<'a, T: Float> DenseDenseDatasetsPair<'a, T, EuclideanMetric> {
    /// Precomputes `||x||²` and `||y||²` so surrogate distances use
    /// `||x||² + ||y||² - 2 x·y`.
    pub fn with_row_norms(mut self, n_threads: usize) -> Result<Self> {
        let x = sqeuclidean_row_norms(T::matrix_ref(self.x), n_threads)?;
        let y = sqeuclidean_row_norms(T::matrix_ref(self.y), n_threads)?;
        self.sq_norms = Some(SqNorms { x, y });
        Ok(self)
    }
}

impl<T: Float, M: Metric> DatasetsPair for DenseDenseDatasetsPair<'_, T, M> {
    #[inline]
    fn n_samples_x(&self) -> usize {
        self.x.n_rows()
    }

    #[inline]
    fn n_samples_y(&self) -> usize {
        self.y.n_rows()
    }

    fn n_features(&self) -> usize {
        self.x.n_cols()
    }

    #[inline]
    fn surrogate_dist(&self, i: usize, j: usize) -> f64 {
        let (a, b) = (self.x.row(i), self.y.row(j));
        match &self.sq_norms {
            // Cancellation can push the expansion slightly below zero.
            Some(n) => (n.x[i] + n.y[j] - 2.0 * T::dot_f64(a, b)).max(0.0),
            None => M::rdist(a, b),
        }
    }

    #[inline]
    fn surrogate_to_dist(&self, rdist: f64) -> f64 {
        M::rdist_to_dist(rdist)
    }

    #[inline]
    fn dist_to_surrogate(&self, dist: f64) -> f64 {
        M::dist_to_rdist(dist)
    }
}

/// CSR X and CSR Y.
#[derive(Debug)]
pub struct SparseSparseDatasetsPair<'a, M: Metric> {
    x: CsrMatrix<'a>,
    y: CsrMatrix<'a>,
    sq_norms: Option<SqNorms>,
    _metric: PhantomData<M>,
}

impl<'a, M: Metric> SparseSparseDatasetsPair<'a, M> {
    pub fn new(x: CsrMatrix<'a>, y: CsrMatrix<'a>) -> Result<Self> {
        if x.n_cols() != y.n_cols() {
            return Err(Error::shape(
                format!("Y with {} features", x.n_cols()),
                format!("Y with {} features", y.n_cols()),
            ));
        }
        Ok(Self {
            x,
            y,
            sq_norms: None,
            _metric: PhantomData,
        })
    }
}

impl SparseSparseDatasetsPair<'_, EuclideanMetric> {
    /// Same expansion as the dense pair; only the columns both rows store
    /// contribute to the dot product.
    pub fn with_row_norms(mut self, n_threads: usize) -> Result<Self> {
        let x = sqeuclidean_row_norms(self.x, n_threads)?;
        let y = sqeuclidean_row_norms(self.y, n_threads)?;
        self.sq_norms = Some(SqNorms { x, y });
        Ok(self)
    }
}

impl<M: Metric> DatasetsPair for SparseSparseDatasetsPair<'_, M> {
    #[inline]
    fn n_samples_x(&self) -> usize {
        self.x.n_rows()
    }

    #[inline]
    fn n_samples_y(&self) -> usize {
        self.y.n_rows()
    }

    fn n_features(&self) -> usize {
        self.x.n_cols()
    }

    #[inline]
    fn surrogate_dist(&self, i: usize, j: usize) -> f64 {
        let (a, b) = (self.x.row(i), self.y.row(j));
        match &self.sq_norms {
            Some(n) => (n.x[i] + n.y[j] - 2.0 * sparse_dot(a, b)).max(0.0),
            None => M::sparse_rdist(a, b),
        }
    }

    #[inline]
    fn surrogate_to_dist(&self, rdist: f64) -> f64 {
        M::rdist_to_dist(rdist)
    }

    #[inline]
    fn dist_to_surrogate(&self, dist: f64) -> f64 {
        M::dist_to_rdist(dist)
    }
}
