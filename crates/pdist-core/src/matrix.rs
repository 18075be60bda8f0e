//! Borrowed matrix views. Validation of the underlying buffers is done once
//! in the constructors; kernels downstream trust the invariants.

use crate::error::{Error, Result};

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Element types a dense matrix may hold.
pub trait Float: sealed::Sealed + Copy + std::fmt::Debug + Send + Sync + 'static {
    fn to_f64(self) -> f64;

    /// Dot product accumulated in `f64`.
    fn dot_f64(a: &[Self], b: &[Self]) -> f64;

    fn matrix_ref(m: DenseMatrix<'_, Self>) -> MatrixRef<'_>;
}

impl Float for f32 {
    #[inline(always)]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    #[inline]
    fn dot_f64(a: &[Self], b: &[Self]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(&x, &y)| f64::from(x) * f64::from(y))
            .sum()
    }

    fn matrix_ref(m: DenseMatrix<'_, Self>) -> MatrixRef<'_> {
        MatrixRef::DenseF32(m)
    }
}

impl Float for f64 {
    #[inline(always)]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn dot_f64(a: &[Self], b: &[Self]) -> f64 {
        crate::linalg::dot(a, b)
    }

    fn matrix_ref(m: DenseMatrix<'_, Self>) -> MatrixRef<'_> {
        MatrixRef::DenseF64(m)
    }
}

/// Row-major dense matrix.
#[derive(Debug, Clone, Copy)]
pub struct DenseMatrix<'a, T> {
    data: &'a [T],
    n_rows: usize,
    n_cols: usize,
}

impl<'a, T: Float> DenseMatrix<'a, T> {
    pub fn new(data: &'a [T], n_rows: usize, n_cols: usize) -> Result<Self> {
        if n_rows.checked_mul(n_cols) != Some(data.len()) {
            return Err(Error::shape(
                format!("{n_rows}x{n_cols} elements"),
                format!("{} elements", data.len()),
            ));
        }
        Ok(Self {
            data,
            n_rows,
            n_cols,
        })
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn row(&self, i: usize) -> &'a [T] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }
}

/// Compressed sparse row matrix with `f64` values.
#[derive(Debug, Clone, Copy)]
pub struct CsrMatrix<'a> {
    data: &'a [f64],
    indices: &'a [usize],
    indptr: &'a [usize],
    n_cols: usize,
}

impl<'a> CsrMatrix<'a> {
    /// Checks the structural invariants: `indptr` starts at 0, is
    /// non-decreasing and ends at `data.len()`; column indices are below
    /// `n_cols` and strictly increasing within a row.
    pub fn new(
        data: &'a [f64],
        indices: &'a [usize],
        indptr: &'a [usize],
        n_cols: usize,
    ) -> Result<Self> {
        if indptr.is_empty() {
            return Err(Error::shape("indptr of length n_rows + 1", "empty indptr"));
        }
        if data.len() != indices.len() {
            return Err(Error::shape(
                format!("{} column indices", data.len()),
                format!("{} column indices", indices.len()),
            ));
        }
        if indptr[0] != 0 || indptr[indptr.len() - 1] != data.len() {
            return Err(Error::shape(
                format!("indptr spanning 0..{}", data.len()),
                format!("indptr spanning {}..{}", indptr[0], indptr[indptr.len() - 1]),
            ));
        }
        for w in indptr.windows(2) {
            if w[0] > w[1] {
                return Err(Error::shape(
                    "non-decreasing indptr",
                    format!("{} followed by {}", w[0], w[1]),
                ));
            }
            let cols = &indices[w[0]..w[1]];
            if cols.windows(2).any(|c| c[0] >= c[1]) || cols.last().is_some_and(|&c| c >= n_cols)
            {
                return Err(Error::shape(
                    format!("sorted column indices below {n_cols}"),
                    format!("{cols:?}"),
                ));
            }
        }
        Ok(Self {
            data,
            indices,
            indptr,
            n_cols,
        })
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Stored values and their column indices for row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> (&'a [f64], &'a [usize]) {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        (&self.data[start..end], &self.indices[start..end])
    }
}

/// Any matrix the row-norm kernels accept.
#[derive(Debug, Clone, Copy)]
pub enum MatrixRef<'a> {
    DenseF64(DenseMatrix<'a, f64>),
    DenseF32(DenseMatrix<'a, f32>),
    Csr(CsrMatrix<'a>),
}

impl MatrixRef<'_> {
    pub fn n_rows(&self) -> usize {
        match self {
            MatrixRef::DenseF64(m) => m.n_rows(),
            MatrixRef::DenseF32(m) => m.n_rows(),
            MatrixRef::Csr(m) => m.n_rows(),
        }
    }
}

impl<'a> From<DenseMatrix<'a, f64>> for MatrixRef<'a> {
    fn from(m: DenseMatrix<'a, f64>) -> Self {
        MatrixRef::DenseF64(m)
    }
}

impl<'a> From<DenseMatrix<'a, f32>> for MatrixRef<'a> {
    fn from(m: DenseMatrix<'a, f32>) -> Self {
        MatrixRef::DenseF32(m)
    }
}

impl<'a> From<CsrMatrix<'a>> for MatrixRef<'a> {
    fn from(m: CsrMatrix<'a>) -> Self {
        MatrixRef::Csr(m)
    }
}
