//! Squared L2 norm of every row, always accumulated in `f64`.
//!
//! Rows are split statically over the workers: each worker receives one
//! contiguous block of rows and writes only to its own slice of the output.

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::{Error, Result};
use crate::linalg::dot;
use crate::matrix::{CsrMatrix, DenseMatrix, MatrixRef};

/// Squared norms of all rows of `matrix`, computed by `n_threads` workers.
pub fn sqeuclidean_row_norms<'a>(
    matrix: impl Into<MatrixRef<'a>>,
    n_threads: usize,
) -> Result<Vec<f64>> {
    if n_threads == 0 {
        return Err(Error::invalid("n_threads", 0, "must be at least 1"));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .thread_name(|i| format!("pdist-norms-{i}"))
        .build()?;
    Ok(sqeuclidean_row_norms_in(&pool, matrix.into()))
}

/// Same as [`sqeuclidean_row_norms`] on an existing pool; the work is split
/// into one block per pool worker.
pub fn sqeuclidean_row_norms_in(pool: &ThreadPool, matrix: MatrixRef<'_>) -> Vec<f64> {
    let n_rows = matrix.n_rows();
    let mut out = vec![0.0f64; n_rows];
    if n_rows == 0 {
        return out;
    }
    let block = n_rows.div_ceil(pool.current_num_threads().max(1));

    pool.install(|| match matrix {
        MatrixRef::DenseF64(m) => dense_f64(m, &mut out, block),
        MatrixRef::DenseF32(m) => dense_f32(m, &mut out, block),
        MatrixRef::Csr(m) => csr(m, &mut out, block),
    });
    out
}

fn dense_f64(m: DenseMatrix<'_, f64>, out: &mut [f64], block: usize) {
    out.par_chunks_mut(block)
        .enumerate()
        .for_each(|(b, norms)| {
            let first = b * block;
            for (i, norm) in norms.iter_mut().enumerate() {
                let row = m.row(first + i);
                *norm = dot(row, row);
            }
        });
}

fn dense_f32(m: DenseMatrix<'_, f32>, out: &mut [f64], block: usize) {
    out.par_chunks_mut(block)
        .enumerate()
        .for_each(|(b, norms)| {
            // One upcast buffer per worker, reused for all of its rows.
            let mut scratch = vec![0.0f64; m.n_cols()];
            let first = b * block;
            for (i, norm) in norms.iter_mut().enumerate() {
                for (dst, &src) in scratch.iter_mut().zip(m.row(first + i)) {
                    *dst = f64::from(src);
                }
                *norm = dot(&scratch, &scratch);
            }
        });
}

fn csr(m: CsrMatrix<'_>, out: &mut [f64], block: usize) {
    out.par_chunks_mut(block)
        .enumerate()
        .for_each(|(b, norms)| {
            let first = b * block;
            for (i, norm) in norms.iter_mut().enumerate() {
                let (values, _) = m.row(first + i);
                let mut acc = 0.0f64;
                for &v in values {
                    acc += v * v;
                }
                *norm = acc;
            }
        });
}
