//! Scalar kernels shared by the metrics and the row-norm code.

/// Dot product with four independent accumulators.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);

    let mut acc = [0.0f64; 4];
    let mut a_chunks = a.chunks_exact(4);
    let mut b_chunks = b.chunks_exact(4);
    for (ca, cb) in a_chunks.by_ref().zip(b_chunks.by_ref()) {
        acc[0] += ca[0] * cb[0];
        acc[1] += ca[1] * cb[1];
        acc[2] += ca[2] * cb[2];
        acc[3] += ca[3] * cb[3];
    }
    let tail: f64 = a_chunks
        .remainder()
        .iter()
        .zip(b_chunks.remainder())
        .map(|(x, y)| x * y)
        .sum();

    (acc[0] + acc[1]) + (acc[2] + acc[3]) + tail
}

/// Dot product of two sparse rows with sorted column indices.
pub fn sparse_dot(a: (&[f64], &[usize]), b: (&[f64], &[usize])) -> f64 {
    let (a_vals, a_idx) = a;
    let (b_vals, b_idx) = b;
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a_idx.len() && j < b_idx.len() {
        match a_idx[i].cmp(&b_idx[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a_vals[i] * b_vals[j];
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

/// Merges two sparse rows, calling `f(a_value, b_value)` for every column
/// present in either one (missing entries are `0.0`).
pub fn sparse_zip_fold(
    a: (&[f64], &[usize]),
    b: (&[f64], &[usize]),
    mut f: impl FnMut(f64, f64) -> f64,
) -> f64 {
    let (a_vals, a_idx) = a;
    let (b_vals, b_idx) = b;
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a_idx.len() || j < b_idx.len() {
        let ca = a_idx.get(i).copied().unwrap_or(usize::MAX);
        let cb = b_idx.get(j).copied().unwrap_or(usize::MAX);
        if ca < cb {
            sum += f(a_vals[i], 0.0);
            i += 1;
        } else if cb < ca {
            sum += f(0.0, b_vals[j]);
            j += 1;
        } else {
            sum += f(a_vals[i], b_vals[j]);
            i += 1;
            j += 1;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_with_tail() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let b = [1.0; 7];
        assert!((dot(&a, &b) - 28.0).abs() < f64::EPSILON);
        assert!(dot(&[], &[]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sparse_dot_only_counts_shared_columns() {
        let a = ([1.0, 2.0, 3.0].as_slice(), [0, 3, 5].as_slice());
        let b = ([4.0, 5.0].as_slice(), [3, 4].as_slice());
        assert!((sparse_dot(a, b) - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sparse_zip_fold_visits_union() {
        let a = ([1.0, 2.0].as_slice(), [0, 2].as_slice());
        let b = ([3.0].as_slice(), [2].as_slice());
        // |1-0| + |2-3|
        let l1 = sparse_zip_fold(a, b, |x, y| (x - y).abs());
        assert!((l1 - 2.0).abs() < f64::EPSILON);
    }
}
