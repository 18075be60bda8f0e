use pdist_core::{sqeuclidean_row_norms, CsrMatrix, DenseMatrix};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};

fn naive_norms(data: &[f64], n_cols: usize) -> Vec<f64> {
    data.chunks_exact(n_cols)
        .map(|row| {
            let mut acc = 0.0f64;
            for v in row {
                acc += v * v;
            }
            acc
        })
        .collect()
}

fn assert_close(got: &[f64], want: &[f64]) {
    assert_eq!(got.len(), want.len());
    for (i, (g, w)) in got.iter().zip(want).enumerate() {
        let tol = 1e-12 * w.abs().max(1.0);
        assert!((g - w).abs() <= tol, "row {i}: {g} vs {w}");
    }
}

#[test]
fn test_random_dense_f64_matches_reference() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let (n, d) = (301, 17);
    let data: Vec<f64> = (0..n * d).map(|_| rng.gen_range(-10.0..10.0)).collect();
    let m = DenseMatrix::new(&data, n, d).unwrap();

    let want = naive_norms(&data, d);
    for threads in [1, 3, 8] {
        assert_close(&sqeuclidean_row_norms(m, threads).unwrap(), &want);
    }
}

#[test]
#[allow(clippy::cast_possible_truncation)]
fn test_random_dense_f32_matches_upcast_reference() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(11);
    let (n, d) = (129, 33);
    let data: Vec<f32> = (0..n * d).map(|_| rng.gen_range(-10.0f32..10.0)).collect();
    let upcast: Vec<f64> = data.iter().map(|&v| f64::from(v)).collect();
    let m = DenseMatrix::new(&data, n, d).unwrap();

    let want = naive_norms(&upcast, d);
    for threads in [1, 4] {
        assert_close(&sqeuclidean_row_norms(m, threads).unwrap(), &want);
    }
}

#[test]
fn test_csr_all_zero_rows() {
    let data: [f64; 0] = [];
    let indices: [usize; 0] = [];
    let indptr = [0, 0, 0, 0];
    let m = CsrMatrix::new(&data, &indices, &indptr, 5).unwrap();
    assert_eq!(sqeuclidean_row_norms(m, 2).unwrap(), vec![0.0, 0.0, 0.0]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn test_csr_matches_sum_of_stored_squares(
        rows in proptest::collection::vec(
            proptest::collection::btree_map(0usize..40, -100.0f64..100.0, 0..10),
            1..60,
        ),
        threads in 1usize..6,
    ) {
        let mut data = Vec::new();
        let mut indices = Vec::new();
        let mut indptr = vec![0];
        for row in &rows {
            for (&col, &val) in row {
                indices.push(col);
                data.push(val);
            }
            indptr.push(data.len());
        }
        let m = CsrMatrix::new(&data, &indices, &indptr, 40).unwrap();
        let norms = sqeuclidean_row_norms(m, threads).unwrap();

        for (row, norm) in rows.iter().zip(&norms) {
            let want: f64 = row.values().map(|v| v * v).sum();
            prop_assert!((norm - want).abs() <= 1e-9 * want.max(1.0));
            if row.is_empty() {
                prop_assert_eq!(*norm, 0.0);
            }
        }
    }
}
