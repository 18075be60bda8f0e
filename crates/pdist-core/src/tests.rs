use super::*;

#[test]
fn test_euclidean_distance() {
    let a = [1.0, 2.0, 3.0];
    let b = [4.0, 5.0, 6.0];
    // diffs: -3, -3, -3. sq: 9, 9, 9. sum: 27.
    let rdist = EuclideanMetric::rdist(&a, &b);
    assert!((rdist - 27.0).abs() < f64::EPSILON);
    assert!((EuclideanMetric::dist(&a, &b) - 27.0_f64.sqrt()).abs() < 1e-12);
}

#[test]
fn test_manhattan_distance() {
    let a = [1.0f32, -2.0];
    let b = [0.0f32, 2.0];
    assert!((ManhattanMetric::dist(&a, &b) - 5.0).abs() < f64::EPSILON);
    assert!((ManhattanMetric::dist_to_rdist(5.0) - 5.0).abs() < f64::EPSILON);
}

#[test]
fn test_dense_pair_with_norms_matches_direct() {
    let x = [1.0, 2.0, 3.0, -1.0, 0.5, 2.0];
    let y = [0.0, 1.0, 1.0, 2.0, 2.0, 2.0, -3.0, 0.0, 1.0];
    let xm = DenseMatrix::new(&x, 2, 3).unwrap();
    let ym = DenseMatrix::new(&y, 3, 3).unwrap();

    let direct = DenseDenseDatasetsPair::<f64, EuclideanMetric>::new(xm, ym).unwrap();
    let expanded = DenseDenseDatasetsPair::<f64, EuclideanMetric>::new(xm, ym)
        .unwrap()
        .with_row_norms(2)
        .unwrap();

    for i in 0..2 {
        for j in 0..3 {
            let want = direct.surrogate_dist(i, j);
            let got = expanded.surrogate_dist(i, j);
            assert!((want - got).abs() < 1e-9, "({i}, {j}): {want} vs {got}");
        }
    }
}

#[test]
fn test_pair_rejects_feature_mismatch() {
    let x = [0.0f64; 4];
    let y = [0.0f64; 6];
    let xm = DenseMatrix::new(&x, 2, 2).unwrap();
    let ym = DenseMatrix::new(&y, 2, 3).unwrap();
    let err = DenseDenseDatasetsPair::<f64, EuclideanMetric>::new(xm, ym).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
}

#[test]
fn test_sparse_pair_matches_dense() {
    // X = [[1, 0, 2], [0, 0, 0]], Y = [[0, 3, 2]]
    let xd = [1.0, 2.0];
    let xi = [0, 2];
    let xp = [0, 2, 2];
    let yd = [3.0, 2.0];
    let yi = [1, 2];
    let yp = [0, 2];
    let x = CsrMatrix::new(&xd, &xi, &xp, 3).unwrap();
    let y = CsrMatrix::new(&yd, &yi, &yp, 3).unwrap();
    let pair = SparseSparseDatasetsPair::<EuclideanMetric>::new(x, y).unwrap();

    assert_eq!(pair.n_samples_x(), 2);
    assert_eq!(pair.n_samples_y(), 1);
    // (1-0)^2 + (0-3)^2 + (2-2)^2
    assert!((pair.surrogate_dist(0, 0) - 10.0).abs() < f64::EPSILON);
    // 0 + 9 + 4
    assert!((pair.surrogate_dist(1, 0) - 13.0).abs() < f64::EPSILON);
    assert!((pair.dist(1, 0) - 13.0_f64.sqrt()).abs() < 1e-12);
}

#[test]
fn test_sparse_pair_with_norms_matches_direct() {
    // X = [[1, 0, 2, 0], [0, 0, 0, 0], [0, -1, 0, 4]]
    // Y = [[0, 3, 2, 0], [1, 0, 0, 0.5]]
    let xd = [1.0, 2.0, -1.0, 4.0];
    let xi = [0, 2, 1, 3];
    let xp = [0, 2, 2, 4];
    let yd = [3.0, 2.0, 1.0, 0.5];
    let yi = [1, 2, 0, 3];
    let yp = [0, 2, 4];
    let x = CsrMatrix::new(&xd, &xi, &xp, 4).unwrap();
    let y = CsrMatrix::new(&yd, &yi, &yp, 4).unwrap();

    let direct = SparseSparseDatasetsPair::<EuclideanMetric>::new(x, y).unwrap();
    let expanded = SparseSparseDatasetsPair::<EuclideanMetric>::new(x, y)
        .unwrap()
        .with_row_norms(2)
        .unwrap();

    for i in 0..3 {
        for j in 0..2 {
            let want = direct.surrogate_dist(i, j);
            let got = expanded.surrogate_dist(i, j);
            assert!((want - got).abs() < 1e-9, "({i}, {j}): {want} vs {got}");
        }
    }
    // (1-0)^2 + (0-3)^2 + (2-2)^2 + 0
    assert!((expanded.surrogate_dist(0, 0) - 10.0).abs() < 1e-12);
}
