use crate::linalg::sparse_zip_fold;
use crate::matrix::Float;

/// Metric abstraction for distance calculation.
///
/// `rdist` is a rank-preserving surrogate that the hot loops compare;
/// `rdist_to_dist` turns it into the true distance once, on the few values
/// that end up in a result.
pub trait Metric: Send + Sync + 'static {
    fn rdist<T: Float>(a: &[T], b: &[T]) -> f64;

    fn sparse_rdist(a: (&[f64], &[usize]), b: (&[f64], &[usize])) -> f64;

    fn rdist_to_dist(rdist: f64) -> f64;

    fn dist_to_rdist(dist: f64) -> f64;

    #[inline]
    fn dist<T: Float>(a: &[T], b: &[T]) -> f64 {
        Self::rdist_to_dist(Self::rdist(a, b))
    }
}

/// L2 distance; the surrogate is the squared distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanMetric;

impl Metric for EuclideanMetric {
    #[inline(always)]
    fn rdist<T: Float>(a: &[T], b: &[T]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(&x, &y)| {
                let d = x.to_f64() - y.to_f64();
                d * d
            })
            .sum()
    }

    fn sparse_rdist(a: (&[f64], &[usize]), b: (&[f64], &[usize])) -> f64 {
        sparse_zip_fold(a, b, |x, y| (x - y) * (x - y))
    }

    #[inline]
    fn rdist_to_dist(rdist: f64) -> f64 {
        rdist.max(0.0).sqrt()
    }

    #[inline]
    fn dist_to_rdist(dist: f64) -> f64 {
        dist * dist
    }
}

/// L1 distance; no surrogate, `rdist == dist`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManhattanMetric;

impl Metric for ManhattanMetric {
    #[inline(always)]
    fn rdist<T: Float>(a: &[T], b: &[T]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(&x, &y)| (x.to_f64() - y.to_f64()).abs())
            .sum()
    }

    fn sparse_rdist(a: (&[f64], &[usize]), b: (&[f64], &[usize])) -> f64 {
        sparse_zip_fold(a, b, |x, y| (x - y).abs())
    }

    #[inline]
    fn rdist_to_dist(rdist: f64) -> f64 {
        rdist
    }

    #[inline]
    fn dist_to_rdist(dist: f64) -> f64 {
        dist
    }
}
