//! k nearest Y samples of every X sample.

use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use serde::Serialize;

use pdist_core::{ChunkPlan, ChunkRange, DatasetsPair, Error, HookError, Result};

use crate::hook::ReductionHook;

/// Max-heap entry; the worst kept neighbour sits on top. Ties on the
/// distance are broken by the Y index so results do not depend on the order
/// candidates arrive in.
type Candidate = (OrderedFloat<f64>, usize);

#[inline]
fn push_bounded(heap: &mut BinaryHeap<Candidate>, k: usize, cand: Candidate) {
    if heap.len() < k {
        heap.push(cand);
    } else if let Some(mut worst) = heap.peek_mut() {
        if cand < *worst {
            *worst = cand;
        }
    }
}

/// Neighbours of every X sample, sorted by increasing distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborsResult {
    pub indices: Vec<Vec<usize>>,
    /// Present only when distances were requested.
    pub distances: Option<Vec<Vec<f64>>>,
}

/// Sorted `(distance, y_index)` lists for the rows of one X chunk.
#[derive(Debug)]
pub struct ChunkNeighbors {
    pub x_start: usize,
    pub rows: Vec<Vec<(f64, usize)>>,
}

#[derive(Debug)]
pub struct ArgKmin<'a, P: DatasetsPair + ?Sized> {
    pair: &'a P,
    k: usize,
}

impl<'a, P: DatasetsPair + ?Sized> ArgKmin<'a, P> {
    pub fn new(pair: &'a P, k: usize) -> Result<Self> {
        if k == 0 {
            return Err(Error::invalid("k", k, "must be at least 1"));
        }
        Ok(Self { pair, k })
    }

    fn drain_sorted(heap: &mut BinaryHeap<Candidate>) -> Vec<(f64, usize)> {
        let mut row: Vec<Candidate> = heap.drain().collect();
        row.sort_unstable();
        row.into_iter().map(|(d, j)| (d.into_inner(), j)).collect()
    }
}

impl<P: DatasetsPair + ?Sized> ReductionHook for ArgKmin<'_, P> {
    /// One bounded heap per row of the current X chunk.
    type ThreadState = Vec<BinaryHeap<Candidate>>;
    type ChunkOutput = ChunkNeighbors;
    type Output = NeighborsResult;

    fn allocate_thread_state(&self, _thread_id: usize, plan: &ChunkPlan) -> Self::ThreadState {
        (0..plan.x.chunk_size)
            .map(|_| BinaryHeap::with_capacity(self.k))
            .collect()
    }

    fn parallel_on_x_init_chunk(&self, state: &mut Self::ThreadState, x: ChunkRange, _: usize) {
        for heap in &mut state[..x.len()] {
            heap.clear();
        }
    }

    fn compute_and_reduce_block(
        &self,
        state: &mut Self::ThreadState,
        x: ChunkRange,
        y: ChunkRange,
        _thread_id: usize,
    ) -> Result<(), HookError> {
        for (heap, i) in state.iter_mut().zip(x.as_range()) {
            for j in y.as_range() {
                let d = self.pair.surrogate_dist(i, j);
                push_bounded(heap, self.k, (OrderedFloat(d), j));
            }
        }
        Ok(())
    }

    fn parallel_on_x_finalize_chunk(
        &self,
        state: &mut Self::ThreadState,
        x: ChunkRange,
        _thread_id: usize,
    ) -> Self::ChunkOutput {
        ChunkNeighbors {
            x_start: x.start,
            rows: state[..x.len()].iter_mut().map(Self::drain_sorted).collect(),
        }
    }

    fn parallel_on_y_init_chunk(&self, state: &mut Self::ThreadState, x: ChunkRange, _: usize) {
        self.parallel_on_x_init_chunk(state, x, 0);
    }

    fn parallel_on_y_synchronize(
        &self,
        states: &mut [Self::ThreadState],
        x: ChunkRange,
    ) -> Self::ChunkOutput {
        let mut merged = BinaryHeap::with_capacity(self.k);
        let rows = (0..x.len())
            .map(|r| {
                merged.clear();
                for state in states.iter_mut() {
                    for cand in state[r].drain() {
                        push_bounded(&mut merged, self.k, cand);
                    }
                }
                Self::drain_sorted(&mut merged)
            })
            .collect();
        ChunkNeighbors {
            x_start: x.start,
            rows,
        }
    }

    fn compute_exact_distances(&self, chunks: &mut [Self::ChunkOutput]) {
        for chunk in chunks {
            for row in &mut chunk.rows {
                for (d, _) in row.iter_mut() {
                    *d = self.pair.surrogate_to_dist(*d);
                }
            }
        }
    }

    fn finalize_results(
        &self,
        chunks: Vec<Self::ChunkOutput>,
        return_distance: bool,
    ) -> Self::Output {
        let n = self.pair.n_samples_x();
        let mut indices = Vec::with_capacity(n);
        let mut distances = return_distance.then(|| Vec::with_capacity(n));

        for chunk in chunks {
            debug_assert_eq!(chunk.x_start, indices.len());
            for row in chunk.rows {
                indices.push(row.iter().map(|&(_, j)| j).collect());
                if let Some(distances) = distances.as_mut() {
                    distances.push(row.iter().map(|&(d, _)| d).collect());
                }
            }
        }
        NeighborsResult { indices, distances }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_bounded_keeps_smallest_with_index_ties() {
        let mut heap = BinaryHeap::new();
        for (d, j) in [(3.0, 0), (1.0, 5), (1.0, 2), (0.5, 9), (1.0, 1)] {
            push_bounded(&mut heap, 3, (OrderedFloat(d), j));
        }
        let mut kept: Vec<_> = heap.into_vec();
        kept.sort_unstable();
        assert_eq!(
            kept,
            vec![
                (OrderedFloat(0.5), 9),
                (OrderedFloat(1.0), 1),
                (OrderedFloat(1.0), 2)
            ]
        );
    }
}
