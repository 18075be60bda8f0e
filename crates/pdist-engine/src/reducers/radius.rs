//! All Y samples within a radius of every X sample.

use pdist_core::{ChunkPlan, ChunkRange, DatasetsPair, Error, HookError, Result};

use super::argkmin::{ChunkNeighbors, NeighborsResult};
use crate::hook::ReductionHook;

#[derive(Debug)]
pub struct RadiusNeighbors<'a, P: DatasetsPair + ?Sized> {
    pair: &'a P,
    rdist_radius: f64,
    sort_results: bool,
}

impl<'a, P: DatasetsPair + ?Sized> RadiusNeighbors<'a, P> {
    /// Without `sort_results` neighbours come out in increasing Y index.
    pub fn new(pair: &'a P, radius: f64, sort_results: bool) -> Result<Self> {
        if radius.is_nan() || radius < 0.0 {
            return Err(Error::invalid("radius", radius, "must be a non-negative number"));
        }
        Ok(Self {
            pair,
            rdist_radius: pair.dist_to_surrogate(radius),
            sort_results,
        })
    }

    fn finish_row(&self, row: &mut [(f64, usize)]) {
        if self.sort_results {
            row.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        }
    }
}

impl<P: DatasetsPair + ?Sized> ReductionHook for RadiusNeighbors<'_, P> {
    /// `(surrogate distance, y_index)` hits for each row of the current X chunk.
    type ThreadState = Vec<Vec<(f64, usize)>>;
    type ChunkOutput = ChunkNeighbors;
    type Output = NeighborsResult;

    fn allocate_thread_state(&self, _thread_id: usize, plan: &ChunkPlan) -> Self::ThreadState {
        vec![Vec::new(); plan.x.chunk_size]
    }

    fn parallel_on_x_init_chunk(&self, state: &mut Self::ThreadState, x: ChunkRange, _: usize) {
        for row in &mut state[..x.len()] {
            row.clear();
        }
    }

    fn compute_and_reduce_block(
        &self,
        state: &mut Self::ThreadState,
        x: ChunkRange,
        y: ChunkRange,
        _thread_id: usize,
    ) -> Result<(), HookError> {
        for (row, i) in state.iter_mut().zip(x.as_range()) {
            for j in y.as_range() {
                let d = self.pair.surrogate_dist(i, j);
                if d <= self.rdist_radius {
                    row.push((d, j));
                }
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
        let rows = state[..x.len()]
            .iter_mut()
            .map(|hits| {
                let mut row = std::mem::take(hits);
                self.finish_row(&mut row);
                row
            })
            .collect();
        ChunkNeighbors {
            x_start: x.start,
            rows,
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
        let rows = (0..x.len())
            .map(|r| {
                let mut row = Vec::with_capacity(states.iter().map(|s| s[r].len()).sum());
                // Workers hold contiguous Y ranges in thread order.
                for state in states.iter_mut() {
                    row.append(&mut state[r]);
                }
                self.finish_row(&mut row);
                row
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

        for row in chunks.into_iter().flat_map(|c| c.rows) {
            indices.push(row.iter().map(|&(_, j)| j).collect());
            if let Some(distances) = distances.as_mut() {
                distances.push(row.into_iter().map(|(d, _)| d).collect());
            }
        }
        NeighborsResult { indices, distances }
    }
}
