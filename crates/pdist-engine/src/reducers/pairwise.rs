//! Full `n_x × n_y` distance matrix.

use serde::Serialize;

use pdist_core::plan::static_partition;
use pdist_core::{ChunkPlan, ChunkRange, DatasetsPair, HookError};

use crate::hook::ReductionHook;

/// Row-major matrix of distances between every X and every Y sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceMatrix {
    pub n_rows: usize,
    pub n_cols: usize,
    pub data: Vec<f64>,
}

impl DistanceMatrix {
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n_cols + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }
}

/// Distances of the current X chunk against the Y columns a worker owns:
/// all of Y under `parallel_on_X`, its static share under `parallel_on_Y`.
#[derive(Debug)]
pub struct BlockBuffer {
    /// `x_chunk_size × width`, row-major; only the first `x.len()` rows are live.
    values: Vec<f64>,
    y_offset: usize,
    width: usize,
    /// Y chunks written since the last chunk init.
    filled: Vec<ChunkRange>,
}

impl BlockBuffer {
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    #[inline]
    fn offset(&self, row: usize, y_start: usize) -> usize {
        row * self.width + y_start - self.y_offset
    }
}

/// First Y sample and number of Y samples a worker covers.
fn owned_y_span(plan: &ChunkPlan, thread_id: usize) -> (usize, usize) {
    if !plan.execute_in_parallel_on_y() {
        return (0, plan.y.n_samples);
    }
    let owned = static_partition(plan.y.n_chunks, plan.n_threads, thread_id);
    if owned.is_empty() {
        return (0, 0);
    }
    let start = plan.y.range(owned.start).start;
    (start, plan.y.range(owned.end - 1).end - start)
}

/// Emits every surrogate distance, converted to a true distance when
/// `return_distance` is set.
#[derive(Debug)]
pub struct PairwiseDistances<'a, P: DatasetsPair + ?Sized> {
    pair: &'a P,
}

impl<'a, P: DatasetsPair + ?Sized> PairwiseDistances<'a, P> {
    pub fn new(pair: &'a P) -> Self {
        Self { pair }
    }
}

impl<P: DatasetsPair + ?Sized> ReductionHook for PairwiseDistances<'_, P> {
    type ThreadState = BlockBuffer;
    type ChunkOutput = Vec<f64>;
    type Output = DistanceMatrix;

    fn allocate_thread_state(&self, thread_id: usize, plan: &ChunkPlan) -> Self::ThreadState {
        let (y_offset, width) = owned_y_span(plan, thread_id);
        BlockBuffer {
            values: vec![0.0; plan.x.chunk_size * width],
            y_offset,
            width,
            filled: Vec::new(),
        }
    }

    fn parallel_on_x_init_chunk(&self, state: &mut Self::ThreadState, _x: ChunkRange, _: usize) {
        state.filled.clear();
    }

    fn compute_and_reduce_block(
        &self,
        state: &mut Self::ThreadState,
        x: ChunkRange,
        y: ChunkRange,
        _thread_id: usize,
    ) -> Result<(), HookError> {
        for (r, i) in x.as_range().enumerate() {
            let base = state.offset(r, y.start);
            let out = &mut state.values[base..base + y.len()];
            for (slot, j) in out.iter_mut().zip(y.as_range()) {
                *slot = self.pair.surrogate_dist(i, j);
            }
        }
        state.filled.push(y);
        Ok(())
    }

    fn parallel_on_x_finalize_chunk(
        &self,
        state: &mut Self::ThreadState,
        x: ChunkRange,
        _thread_id: usize,
    ) -> Self::ChunkOutput {
        state.values[..x.len() * state.width].to_vec()
    }

    fn parallel_on_y_init_chunk(&self, state: &mut Self::ThreadState, x: ChunkRange, _: usize) {
        self.parallel_on_x_init_chunk(state, x, 0);
    }

    fn parallel_on_y_synchronize(
        &self,
        states: &mut [Self::ThreadState],
        x: ChunkRange,
    ) -> Self::ChunkOutput {
        let n_y = self.pair.n_samples_y();
        let mut out = vec![0.0; x.len() * n_y];
        for state in states.iter() {
            for y in &state.filled {
                for r in 0..x.len() {
                    let src = state.offset(r, y.start);
                    out[r * n_y + y.start..r * n_y + y.end]
                        .copy_from_slice(&state.values[src..src + y.len()]);
                }
            }
        }
        out
    }

    fn compute_exact_distances(&self, chunks: &mut [Self::ChunkOutput]) {
        for chunk in chunks {
            for d in chunk.iter_mut() {
                *d = self.pair.surrogate_to_dist(*d);
            }
        }
    }

    fn finalize_results(
        &self,
        chunks: Vec<Self::ChunkOutput>,
        _return_distance: bool,
    ) -> Self::Output {
        DistanceMatrix {
            n_rows: self.pair.n_samples_x(),
            n_cols: self.pair.n_samples_y(),
            data: chunks.concat(),
        }
    }
}
