use pdist_core::{ChunkPlan, ChunkRange, HookError};

/// Callbacks a reducer plugs into [`crate::PairwiseReduction`].
///
/// The engine owns all iteration and threading. A reducer keeps its
/// per-worker accumulators in `ThreadState`, which is only ever handed out
/// as `&mut` to the single worker that owns it, and produces one
/// `ChunkOutput` per chunk of X. Chunk outputs are collected in X order and
/// passed to [`finalize_results`](ReductionHook::finalize_results).
///
/// Call order for `parallel_on_X`, per worker:
/// `allocate_thread_state`, then for each assigned X chunk
/// `parallel_on_x_init_chunk`, `pre_compute_block` and
/// `compute_and_reduce_block` for every Y chunk in order,
/// `parallel_on_x_finalize_chunk`; finally `release_thread_state`.
///
/// Call order for `parallel_on_Y`: `parallel_on_y_init`, one
/// `allocate_thread_state` per worker, then for each X chunk in order a
/// parallel region running `parallel_on_y_init_chunk`, `pre_compute_block`
/// and `compute_and_reduce_block` over each worker's Y chunks, followed by
/// the single-threaded `parallel_on_y_synchronize`; finally
/// `parallel_on_y_finalize` and `release_thread_state` for every worker.
pub trait ReductionHook: Sync {
    type ThreadState: Send;
    type ChunkOutput: Send;
    type Output;

    fn allocate_thread_state(&self, thread_id: usize, plan: &ChunkPlan) -> Self::ThreadState;

    fn release_thread_state(&self, _thread_id: usize, _state: Self::ThreadState) {}

    fn parallel_on_x_init_chunk(
        &self,
        _state: &mut Self::ThreadState,
        _x: ChunkRange,
        _thread_id: usize,
    ) {
    }

    fn pre_compute_block(
        &self,
        _state: &mut Self::ThreadState,
        _x: ChunkRange,
        _y: ChunkRange,
        _thread_id: usize,
    ) {
    }

    /// Computes the distances of the `x × y` block and folds them into
    /// `state`. Called concurrently from different workers, each with its
    /// own state.
    fn compute_and_reduce_block(
        &self,
        state: &mut Self::ThreadState,
        x: ChunkRange,
        y: ChunkRange,
        thread_id: usize,
    ) -> Result<(), HookError>;

    fn parallel_on_x_finalize_chunk(
        &self,
        state: &mut Self::ThreadState,
        x: ChunkRange,
        thread_id: usize,
    ) -> Self::ChunkOutput;

    fn parallel_on_y_init(&self, _plan: &ChunkPlan) {}

    fn parallel_on_y_init_chunk(
        &self,
        _state: &mut Self::ThreadState,
        _x: ChunkRange,
        _thread_id: usize,
    ) {
    }

    /// Merges every worker's partial result for chunk `x`. `states` is
    /// indexed by thread id; merge in that order for reproducible output.
    fn parallel_on_y_synchronize(
        &self,
        states: &mut [Self::ThreadState],
        x: ChunkRange,
    ) -> Self::ChunkOutput;

    fn parallel_on_y_finalize(&self, _plan: &ChunkPlan) {}

    /// Turns surrogate distances into true ones. Only called when the
    /// caller asked for distances.
    fn compute_exact_distances(&self, _chunks: &mut [Self::ChunkOutput]) {}

    fn finalize_results(&self, chunks: Vec<Self::ChunkOutput>, return_distance: bool)
        -> Self::Output;
}
