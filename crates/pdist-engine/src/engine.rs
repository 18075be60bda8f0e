use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace};

use pdist_core::plan::static_partition;
use pdist_core::{
    ChunkPlan, ChunkRange, DatasetsPair, EngineConfig, Error, PlanRequest, Result,
};

use crate::hook::ReductionHook;

const COMPUTE_STAGE: &str = "compute_and_reduce_block";

/// Chunked execution of one pairwise reduction.
///
/// Construction resolves the [`ChunkPlan`] and fails fast on bad
/// configuration; no worker exists until a run starts.
#[derive(Debug, Clone)]
pub struct PairwiseReduction {
    plan: ChunkPlan,
}

impl PairwiseReduction {
    pub fn new<P: DatasetsPair + ?Sized>(datasets_pair: &P, config: &EngineConfig) -> Result<Self> {
        let req = config.plan_request()?;
        debug!(n_features = datasets_pair.n_features(), "building pairwise reduction");
        Self::with_plan_request(datasets_pair.n_samples_x(), datasets_pair.n_samples_y(), &req)
    }

    pub fn with_plan_request(
        n_samples_x: usize,
        n_samples_y: usize,
        req: &PlanRequest,
    ) -> Result<Self> {
        let plan = ChunkPlan::new(n_samples_x, n_samples_y, req)?;
        debug!(
            n_samples_x,
            n_samples_y,
            x_chunk = plan.x.chunk_size,
            x_n_chunks = plan.x.n_chunks,
            y_chunk = plan.y.chunk_size,
            y_n_chunks = plan.y.n_chunks,
            n_threads = plan.n_threads,
            parallel_on_y = plan.execute_in_parallel_on_y(),
            requested = %req.strategy,
            "resolved chunk plan"
        );
        Ok(Self { plan })
    }

    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    pub fn n_samples_x(&self) -> usize {
        self.plan.x.n_samples
    }

    pub fn n_samples_y(&self) -> usize {
        self.plan.y.n_samples
    }

    pub fn x_n_chunks(&self) -> usize {
        self.plan.x.n_chunks
    }

    pub fn y_n_chunks(&self) -> usize {
        self.plan.y.n_chunks
    }

    pub fn x_n_samples_chunk(&self) -> usize {
        self.plan.x.chunk_size
    }

    pub fn y_n_samples_chunk(&self) -> usize {
        self.plan.y.chunk_size
    }

    pub fn x_n_samples_last_chunk(&self) -> usize {
        self.plan.x.last_chunk_size
    }

    pub fn y_n_samples_last_chunk(&self) -> usize {
        self.plan.y.last_chunk_size
    }

    pub fn chunks_n_threads(&self) -> usize {
        self.plan.n_threads
    }

    pub fn execute_in_parallel_on_y(&self) -> bool {
        self.plan.execute_in_parallel_on_y()
    }

    pub fn chunks_x(&self) -> impl ExactSizeIterator<Item = ChunkRange> + '_ {
        self.plan.x.iter()
    }

    pub fn chunks_y(&self) -> impl ExactSizeIterator<Item = ChunkRange> + '_ {
        self.plan.y.iter()
    }

    /// Runs the planned strategy and finalizes the reducer's result.
    pub fn execute<H: ReductionHook>(&self, hook: &H, return_distance: bool) -> Result<H::Output> {
        let mut chunks = if self.execute_in_parallel_on_y() {
            self.run_parallel_on_y(hook)?
        } else {
            self.run_parallel_on_x(hook)?
        };
        if return_distance {
            hook.compute_exact_distances(&mut chunks);
        }
        Ok(hook.finalize_results(chunks, return_distance))
    }

    fn worker_pool(&self) -> Result<ThreadPool> {
        Ok(ThreadPoolBuilder::new()
            .num_threads(self.plan.n_threads)
            .thread_name(|i| format!("pdist-worker-{i}"))
            .build()?)
    }

    /// Each worker owns a static share of the X chunks and sweeps all of Y
    /// for each of them. Returns one output per X chunk, in order.
    pub fn run_parallel_on_x<H: ReductionHook>(&self, hook: &H) -> Result<Vec<H::ChunkOutput>> {
        let plan = &self.plan;
        let n_threads = plan.n_threads;
        debug!(n_threads, x_n_chunks = plan.x.n_chunks, "run parallel_on_X");
        if plan.x.n_chunks == 0 {
            return Ok(Vec::new());
        }

        let pool = self.worker_pool()?;
        let per_thread: Vec<Result<Vec<H::ChunkOutput>>> = pool.install(|| {
            (0..n_threads)
                .into_par_iter()
                .with_max_len(1)
                .map(|thread_id| {
                    let state = hook.allocate_thread_state(thread_id, plan);
                    let mut owned = OwnedStates::new(hook, thread_id, vec![state]);
                    let outputs = sweep_x_chunks(hook, plan, &mut owned.states[0], thread_id);
                    drop(owned);
                    outputs
                })
                .collect()
        });

        // Every worker has joined; report the lowest thread id's failure.
        let mut chunks = Vec::with_capacity(plan.x.n_chunks);
        for outputs in per_thread {
            chunks.extend(outputs?);
        }
        Ok(chunks)
    }

    /// X chunks are processed one after another; for each of them the
    /// workers split the Y chunks, then the partial results are merged on
    /// the calling thread before moving on.
    pub fn run_parallel_on_y<H: ReductionHook>(&self, hook: &H) -> Result<Vec<H::ChunkOutput>> {
        let plan = &self.plan;
        debug!(
            n_threads = plan.n_threads,
            y_n_chunks = plan.y.n_chunks,
            "run parallel_on_Y"
        );

        let pool = self.worker_pool()?;
        hook.parallel_on_y_init(plan);
        let states = (0..plan.n_threads)
            .map(|thread_id| hook.allocate_thread_state(thread_id, plan))
            .collect();
        let mut owned = OwnedStates::new(hook, 0, states);
        owned.finalize_on_y = Some(plan);

        let result = sweep_y_regions(hook, plan, &pool, &mut owned.states);
        drop(owned);
        result
    }
}

/// Thread states that go back to the hook when dropped, so teardown also
/// runs when a hook panics mid-region.
struct OwnedStates<'a, H: ReductionHook> {
    hook: &'a H,
    first_thread_id: usize,
    states: Vec<H::ThreadState>,
    finalize_on_y: Option<&'a ChunkPlan>,
}

impl<'a, H: ReductionHook> OwnedStates<'a, H> {
    fn new(hook: &'a H, first_thread_id: usize, states: Vec<H::ThreadState>) -> Self {
        Self {
            hook,
            first_thread_id,
            states,
            finalize_on_y: None,
        }
    }
}

impl<H: ReductionHook> Drop for OwnedStates<'_, H> {
    fn drop(&mut self) {
        if let Some(plan) = self.finalize_on_y {
            self.hook.parallel_on_y_finalize(plan);
        }
        for (offset, state) in self.states.drain(..).enumerate() {
            self.hook.release_thread_state(self.first_thread_id + offset, state);
        }
    }
}

fn sweep_x_chunks<H: ReductionHook>(
    hook: &H,
    plan: &ChunkPlan,
    state: &mut H::ThreadState,
    thread_id: usize,
) -> Result<Vec<H::ChunkOutput>> {
    let assigned = static_partition(plan.x.n_chunks, plan.n_threads, thread_id);
    let mut outputs = Vec::with_capacity(assigned.len());

    for x_idx in assigned {
        let x = plan.x.range(x_idx);
        hook.parallel_on_x_init_chunk(state, x, thread_id);
        for y in plan.y.iter() {
            hook.pre_compute_block(state, x, y, thread_id);
            hook.compute_and_reduce_block(state, x, y, thread_id)
                .map_err(|e| Error::hook(COMPUTE_STAGE, e))?;
        }
        outputs.push(hook.parallel_on_x_finalize_chunk(state, x, thread_id));
    }
    Ok(outputs)
}

fn sweep_y_regions<H: ReductionHook>(
    hook: &H,
    plan: &ChunkPlan,
    pool: &ThreadPool,
    states: &mut [H::ThreadState],
) -> Result<Vec<H::ChunkOutput>> {
    let n_threads = plan.n_threads;
    let mut chunks = Vec::with_capacity(plan.x.n_chunks);

    for x in plan.x.iter() {
        trace!(x_start = x.start, x_end = x.end, "parallel_on_Y region");
        let per_thread: Vec<Result<()>> = pool.install(|| {
            states
                .par_iter_mut()
                .enumerate()
                .with_max_len(1)
                .map(|(thread_id, state)| {
                    hook.parallel_on_y_init_chunk(state, x, thread_id);
                    for y_idx in static_partition(plan.y.n_chunks, n_threads, thread_id) {
                        let y = plan.y.range(y_idx);
                        hook.pre_compute_block(state, x, y, thread_id);
                        hook.compute_and_reduce_block(state, x, y, thread_id)
                            .map_err(|e| Error::hook(COMPUTE_STAGE, e))?;
                    }
                    Ok(())
                })
                .collect()
        });
        per_thread.into_iter().collect::<Result<()>>()?;

        chunks.push(hook.parallel_on_y_synchronize(states, x));
    }
    Ok(chunks)
}
