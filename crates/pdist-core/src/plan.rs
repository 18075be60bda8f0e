//! Chunk planning: how each axis is split into chunks, which axis gets
//! parallelized, and how many workers take part.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest accepted chunk size.
pub const MIN_CHUNK_SIZE: usize = 20;

/// Chunk size used when neither the caller nor the global store set one.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Factor of the `auto` rule that keeps `ParallelOnX` when X alone can feed
/// every worker. Empirically tuned.
pub const DEFAULT_AUTO_X_THREADS_FACTOR: usize = 4;

/// Requested execution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strategy {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "parallel_on_X")]
    ParallelOnX,
    #[serde(rename = "parallel_on_Y")]
    ParallelOnY,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Auto => "auto",
            Strategy::ParallelOnX => "parallel_on_X",
            Strategy::ParallelOnY => "parallel_on_Y",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Strategy::Auto),
            "parallel_on_X" => Ok(Strategy::ParallelOnX),
            "parallel_on_Y" => Ok(Strategy::ParallelOnY),
            other => Err(Error::invalid(
                "strategy",
                other,
                "expected one of \"auto\", \"parallel_on_X\", \"parallel_on_Y\"",
            )),
        }
    }
}

/// The axis a run is parallelized over, i.e. a resolved [`Strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// Half-open interval `[start, end)` of sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRange {
    pub start: usize,
    pub end: usize,
}

impl ChunkRange {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<ChunkRange> for Range<usize> {
    fn from(r: ChunkRange) -> Self {
        r.as_range()
    }
}

/// Chunking of one axis. Every chunk but the last holds exactly
/// `chunk_size` samples; the last one holds the remainder, or a full chunk
/// when the axis divides evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisChunks {
    pub n_samples: usize,
    pub chunk_size: usize,
    pub n_chunks: usize,
    pub last_chunk_size: usize,
}

impl AxisChunks {
    pub fn new(n_samples: usize, chunk_size: usize) -> Self {
        let chunk = n_samples.min(chunk_size);
        if chunk == 0 {
            return Self {
                n_samples,
                chunk_size: 0,
                n_chunks: 0,
                last_chunk_size: 0,
            };
        }

        let n_full_chunks = n_samples / chunk;
        let remainder = n_samples % chunk;

        Self {
            n_samples,
            chunk_size: chunk,
            n_chunks: n_full_chunks + usize::from(remainder != 0),
            last_chunk_size: if remainder == 0 { chunk } else { remainder },
        }
    }

    /// Index range of chunk `idx`.
    ///
    /// Panics if `idx >= n_chunks`.
    #[inline]
    pub fn range(&self, idx: usize) -> ChunkRange {
        assert!(idx < self.n_chunks, "chunk {idx} out of {}", self.n_chunks);
        let start = idx * self.chunk_size;
        let len = if idx + 1 == self.n_chunks {
            self.last_chunk_size
        } else {
            self.chunk_size
        };
        ChunkRange::new(start, start + len)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = ChunkRange> + '_ {
        (0..self.n_chunks).map(move |idx| self.range(idx))
    }
}

/// Contiguous `static` split of `n_items` over `n_parts`: the first
/// `n_items % n_parts` parts receive one extra item.
pub fn static_partition(n_items: usize, n_parts: usize, part: usize) -> Range<usize> {
    debug_assert!(part < n_parts);
    let base = n_items / n_parts;
    let extra = n_items % n_parts;
    let start = part * base + part.min(extra);
    let len = base + usize::from(part < extra);
    start..start + len
}

/// Picks the axis for [`Strategy::Auto`]. Pure function of its inputs.
pub fn resolve_auto(
    n_samples_x: usize,
    n_samples_y: usize,
    chunk_size: usize,
    effective_n_threads: usize,
    auto_x_threads_factor: usize,
) -> Axis {
    if n_samples_y < n_samples_x {
        // Parallelizing the smaller axis would starve workers.
        return Axis::X;
    }
    let x_threshold = auto_x_threads_factor
        .saturating_mul(chunk_size)
        .saturating_mul(effective_n_threads);
    if x_threshold < n_samples_x {
        Axis::X
    } else {
        Axis::Y
    }
}

/// Inputs of [`ChunkPlan::new`] besides the sample counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanRequest {
    pub chunk_size: usize,
    pub effective_n_threads: usize,
    pub strategy: Strategy,
    pub auto_x_threads_factor: usize,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            effective_n_threads: 1,
            strategy: Strategy::Auto,
            auto_x_threads_factor: DEFAULT_AUTO_X_THREADS_FACTOR,
        }
    }
}

/// Immutable execution plan of one reduction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub x: AxisChunks,
    pub y: AxisChunks,
    pub n_threads: usize,
    pub parallel_axis: Axis,
}

impl ChunkPlan {
    pub fn new(n_samples_x: usize, n_samples_y: usize, req: &PlanRequest) -> Result<Self> {
        if req.chunk_size < MIN_CHUNK_SIZE {
            return Err(Error::invalid(
                "chunk_size",
                req.chunk_size,
                "must be at least 20",
            ));
        }
        if req.effective_n_threads == 0 {
            return Err(Error::invalid(
                "n_threads",
                req.effective_n_threads,
                "must be at least 1",
            ));
        }

        let x = AxisChunks::new(n_samples_x, req.chunk_size);
        let y = AxisChunks::new(n_samples_y, req.chunk_size);

        let parallel_axis = match req.strategy {
            Strategy::ParallelOnX => Axis::X,
            Strategy::ParallelOnY => Axis::Y,
            Strategy::Auto => resolve_auto(
                n_samples_x,
                n_samples_y,
                req.chunk_size,
                req.effective_n_threads,
                req.auto_x_threads_factor,
            ),
        };

        let parallel_chunks = match parallel_axis {
            Axis::X => x.n_chunks,
            Axis::Y => y.n_chunks,
        };
        let n_threads = parallel_chunks.min(req.effective_n_threads).max(1);

        Ok(Self {
            x,
            y,
            n_threads,
            parallel_axis,
        })
    }

    #[inline]
    pub fn execute_in_parallel_on_y(&self) -> bool {
        self.parallel_axis == Axis::Y
    }
}
