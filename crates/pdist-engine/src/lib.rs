#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]

//! Chunked, multi-threaded pairwise distance reductions.
//!
//! [`PairwiseReduction`] splits X and Y into chunks and drives a
//! [`ReductionHook`] over every `X chunk × Y chunk` block, either with the
//! workers spread over X (`parallel_on_X`, no synchronization) or over Y
//! (`parallel_on_Y`, one merge per X chunk).

pub mod engine;
pub mod hook;
pub mod reducers;

pub use engine::PairwiseReduction;
pub use hook::ReductionHook;
pub use reducers::{ArgKmin, DistanceMatrix, NeighborsResult, PairwiseDistances, RadiusNeighbors};

pub use pdist_core;
