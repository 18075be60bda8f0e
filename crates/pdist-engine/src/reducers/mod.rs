//! Reference reducers built on [`crate::ReductionHook`].

pub mod argkmin;
pub mod pairwise;
pub mod radius;

pub use argkmin::{ArgKmin, ChunkNeighbors, NeighborsResult};
pub use pairwise::{DistanceMatrix, PairwiseDistances};
pub use radius::RadiusNeighbors;
