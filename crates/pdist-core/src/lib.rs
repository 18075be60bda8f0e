#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod datasets;
pub mod error;
pub mod linalg;
pub mod matrix;
pub mod metric;
pub mod norms;
pub mod plan;

pub use config::{EngineConfig, GlobalConfig};
pub use datasets::{DatasetsPair, DenseDenseDatasetsPair, SparseSparseDatasetsPair};
pub use error::{Error, HookError, Result};
pub use matrix::{CsrMatrix, DenseMatrix, Float, MatrixRef};
pub use metric::{EuclideanMetric, ManhattanMetric, Metric};
pub use norms::sqeuclidean_row_norms;
pub use plan::{Axis, AxisChunks, ChunkPlan, ChunkRange, PlanRequest, Strategy};

#[cfg(test)]
mod tests;
