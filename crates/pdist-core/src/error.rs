use thiserror::Error;

/// Boxed error a reducer hook may return from inside a parallel region.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected at construction time, before any worker is spawned.
    #[error("invalid configuration: {field} = {value:?} ({reason})")]
    InvalidConfiguration {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("reduction hook failed during {stage}: {source}")]
    Hook {
        stage: &'static str,
        #[source]
        source: HookError,
    },
}

impl Error {
    pub fn invalid(field: &'static str, value: impl ToString, reason: &'static str) -> Self {
        Self::InvalidConfiguration {
            field,
            value: value.to_string(),
            reason,
        }
    }

    pub fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn hook(stage: &'static str, source: HookError) -> Self {
        Self::Hook { stage, source }
    }
}
