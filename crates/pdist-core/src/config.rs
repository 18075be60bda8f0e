use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::plan::{
    PlanRequest, Strategy, DEFAULT_AUTO_X_THREADS_FACTOR, DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE,
};

pub const ENV_CHUNK_SIZE: &str = "PDIST_CHUNK_SIZE";
pub const ENV_STRATEGY: &str = "PDIST_STRATEGY";
pub const ENV_N_THREADS: &str = "PDIST_N_THREADS";

/// Process-wide defaults for reduction runs.
/// Thread-safe via atomics, can be changed on-the-fly; runs only ever see a
/// snapshot taken when they are configured.
#[derive(Debug)]
pub struct GlobalConfig {
    /// Default number of samples per chunk
    pub chunk_size: AtomicUsize,

    /// Default strategy, encoded by `strategy_to_u8`
    pub strategy: AtomicU8,
}

impl GlobalConfig {
    pub fn new() -> Self {
        Self {
            chunk_size: AtomicUsize::new(DEFAULT_CHUNK_SIZE),
            strategy: AtomicU8::new(strategy_to_u8(Strategy::Auto)),
        }
    }

    pub fn get_chunk_size(&self) -> usize {
        self.chunk_size.load(Ordering::Relaxed)
    }

    pub fn set_chunk_size(&self, val: usize) -> Result<()> {
        if val < MIN_CHUNK_SIZE {
            return Err(Error::invalid("chunk_size", val, "must be at least 20"));
        }
        self.chunk_size.store(val, Ordering::Relaxed);
        Ok(())
    }

    pub fn get_strategy(&self) -> Strategy {
        strategy_from_u8(self.strategy.load(Ordering::Relaxed))
    }

    pub fn set_strategy(&self, val: Strategy) {
        self.strategy.store(strategy_to_u8(val), Ordering::Relaxed);
    }

    /// Engine configuration seeded from the current defaults.
    pub fn snapshot(&self) -> EngineConfig {
        EngineConfig {
            chunk_size: self.get_chunk_size(),
            strategy: self.get_strategy(),
            ..EngineConfig::default()
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn strategy_to_u8(s: Strategy) -> u8 {
    match s {
        Strategy::Auto => 0,
        Strategy::ParallelOnX => 1,
        Strategy::ParallelOnY => 2,
    }
}

fn strategy_from_u8(v: u8) -> Strategy {
    match v {
        1 => Strategy::ParallelOnX,
        2 => Strategy::ParallelOnY,
        _ => Strategy::Auto,
    }
}

/// The shared process-wide store.
pub fn global() -> &'static GlobalConfig {
    static GLOBAL: OnceLock<GlobalConfig> = OnceLock::new();
    GLOBAL.get_or_init(GlobalConfig::new)
}

/// Hardware parallelism, 1 when it cannot be queried.
pub fn available_threads() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZero::get)
}

/// Immutable configuration of one reduction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub chunk_size: usize,
    pub strategy: Strategy,
    /// `None` uses every available core.
    pub n_threads: Option<usize>,
    pub auto_x_threads_factor: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            strategy: Strategy::Auto,
            n_threads: None,
            auto_x_threads_factor: DEFAULT_AUTO_X_THREADS_FACTOR,
        }
    }
}

impl EngineConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_n_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = Some(n_threads);
        self
    }

    /// Global defaults overlaid with `PDIST_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = global().snapshot();

        if let Some(raw) = lookup(ENV_CHUNK_SIZE) {
            config.chunk_size = match raw.trim().parse() {
                Ok(n) if n >= MIN_CHUNK_SIZE => n,
                Ok(_) => return Err(Error::invalid(ENV_CHUNK_SIZE, &raw, "must be at least 20")),
                Err(_) => return Err(Error::invalid(ENV_CHUNK_SIZE, &raw, "not an integer")),
            };
        }
        if let Some(raw) = lookup(ENV_STRATEGY) {
            config.strategy = raw.trim().parse().map_err(|_| {
                Error::invalid(
                    ENV_STRATEGY,
                    &raw,
                    "expected one of \"auto\", \"parallel_on_X\", \"parallel_on_Y\"",
                )
            })?;
        }
        if let Some(raw) = lookup(ENV_N_THREADS) {
            let n: usize = raw
                .trim()
                .parse()
                .map_err(|_| Error::invalid(ENV_N_THREADS, &raw, "not an integer"))?;
            // 0 = all cores
            config.n_threads = (n != 0).then_some(n);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(Error::invalid(
                "chunk_size",
                self.chunk_size,
                "must be at least 20",
            ));
        }
        if self.n_threads == Some(0) {
            return Err(Error::invalid("n_threads", 0, "must be at least 1"));
        }
        if self.auto_x_threads_factor == 0 {
            return Err(Error::invalid(
                "auto_x_threads_factor",
                0,
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Requested thread count clamped to the hardware.
    pub fn effective_n_threads(&self) -> usize {
        let available = available_threads();
        match self.n_threads {
            None => available,
            Some(n) if n > available => {
                warn!(
                    requested = n,
                    available, "clamping thread count to hardware parallelism"
                );
                available
            }
            Some(n) => n,
        }
    }

    pub fn plan_request(&self) -> Result<PlanRequest> {
        self.validate()?;
        Ok(PlanRequest {
            chunk_size: self.chunk_size,
            effective_n_threads: self.effective_n_threads(),
            strategy: self.strategy,
            auto_x_threads_factor: self.auto_x_threads_factor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_CHUNK_SIZE, "64"),
            (ENV_STRATEGY, "parallel_on_Y"),
            (ENV_N_THREADS, "2"),
        ]))
        .unwrap();
        assert_eq!(config.chunk_size, 64);
        assert_eq!(config.strategy, Strategy::ParallelOnY);
        assert_eq!(config.n_threads, Some(2));
    }

    #[test]
    fn test_env_zero_threads_means_all_cores() {
        let config = EngineConfig::from_lookup(lookup(&[(ENV_N_THREADS, "0")])).unwrap();
        assert_eq!(config.n_threads, None);
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_CHUNK_SIZE, "abc")])).unwrap_err();
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("PDIST_CHUNK_SIZE"));

        let err = EngineConfig::from_lookup(lookup(&[(ENV_CHUNK_SIZE, "10")])).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfiguration { field: ENV_CHUNK_SIZE, .. }
        ));

        let err = EngineConfig::from_lookup(lookup(&[(ENV_STRATEGY, "fastest")])).unwrap_err();
        assert!(err.to_string().contains("fastest"));
        assert!(matches!(
            err,
            Error::InvalidConfiguration { field: ENV_STRATEGY, .. }
        ));

        let err = EngineConfig::from_lookup(lookup(&[(ENV_N_THREADS, "-1")])).unwrap_err();
        assert!(err.to_string().contains("PDIST_N_THREADS"));
    }

    #[test]
    fn test_global_store_roundtrip() {
        let store = GlobalConfig::new();
        assert_eq!(store.get_chunk_size(), DEFAULT_CHUNK_SIZE);
        assert_eq!(store.get_strategy(), Strategy::Auto);

        store.set_chunk_size(512).unwrap();
        store.set_strategy(Strategy::ParallelOnX);
        assert!(store.set_chunk_size(4).is_err());

        let snap = store.snapshot();
        assert_eq!(snap.chunk_size, 512);
        assert_eq!(snap.strategy, Strategy::ParallelOnX);
        assert_eq!(snap.n_threads, None);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"strategy": "parallel_on_X", "n_threads": 3}"#).unwrap();
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.strategy, Strategy::ParallelOnX);
        assert_eq!(config.n_threads, Some(3));
        assert_eq!(config.auto_x_threads_factor, DEFAULT_AUTO_X_THREADS_FACTOR);
    }

    #[test]
    fn test_effective_threads_never_exceed_hardware() {
        let config = EngineConfig::default().with_n_threads(usize::MAX);
        assert_eq!(config.effective_n_threads(), available_threads());
        assert!(EngineConfig::default().with_n_threads(0).validate().is_err());
    }
}
