use crate::measure::DEFAULT_FONT;
use crate::{Error, Result};

pub const DEFAULT_BOUNDARY_ODDS: u32 = 10;

/// Knobs for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Concurrent measurement workers; also the capacity of both queues.
    pub workers: usize,
    /// CSS font shorthand applied to the canvas context.
    pub font: String,
    /// Seeds fragment boundaries; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Emit the bytes left over at end of input as a final fragment.
    pub flush_tail: bool,
    /// A fragment closes after each byte with probability `1 / boundary_odds`.
    pub boundary_odds: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            font: DEFAULT_FONT.to_string(),
            seed: None,
            flush_tail: false,
            boundary_odds: DEFAULT_BOUNDARY_ODDS,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidConfig("workers must be at least 1".to_string()));
        }
        if self.boundary_odds == 0 {
            return Err(Error::InvalidConfig(
                "boundary odds must be at least 1".to_string(),
            ));
        }
        if self.font.trim().is_empty() {
            return Err(Error::InvalidConfig("font must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Available parallelism, falling back to 1 when it cannot be queried.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
