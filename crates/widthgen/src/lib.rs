#![forbid(unsafe_code)]

//! Per-character text width dataset generation.
//!
//! Pipeline: seed text is cut into fragments ([`split`]), a pool of workers measures each
//! fragment through a [`measure::Measurer`] ([`pool`]), every measurement is turned into a
//! pair of text lines ([`encode`]) and the lines are written out as they arrive
//! ([`collect`]). [`run`] wires the stages together.

pub mod collect;
pub mod config;
pub mod encode;
pub mod error;
pub mod measure;
pub mod pool;
mod run;
pub mod split;

pub use config::GeneratorConfig;
pub use encode::EncodedSample;
pub use error::{Error, Result};
pub use measure::{CanvasMeasurer, Measurer};
pub use pool::{PoolStats, WorkerPool};
pub use run::{RunStats, run, run_fragments};
pub use split::{Boundary, Fragment, RandomBoundary, Splitter};

/// A fragment together with one measured width per byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    fragment: Fragment,
    widths: Vec<f64>,
}

impl Sample {
    /// Fails with [`Error::WidthCountMismatch`] unless there is exactly one width per byte.
    pub fn new(fragment: Fragment, widths: Vec<f64>) -> Result<Self> {
        if widths.len() != fragment.len() {
            return Err(Error::WidthCountMismatch {
                expected: fragment.len(),
                actual: widths.len(),
            });
        }
        Ok(Self { fragment, widths })
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    pub fn widths(&self) -> &[f64] {
        &self.widths
    }
}
