use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Every variant is fatal for a generation run; the phase is part of the message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read seed text {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("find page: {0}")]
    Discovery(#[source] widthgen_cdp::Error),

    #[error("connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: widthgen_cdp::Error,
    },

    #[error("setup canvas: {0}")]
    Setup(#[source] widthgen_cdp::Error),

    #[error("measure text: {0}")]
    Measure(#[source] widthgen_cdp::Error),

    #[error("measure text: expected {expected} widths, got {actual}")]
    WidthCountMismatch { expected: usize, actual: usize },

    #[error("write samples: {0}")]
    Output(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker task failed: {0}")]
    WorkerPanicked(String),
}
