//! Single consumer of the sample queue.

use crate::Result;
use crate::encode::EncodedSample;
use std::io::Write;
use tokio::sync::mpsc;
use tracing::trace;

/// Writes one sample as two newline-terminated lines: input, then widths.
pub fn write_sample<W: Write>(out: &mut W, sample: &EncodedSample) -> std::io::Result<()> {
    out.write_all(sample.input.as_bytes())?;
    out.write_all(b"\n")?;
    out.write_all(sample.widths.as_bytes())?;
    out.write_all(b"\n")
}

/// Writes samples in arrival order until every sender is gone, then flushes.
///
/// Returns how many samples were written.
///
/// `out` is written synchronously on the task that awaits this future, so it should be a
/// buffered sink such as a `BufWriter` over stdout.
pub async fn drain<W: Write>(mut samples: mpsc::Receiver<EncodedSample>, mut out: W) -> Result<usize> {
    let mut written = 0;
    while let Some(sample) = samples.recv().await {
        write_sample(&mut out, &sample)?;
        written += 1;
        trace!(written, "sample written");
    }
    out.flush()?;
    Ok(written)
}
