use crate::collect;
use crate::config::GeneratorConfig;
use crate::measure::Measurer;
use crate::pool::WorkerPool;
use crate::split::{Fragment, RandomBoundary, Splitter};
use crate::{Error, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub fragments: usize,
    pub samples: usize,
    pub characters: usize,
}

/// Splits `data`, measures every fragment with `measurer` and writes the encoded samples to
/// `out`.
pub async fn run<M, W>(
    config: &GeneratorConfig,
    measurer: Arc<M>,
    data: Vec<u8>,
    out: W,
) -> Result<RunStats>
where
    M: Measurer + ?Sized + 'static,
    W: Write,
{
    config.validate()?;
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    info!(
        bytes = data.len(),
        workers = config.workers,
        seed = ?config.seed,
        "starting generation"
    );
    let splitter = Splitter::new(data, RandomBoundary::new(rng, config.boundary_odds))
        .flush_tail(config.flush_tail);
    run_fragments(config.workers, measurer, splitter, out).await
}

/// Runs the pipeline over an already prepared fragment source.
///
/// The source is drained on its own task into a queue holding at most `workers` fragments.
pub async fn run_fragments<M, I, W>(
    workers: usize,
    measurer: Arc<M>,
    fragments: I,
    out: W,
) -> Result<RunStats>
where
    M: Measurer + ?Sized + 'static,
    I: IntoIterator<Item = Fragment>,
    I::IntoIter: Send + 'static,
    W: Write,
{
    let workers = workers.max(1);
    let cancel = CancellationToken::new();
    let (fragment_tx, fragment_rx) = mpsc::channel(workers);
    let (sample_tx, sample_rx) = mpsc::channel(workers);

    let producer = tokio::spawn(produce(
        fragments.into_iter(),
        fragment_tx,
        cancel.clone(),
    ));

    let pool = WorkerPool::new(measurer, workers).with_cancellation(cancel.clone());
    let collector = async {
        let written = collect::drain(sample_rx, out).await;
        if written.is_err() {
            cancel.cancel();
        }
        written
    };
    let (pooled, written) = tokio::join!(pool.run(fragment_rx, sample_tx), collector);

    let fragments = producer
        .await
        .map_err(|e| Error::WorkerPanicked(e.to_string()))?;
    let pooled = pooled?;
    let samples = written?;

    let stats = RunStats {
        fragments,
        samples,
        characters: pooled.characters,
    };
    info!(
        fragments = stats.fragments,
        samples = stats.samples,
        characters = stats.characters,
        "generation finished"
    );
    Ok(stats)
}

async fn produce<I: Iterator<Item = Fragment>>(
    fragments: I,
    queue: mpsc::Sender<Fragment>,
    cancel: CancellationToken,
) -> usize {
    let mut sent = 0;
    for fragment in fragments {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            queued = queue.send(fragment) => {
                if queued.is_err() {
                    break;
                }
            }
        }
        sent += 1;
    }
    sent
}
