//! Fixed-size measurement worker pool.

use crate::encode::{EncodedSample, encode};
use crate::measure::Measurer;
use crate::split::Fragment;
use crate::{Error, Result, Sample};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Totals reported by [`WorkerPool::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub samples: usize,
    pub characters: usize,
}

impl PoolStats {
    fn merge(&mut self, other: PoolStats) {
        self.samples += other.samples;
        self.characters += other.characters;
    }
}

/// Runs `workers` tasks that pull fragments from a shared queue, measure them and push
/// encoded samples to a shared output queue.
///
/// The first failing worker cancels the others through the pool's [`CancellationToken`];
/// its error is the one [`run`](WorkerPool::run) returns.
pub struct WorkerPool<M: ?Sized> {
    measurer: Arc<M>,
    workers: usize,
    cancel: CancellationToken,
}

impl<M: Measurer + ?Sized + 'static> WorkerPool<M> {
    /// `workers` is clamped to at least 1.
    pub fn new(measurer: Arc<M>, workers: usize) -> Self {
        Self {
            measurer,
            workers: workers.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Shares an externally owned token; cancelling it stops the pool early.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Consumes `fragments` until it is closed and drained, or until the pool is cancelled.
    ///
    /// `samples` closes once every worker has exited, which is the collector's signal to stop.
    pub async fn run(
        self,
        fragments: mpsc::Receiver<Fragment>,
        samples: mpsc::Sender<EncodedSample>,
    ) -> Result<PoolStats> {
        info!(workers = self.workers, "starting worker pool");
        let queue = Arc::new(Mutex::new(fragments));

        let mut set = JoinSet::new();
        for id in 0..self.workers {
            set.spawn(work(
                id,
                Arc::clone(&queue),
                Arc::clone(&self.measurer),
                samples.clone(),
                self.cancel.clone(),
            ));
        }
        // Workers now hold the only senders.
        drop(samples);

        let mut first_error: Option<Error> = None;
        let mut total = PoolStats::default();
        while let Some(joined) = set.join_next().await {
            let outcome = joined
                .map_err(|e| Error::WorkerPanicked(e.to_string()))
                .and_then(|r| r);
            match outcome {
                Ok(stats) => total.merge(stats),
                Err(err) if first_error.is_none() => {
                    warn!(error = %err, "worker failed, cancelling pool");
                    self.cancel.cancel();
                    first_error = Some(err);
                }
                Err(err) => debug!(error = %err, "additional worker failure"),
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                info!(
                    samples = total.samples,
                    characters = total.characters,
                    "worker pool drained"
                );
                Ok(total)
            }
        }
    }
}

async fn work<M: Measurer + ?Sized>(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Fragment>>>,
    measurer: Arc<M>,
    samples: mpsc::Sender<EncodedSample>,
    cancel: CancellationToken,
) -> Result<PoolStats> {
    let mut stats = PoolStats::default();
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = async { queue.lock().await.recv().await } => next,
        };
        let Some(fragment) = next else {
            break;
        };

        let codes = fragment.char_codes();
        let widths = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            widths = measurer.measure(&codes) => widths?,
        };
        let sample = Sample::new(fragment, widths)?;
        let characters = sample.fragment().len();

        if samples.send(encode(&sample)).await.is_err() {
            debug!(worker = id, "sample queue closed");
            break;
        }
        stats.samples += 1;
        stats.characters += characters;
    }
    debug!(worker = id, samples = stats.samples, "worker finished");
    Ok(stats)
}
