use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use widthgen::encode::encode;
use widthgen::{
    Boundary, EncodedSample, Error, Fragment, GeneratorConfig, Measurer, RandomBoundary, Result,
    Sample, Splitter, WorkerPool, run, run_fragments,
};

/// Width of a character is its code divided by ten; a short sleep lets workers interleave.
struct CodeWidths {
    calls: AtomicUsize,
}

impl CodeWidths {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Measurer for CodeWidths {
    async fn measure(&self, codes: &[u32]) -> Result<Vec<f64>> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_micros((n % 7) as u64 * 50)).await;
        Ok(codes.iter().map(|&c| f64::from(c) / 10.0).collect())
    }
}

/// Fails on the `fail_at`-th call (zero-based) and succeeds slowly otherwise.
struct FailsAt {
    fail_at: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl Measurer for FailsAt {
    async fn measure(&self, codes: &[u32]) -> Result<Vec<f64>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.fail_at {
            return Err(Error::Measure(widthgen_cdp::Error::Closed));
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(vec![1.0; codes.len()])
    }
}

/// Returns one width too few.
struct ShortWidths;

#[async_trait]
impl Measurer for ShortWidths {
    async fn measure(&self, codes: &[u32]) -> Result<Vec<f64>> {
        Ok(vec![1.0; codes.len().saturating_sub(1)])
    }
}

struct Decisions(std::vec::IntoIter<bool>);

impl Boundary for Decisions {
    fn close_here(&mut self) -> bool {
        self.0.next().unwrap_or(false)
    }
}

fn corpus() -> Vec<u8> {
    b"Sphinx of black quartz, judge my vow.\nPack my box with five dozen liquor jugs!\n"
        .iter()
        .copied()
        .cycle()
        .take(6000)
        .collect()
}

fn fragments(seed: u64) -> Vec<Fragment> {
    let boundary = RandomBoundary::new(StdRng::seed_from_u64(seed), 10);
    Splitter::new(corpus(), boundary).collect()
}

fn line_pairs(out: &[u8]) -> Vec<EncodedSample> {
    let text = std::str::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len() % 2, 0, "output must be line pairs");
    lines
        .chunks(2)
        .map(|pair| EncodedSample {
            input: pair[0].to_string(),
            widths: pair[1].to_string(),
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_and_eight_workers_produce_the_same_samples() {
    let frags = fragments(3);
    assert!(frags.len() > 100);

    let mut single = Vec::new();
    let stats1 = run_fragments(1, CodeWidths::new(), frags.clone(), &mut single)
        .await
        .unwrap();
    let mut eight = Vec::new();
    let stats8 = run_fragments(8, CodeWidths::new(), frags.clone(), &mut eight)
        .await
        .unwrap();

    assert_eq!(stats1.fragments, frags.len());
    assert_eq!(stats1.samples, frags.len());
    assert_eq!(stats1, stats8);

    let mut a = line_pairs(&single);
    let mut b = line_pairs(&eight);
    assert_eq!(a.len(), frags.len());
    a.sort();
    b.sort();
    assert_eq!(a, b);

    let mut expected: Vec<EncodedSample> = frags
        .iter()
        .map(|f| {
            let widths = f.char_codes().iter().map(|&c| f64::from(c) / 10.0).collect();
            encode(&Sample::new(f.clone(), widths).unwrap())
        })
        .collect();
    expected.sort();
    assert_eq!(a, expected);
}

#[tokio::test]
async fn single_worker_preserves_fragment_order() {
    let frags = fragments(11);
    let mut out = Vec::new();
    run_fragments(1, CodeWidths::new(), frags.clone(), &mut out)
        .await
        .unwrap();
    let expected: Vec<String> = frags
        .iter()
        .map(|f| widthgen::encode::one_hot_line(f.as_bytes()))
        .collect();
    let got: Vec<String> = line_pairs(&out).into_iter().map(|s| s.input).collect();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn empty_source_finishes_cleanly_with_no_output() {
    let mut out = Vec::new();
    let stats = run_fragments(4, CodeWidths::new(), Vec::<Fragment>::new(), &mut out)
        .await
        .unwrap();
    assert_eq!(stats.fragments, 0);
    assert_eq!(stats.samples, 0);
    assert!(out.is_empty());

    let mut out = Vec::new();
    let cfg = GeneratorConfig {
        workers: 2,
        ..Default::default()
    };
    let stats = run(&cfg, CodeWidths::new(), b"\n\n".to_vec(), &mut out)
        .await
        .unwrap();
    assert_eq!(stats.samples, 0);
    assert!(out.is_empty());
}

#[tokio::test]
async fn ab_newline_yields_one_two_character_sample() {
    let splitter = Splitter::new(b"AB\n".to_vec(), Decisions(vec![false, true].into_iter()));
    let mut out = Vec::new();
    let stats = run_fragments(2, CodeWidths::new(), splitter, &mut out)
        .await
        .unwrap();
    assert_eq!(stats.samples, 1);
    assert_eq!(stats.characters, 2);

    let pairs = line_pairs(&out);
    assert_eq!(pairs.len(), 1);
    let tokens: Vec<&str> = pairs[0].input.split(' ').collect();
    assert_eq!(tokens.len(), 512);
    let hot: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| **t == "1")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(hot, vec![65, 256 + 66]);
    assert_eq!(pairs[0].widths, "6.50000 6.60000");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn measurement_failure_stops_the_whole_run() {
    let measurer = Arc::new(FailsAt {
        fail_at: 5,
        calls: AtomicUsize::new(0),
    });
    let frags = fragments(5);
    let total = frags.len();
    let mut out = Vec::new();
    let err = run_fragments(4, Arc::clone(&measurer), frags, &mut out)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Measure(_)), "unexpected error: {err}");

    // Cancellation stops workers well before the corpus is exhausted.
    let calls = measurer.calls.load(Ordering::SeqCst);
    assert!(calls < total, "{calls} calls for {total} fragments");
    assert!(line_pairs(&out).len() < total);
}

#[tokio::test]
async fn wrong_width_count_is_fatal() {
    let mut out = Vec::new();
    let err = run_fragments(2, Arc::new(ShortWidths), fragments(9), &mut out)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::WidthCountMismatch { .. }));
}

#[tokio::test]
async fn pool_stops_when_cancelled_externally() {
    let (frag_tx, frag_rx) = mpsc::channel::<Fragment>(1);
    let (sample_tx, mut sample_rx) = mpsc::channel(1);
    let pool = WorkerPool::new(CodeWidths::new(), 3);
    let cancel = pool.cancellation().clone();
    let handle = tokio::spawn(pool.run(frag_rx, sample_tx));

    frag_tx
        .send(Fragment::new(b"x".to_vec()).unwrap())
        .await
        .unwrap();
    let first = sample_rx.recv().await.unwrap();
    assert_eq!(first.widths, "12.00000");

    // The fragment sender stays open; only cancellation can end the pool.
    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();
    assert_eq!(stats.samples, 1);
    assert!(sample_rx.recv().await.is_none());
    drop(frag_tx);
}

#[tokio::test]
async fn seeded_runs_are_reproducible() {
    let cfg = GeneratorConfig {
        workers: 1,
        seed: Some(99),
        ..Default::default()
    };
    let mut a = Vec::new();
    let mut b = Vec::new();
    run(&cfg, CodeWidths::new(), corpus(), &mut a).await.unwrap();
    run(&cfg, CodeWidths::new(), corpus(), &mut b).await.unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[tokio::test]
async fn invalid_config_is_rejected_before_work_starts() {
    let cfg = GeneratorConfig {
        workers: 0,
        ..Default::default()
    };
    let measurer = CodeWidths::new();
    let err = run(&cfg, Arc::clone(&measurer), corpus(), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert_eq!(measurer.calls.load(Ordering::Relaxed), 0);
}
