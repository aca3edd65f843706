//! Random fragmentation of seed text.

use rand::Rng;
use std::iter::FusedIterator;

/// A non-empty run of seed-text bytes with newlines removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fragment(Vec<u8>);

impl Fragment {
    /// Returns `None` for an empty buffer.
    pub fn new(bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() {
            None
        } else {
            Some(Self(bytes))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The bytes as character codes, one per byte (the seed text is treated as Latin-1).
    pub fn char_codes(&self) -> Vec<u32> {
        self.0.iter().map(|&b| u32::from(b)).collect()
    }
}

/// Decides whether a fragment ends after the byte just appended.
pub trait Boundary {
    fn close_here(&mut self) -> bool;
}

/// Closes a fragment with probability `1 / odds` per byte, so fragment lengths follow a
/// geometric distribution with mean `odds`.
#[derive(Debug, Clone)]
pub struct RandomBoundary<R> {
    rng: R,
    odds: u32,
}

impl<R: Rng> RandomBoundary<R> {
    /// `odds` is clamped to at least 1 (which closes after every byte).
    pub fn new(rng: R, odds: u32) -> Self {
        Self {
            rng,
            odds: odds.max(1),
        }
    }
}

impl<R: Rng> Boundary for RandomBoundary<R> {
    fn close_here(&mut self) -> bool {
        self.rng.gen_ratio(1, self.odds)
    }
}

/// Lazily cuts a byte buffer into [`Fragment`]s.
///
/// `\n` bytes are skipped and never count toward a fragment. A boundary is considered after
/// every other byte. Whatever is still buffered when the input runs out is dropped unless
/// [`flush_tail`](Splitter::flush_tail) is set.
#[derive(Debug)]
pub struct Splitter<D, B> {
    data: D,
    pos: usize,
    buf: Vec<u8>,
    boundary: B,
    flush_tail: bool,
}

impl<D: AsRef<[u8]>, B: Boundary> Splitter<D, B> {
    pub fn new(data: D, boundary: B) -> Self {
        Self {
            data,
            pos: 0,
            buf: Vec::new(),
            boundary,
            flush_tail: false,
        }
    }

    /// Emit the trailing remainder as a last fragment instead of dropping it.
    pub fn flush_tail(mut self, flush: bool) -> Self {
        self.flush_tail = flush;
        self
    }
}

impl<D: AsRef<[u8]>, B: Boundary> Iterator for Splitter<D, B> {
    type Item = Fragment;

    fn next(&mut self) -> Option<Fragment> {
        let data = self.data.as_ref();
        while let Some(&b) = data.get(self.pos) {
            self.pos += 1;
            if b == b'\n' {
                continue;
            }
            self.buf.push(b);
            if self.boundary.close_here() {
                return Fragment::new(std::mem::take(&mut self.buf));
            }
        }

        let tail = std::mem::take(&mut self.buf);
        if self.flush_tail {
            Fragment::new(tail)
        } else {
            None
        }
    }
}

impl<D: AsRef<[u8]>, B: Boundary> FusedIterator for Splitter<D, B> {}
