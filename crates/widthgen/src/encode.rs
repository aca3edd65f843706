//! Text encoding of samples: a one-hot input line and a widths line.

use crate::Sample;
use std::fmt::Write as _;

/// Size of the one-hot alphabet (one slot per byte value).
pub const ALPHABET: usize = 0x100;

/// Digits after the decimal point in the widths line.
pub const WIDTH_DECIMALS: usize = 5;

/// The two output lines for one sample, without trailing newlines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodedSample {
    pub input: String,
    pub widths: String,
}

pub fn encode(sample: &Sample) -> EncodedSample {
    EncodedSample {
        input: one_hot_line(sample.fragment().as_bytes()),
        widths: widths_line(sample.widths()),
    }
}

/// `ALPHABET` space-separated `0`/`1` tokens per byte, with the `1` at the byte's value.
pub fn one_hot_line(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * ALPHABET * 2);
    for &b in bytes {
        for i in 0..ALPHABET {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push(if i == usize::from(b) { '1' } else { '0' });
        }
    }
    out
}

pub fn widths_line(widths: &[f64]) -> String {
    let mut out = String::with_capacity(widths.len() * 10);
    for (i, w) in widths.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{w:.prec$}", prec = WIDTH_DECIMALS);
    }
    out
}
