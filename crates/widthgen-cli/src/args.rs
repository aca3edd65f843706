use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use widthgen::GeneratorConfig;
use widthgen::config::{DEFAULT_BOUNDARY_ODDS, default_workers};
use widthgen::measure::DEFAULT_FONT;

/// Measure seed text in a running Chrome and print per-character width samples.
///
/// Chrome must already be running with `--remote-debugging-port` and have at least one page
/// open. Each sample is printed as two lines on stdout: the one-hot encoded characters and
/// their measured widths.
#[derive(Parser, Debug)]
#[command(name = "widthgen", version, about, long_about = None)]
pub struct Cli {
    /// Chrome DevTools host
    #[arg(long, default_value = "localhost:9222")]
    pub chrome: String,

    /// Text to seed data
    #[arg(long, default_value = "val_seed.txt")]
    pub data: PathBuf,

    /// Concurrent measurement workers
    #[arg(long, default_value_t = default_workers(), value_parser = parse_positive_usize)]
    pub workers: usize,

    /// Canvas font used for measuring
    #[arg(long, default_value = DEFAULT_FONT)]
    pub font: String,

    /// Seed for fragment boundaries (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Emit the text left over at end of input as a final sample
    #[arg(long)]
    pub flush_tail: bool,

    /// A fragment ends after each character with probability 1/N
    #[arg(long, default_value_t = DEFAULT_BOUNDARY_ODDS, value_parser = clap::value_parser!(u32).range(1..))]
    pub boundary_odds: u32,

    /// Log level (logs go to stderr; RUST_LOG overrides)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,
}

impl Cli {
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            workers: self.workers,
            font: self.font.clone(),
            seed: self.seed,
            flush_tail: self.flush_tail,
            boundary_odds: self.boundary_odds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value < 1 {
        return Err(format!("{value} is not in 1.."));
    }
    Ok(value)
}
