mod args;
mod logging;

use args::Cli;
use clap::Parser;
use std::io::BufWriter;
use std::sync::Arc;
use tracing::{error, info};
use widthgen::{CanvasMeasurer, Error, RunStats};

async fn run(cli: Cli) -> Result<RunStats, Error> {
    let config = cli.generator_config();
    config.validate()?;

    let data = tokio::fs::read(&cli.data)
        .await
        .map_err(|source| Error::ReadInput {
            path: cli.data.clone(),
            source,
        })?;
    info!(path = %cli.data.display(), bytes = data.len(), "seed text loaded");

    let measurer = Arc::new(CanvasMeasurer::connect(&cli.chrome, &config.font).await?);

    let out = BufWriter::new(std::io::stdout().lock());
    let result = widthgen::run(&config, Arc::clone(&measurer), data, out).await;

    measurer.close().await;
    result
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level);

    match run(cli).await {
        Ok(stats) => {
            info!(
                samples = stats.samples,
                characters = stats.characters,
                "done"
            );
        }
        Err(err) => {
            error!(error = %err, "generation failed");
            eprintln!("widthgen: {err}");
            std::process::exit(1);
        }
    }
}
