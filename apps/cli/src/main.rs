mod cli;
mod output;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tinkerbell_market_data::{AcquisitionPipeline, CancellationToken, Holders, PipelineConfig};
use tokio::task::JoinSet;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use cli::{ChartArgs, Cli, Command};
use output::{breakdown_table, chart_table, holders_table};

/// Logs go to stderr so tables on stdout stay clean.
fn init_tracing(debug: bool) {
    let log_format = std::env::var("TB_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

/// Cancel outstanding work on Ctrl-C.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling outstanding requests");
            trigger.cancel();
        }
    });
    cancel
}

fn require_tickers(config: &PipelineConfig) -> Result<()> {
    if config.tickers.is_empty() {
        bail!("No tickers selected, pass --tickers or set TB_TICKERS");
    }
    Ok(())
}

async fn chart(config: &PipelineConfig, args: &ChartArgs, cancel: CancellationToken) -> Result<()> {
    require_tickers(config)?;
    let pipeline = AcquisitionPipeline::new(config).context("Error creating pipeline")?;
    let (from, to) = args.window(chrono::Utc::now());

    let mut receiver =
        pipeline.get_ohlc_batch(config.tickers.clone(), &args.interval, from, to, cancel)?;
    while let Some(chart) = receiver.recv().await {
        print!("{}", chart_table(&chart));
    }

    let summary = receiver.summary().await;
    if summary.failed > 0 {
        eprintln!(
            "{} of {} tickers could not be fetched",
            summary.failed, summary.requested
        );
    }
    Ok(())
}

async fn hold(config: &PipelineConfig, cancel: CancellationToken) -> Result<()> {
    require_tickers(config)?;
    let pipeline = Arc::new(AcquisitionPipeline::new(config).context("Error creating pipeline")?);

    let mut lookups = JoinSet::new();
    for ticker in config.tickers.iter().cloned() {
        let pipeline = Arc::clone(&pipeline);
        let cancel = cancel.clone();
        lookups.spawn(async move {
            let result = pipeline.get_holders(&ticker, &cancel).await;
            (ticker, result)
        });
    }

    let mut found: Vec<Holders> = Vec::new();
    while let Some(joined) = lookups.join_next().await {
        match joined? {
            (_, Ok(holders)) => {
                print!(
                    "{}",
                    holders_table(&holders.institutional, "Top Institutional Holders")
                );
                print!("{}", holders_table(&holders.funds, "Top Mutual Fund Holders"));
                found.push(holders);
            }
            (ticker, Err(e)) => eprintln!("Error fetching '{}' data: {}", ticker, e),
        }
    }

    print!(
        "{}",
        breakdown_table(found.iter().map(|holders| &holders.breakdown))
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.options.debug);

    let config = cli.options.to_config();
    if cli.options.print_config {
        eprintln!("{}", serde_json::to_string_pretty(&config.masked())?);
    }

    let cancel = cancel_on_interrupt();
    match &cli.command {
        Command::Chart(args) => chart(&config, args, cancel).await,
        Command::Hold => hold(&config, cancel).await,
    }
}
