//! Quant engine worker over JSON lines
//!
//! Reads one request envelope per line on stdin and writes one response per
//! line on stdout, in completion order. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use quant_engine::{EngineConfig, QuantRouter};
use services_common::{ResponseEnvelope, ServiceError, Worker, decode_request};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const SERVICE_NAME: &str = "quant-engine";

#[derive(Parser, Debug)]
#[command(name = "quant-engine")]
#[command(about = "Off-thread quantitative calculation engine speaking JSON lines")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); `QUANT_ENGINE__*` variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = EngineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    info!(service = SERVICE_NAME, "Starting");
    let worker_config = config.worker.clone();
    let handle = Worker::spawn(QuantRouter::new(config), &worker_config)?;

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ResponseEnvelope>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = out_rx.recv().await {
            let mut line = serde_json::to_vec(&response)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
            stdout.flush().await?;
        }
        anyhow::Ok(())
    });

    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request = match decode_request(&line) {
            Ok(request) => request,
            Err(rejection) => {
                warn!(id = %rejection.id, "Malformed request line");
                let _ = out_tx.send(rejection);
                continue;
            }
        };

        let id = request.id.clone();
        match handle.submit(request).await {
            Ok(pending) => {
                let out_tx = out_tx.clone();
                in_flight.spawn(async move {
                    let response = match pending.wait().await {
                        Ok(response) => response,
                        Err(err) => ResponseEnvelope::error(id, err.to_string()),
                    };
                    let _ = out_tx.send(response);
                });
            }
            Err(err @ ServiceError::DuplicateRequestId(_)) => {
                let _ = out_tx.send(ResponseEnvelope::error(id, err.to_string()));
            }
            Err(err) => return Err(err.into()),
        }
    }

    while in_flight.join_next().await.is_some() {}
    let snapshot = handle.metrics().snapshot();
    info!(
        received = snapshot.total_received(),
        rejected = snapshot.total_rejected(),
        "Input closed"
    );

    drop(out_tx);
    writer.await??;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=info,services_common=info", SERVICE_NAME.replace('-', "_")).into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .init();
}
