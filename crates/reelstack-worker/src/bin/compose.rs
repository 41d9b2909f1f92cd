//! One-shot composition from a job file.
//!
//! Usage: `reelstack-compose <job.json> [output-dir]`
//!
//! The job file holds a request body as accepted by `POST /create-video`.
//! The result is printed to stdout as JSON; the exit code is non-zero when
//! the job fails.

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelstack_models::CompositionRequest;
use reelstack_worker::{Compositor, DirectorySink, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    let mut args = std::env::args().skip(1);
    let Some(job_path) = args.next() else {
        bail!("usage: reelstack-compose <job.json> [output-dir]");
    };
    let output_dir = args.next();

    let body = tokio::fs::read_to_string(&job_path)
        .await
        .with_context(|| format!("reading {}", job_path))?;
    let request: CompositionRequest =
        serde_json::from_str(&body).with_context(|| format!("parsing {}", job_path))?;
    let job = request.into_job()?;

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt, cancelling encoder");
            let _ = cancel_tx.send(true);
        }
    });

    let mut compositor = Compositor::from_config(&config, Some(cancel_rx))?;
    if let Some(dir) = output_dir {
        compositor = compositor.with_sink(Arc::new(DirectorySink::new(dir)));
    }

    let result = compositor.submit(job).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("reelstack=info".parse()?);

    // Logs go to stderr so stdout carries only the result
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}
