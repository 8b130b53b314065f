//! # Passbatch Runner
//!
//! Command-line entry point for the scheduled batch pipelines. The external
//! scheduler (cron or an orchestrator) invokes one subcommand per run; a
//! FAILED job exits nonzero with the failing chunk's error on stderr.

use clap::{Parser, Subcommand};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

use passbatch_core::batch::JobExecution;
use passbatch_core::config::BatchConfig;
use passbatch_core::delivery::KakaoTalkClient;
use passbatch_core::jobs;
use passbatch_core::logging;
use passbatch_core::store::postgres::PgStore;
use passbatch_core::store::RecordStore;

#[derive(Parser)]
#[command(name = "passbatch")]
#[command(about = "Run one pass-maintenance batch pipeline to completion")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand READY bulk passes into per-member entitlements
    FanOut,
    /// Sweep elapsed PROGRESSED passes to EXPIRED
    Expire,
    /// Generate and dispatch pre-class notifications
    Notify,
    /// Generate pre-class notifications only
    NotifyGenerate,
    /// Dispatch unsent pre-class notifications only
    NotifyDispatch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let cli = Cli::parse();

    let config = BatchConfig::from_env()?;
    let store: Arc<dyn RecordStore> = Arc::new(PgStore::connect(&config.database_url).await?);
    let delivery = Arc::new(KakaoTalkClient::new(&config.delivery));

    // An interrupt stops the run at the next chunk boundary; the chunk in
    // flight still commits.
    let cancellation = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&cancellation);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; finishing the current chunk");
                flag.store(true, Ordering::Relaxed);
            }
        });
    }
    let cancellation = Some(cancellation);

    let execution = match cli.command {
        Commands::FanOut => jobs::run_fan_out_job(store, &config, cancellation).await,
        Commands::Expire => jobs::run_expiration_job(store, &config, cancellation).await,
        Commands::Notify => {
            jobs::run_notification_job(store, delivery, &config, cancellation).await
        }
        Commands::NotifyGenerate => {
            jobs::run_notification_generation_job(store, &config, cancellation).await
        }
        Commands::NotifyDispatch => {
            jobs::run_notification_dispatch_job(store, delivery, &config, cancellation).await
        }
    };

    report(&execution);
    if !execution.is_completed() {
        process::exit(1);
    }
    Ok(())
}

fn report(execution: &JobExecution) {
    for step in &execution.step_executions {
        println!(
            "{} / {}: read={} written={} skipped={} chunks={}",
            execution.job_name,
            step.step_name,
            step.read_count,
            step.write_count,
            step.skip_count,
            step.chunks_committed
        );
    }
    if let Some(err) = execution.error() {
        eprintln!("{}: FAILED: {err}", execution.job_name);
    }
}
