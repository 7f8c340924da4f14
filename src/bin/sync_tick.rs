//! One-shot schedule sweep, for cron-driven deployments that do not run the
//! in-process scheduler.

use account_sync::{app::Services, config::ConfigLoader, db, telemetry};
use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "sync-tick", about = "Create sync jobs for trusted accounts due this hour")]
struct Args {
    /// UTC hour to sweep (0-23); defaults to the current hour
    #[arg(long)]
    hour: Option<u8>,

    /// Also execute the queued jobs before exiting
    #[arg(long)]
    drain: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(hour) = args.hour {
        if hour > 23 {
            bail!("--hour must be between 0 and 23, got {hour}");
        }
    }

    let loader = ConfigLoader::new();
    let config = loader.load().context("loading configuration")?;
    telemetry::init_tracing(&config)?;

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&db).await?;

    let services = Services::from_config(config, db)?;
    let report = services
        .jobs
        .create_jobs_by_trusted_account(args.hour)
        .await
        .context("running schedule sweep")?;
    println!("{}", serde_json::to_string(&report)?);

    if args.drain {
        let worker = services.dispatch_worker();
        let mut executed = 0;
        loop {
            let count = worker.tick().await.context("executing queued jobs")?;
            if count == 0 {
                break;
            }
            executed += count;
        }
        info!(executed, "drained dispatch queue");
    }

    Ok(())
}
