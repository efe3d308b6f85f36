#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

use aws_inventory::app::inventory::{
    FailureSummary, InventoryClient, InventoryConfig, SessionCoordinator,
};

const DEFAULT_FILTER: &str = "aws_inventory=info,aws_config=warn,aws_sigv4=warn,aws_smithy_runtime=warn,aws_smithy_runtime_api=warn,hyper=warn";

/// File logging in the platform data directory; stderr when that is unavailable.
/// `RUST_LOG` overrides the default filter.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::builder().parse(DEFAULT_FILTER))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "", "aws-inventory") {
        let log_dir = proj_dirs.data_dir().join("logs");
        let _ = std::fs::create_dir_all(&log_dir);
        let log_path = log_dir.join("aws-inventory.log");

        let file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&log_path);

        if let Ok(file) = file {
            // Owner read/write only
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(metadata) = file.metadata() {
                    let mut perms = metadata.permissions();
                    perms.set_mode(0o600);
                    if let Err(e) = std::fs::set_permissions(&log_path, perms) {
                        eprintln!("[SECURITY] Failed to set log file permissions: {}", e);
                    }
                }
            }

            let file = Arc::new(file);
            let subscriber = tracing_subscriber::registry().with(filter).with(
                tracing_subscriber::fmt::layer()
                    .with_writer(move || file.clone())
                    .with_ansi(false),
            );
            if tracing::subscriber::set_global_default(subscriber).is_ok() {
                tracing::info!("Logging initialized to: {:?}", log_path);
            }
            return;
        }
    }

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn run() -> Result<()> {
    let config = InventoryConfig::load().context("Failed to load inventory config")?;
    let sessions = Arc::new(SessionCoordinator::from_environment().await);

    let account_id = match &config.account_id {
        Some(account_id) => account_id.clone(),
        None => sessions.resolve_account_id().await?,
    };

    let client = InventoryClient::new(sessions, config);

    // Ctrl-C stops outstanding branches; what was collected is still written
    let cancel = client.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            aws_inventory::trace_warn!("Interrupted, cancelling inventory");
            cancel.cancel();
        }
    });

    let mut collection = client.collect(&account_id).await;
    collection.sort_by_identity();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for record in &collection.records {
        serde_json::to_writer(&mut out, record)?;
        writeln!(out)?;
    }
    out.flush()?;

    let summary = FailureSummary::from_failures(&collection.failures);
    eprintln!(
        "{} records, {}",
        collection.records.len(),
        summary.describe()
    );
    if collection.is_empty() && !summary.is_clean() {
        aws_inventory::trace_error!(
            "Inventory of {} produced no records: {}",
            account_id,
            summary.describe()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    tracing::info!(
        "aws-inventory {} ({}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("INVENTORY_GIT_COMMIT")
    );

    run().await
}
