// Provision every gateway listed in a batch file

use super::common::Context;
use crate::{input, render};
use std::path::Path;
use std::sync::Arc;
use tether_provision::{BatchEntry, BatchRunner};

/// Load, validate and reconcile a batch.
///
/// A malformed entry rejects the whole file before anything is sent.
pub async fn run(ctx: &Context, file: &Path) -> anyhow::Result<()> {
    let today = chrono::Utc::now().date_naive();
    let batch = input::load_batch(file, &ctx.config.provision, today).await?;
    let requested = batch.clone();

    tracing::info!(count = batch.len(), file = %file.display(), "starting batch");
    let runner = BatchRunner::new(
        Arc::new(ctx.reconciler(None)?),
        ctx.config.provision.batch_concurrency,
    );
    let entries = runner.run(batch).await;

    for entry in &entries {
        if let BatchEntry::Completed(report) = entry {
            let log_path = ctx.persist(&report.log).await;
            if let Some(desired) = requested
                .iter()
                .find(|d| d.identity.device_id == report.device_id)
            {
                print!("{}", render::provision(report, desired, log_path.as_deref()));
                println!();
            }
        }
    }
    print!("{}", render::batch(&entries));
    Ok(())
}
