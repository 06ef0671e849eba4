// Provision a single gateway

use super::common::Context;
use crate::input::{GatewaySpec, OwnerDefaults};
use crate::render;
use std::path::PathBuf;

/// Reconcile one gateway and print the report.
///
/// Step failures are part of the report, not an error exit.
pub async fn run(
    ctx: &Context,
    spec: GatewaySpec,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let today = chrono::Utc::now().date_naive();
    let desired = spec.into_desired(&OwnerDefaults::default(), &ctx.config.provision, today)?;
    let reconciler = ctx.reconciler(output_dir)?;

    tracing::info!(
        device_id = %desired.identity.device_id,
        eui = %desired.identity.eui,
        "provisioning gateway"
    );
    let report = reconciler.reconcile(&desired).await;
    let log_path = ctx.persist(&report.log).await;

    print!("{}", render::provision(&report, &desired, log_path.as_deref()));
    Ok(())
}
