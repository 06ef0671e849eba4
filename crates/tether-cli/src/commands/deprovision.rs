// Remove a gateway from the registry

use super::common::Context;
use crate::render;
use anyhow::bail;
use tether_core::DeviceId;
use tether_provision::{DeprovisionOptions, Deprovisioner};

/// Delete, optionally purge, and confirm.
///
/// Destructive, so `--yes` is required.
pub async fn run(
    ctx: &Context,
    device_id: &str,
    purge: bool,
    confirmed: bool,
) -> anyhow::Result<()> {
    let device_id = DeviceId::new(device_id)?;
    if !confirmed {
        bail!(
            "refusing to deprovision {device_id} without --yes{}",
            if purge { " (purge releases the EUI permanently)" } else { "" }
        );
    }

    let deprovisioner = Deprovisioner::new(ctx.backend.clone(), ctx.config.topology.clone());
    let report = deprovisioner
        .deprovision(&device_id, DeprovisionOptions { purge })
        .await;
    let log_path = ctx.persist(&report.log).await;
    print!("{}", render::deprovision(&report, log_path.as_deref()));
    Ok(())
}
