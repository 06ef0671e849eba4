// Read-only status of one gateway

use super::common::Context;
use crate::render;
use tether_core::DeviceId;
use tether_provision::StatusReporter;

/// Print registration, pointer drift, connectivity and keys
pub async fn run(ctx: &Context, device_id: &str) -> anyhow::Result<()> {
    let device_id = DeviceId::new(device_id)?;
    let reporter = StatusReporter::new(ctx.backend.clone(), ctx.config.topology.clone());
    let report = reporter.report(&device_id).await;
    print!("{}", render::status(&report));
    Ok(())
}
