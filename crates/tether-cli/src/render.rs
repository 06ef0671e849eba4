//! Console rendering of reports
//!
//! Everything is built into a `String` first so callers decide where it goes.
//! Nothing rendered here can contain a secret: reports only carry receipts.

use crossterm::style::Stylize;
use std::fmt::Write;
use std::path::Path;
use tether_core::{DesiredState, RadioConnection, RunLog, StepStatus, Topology};
use tether_provision::{
    BatchEntry, Connectivity, CredentialListing, DeprovisionOutcome, DeprovisionReport,
    PointerCheck, ProvisionReport, ReconcileState, Registration, StatusReport,
};

/// Basics Station LNS port
pub const LNS_PORT: u16 = 8887;
/// Semtech UDP packet forwarder port
pub const UDP_PORT: u16 = 1700;
/// CUPS port
pub const CUPS_PORT: u16 = 443;

fn state_label(state: ReconcileState) -> &'static str {
    match state {
        ReconcileState::Unknown => "unknown",
        ReconcileState::Absent => "absent",
        ReconcileState::PresentCorrect => "present, pointer correct",
        ReconcileState::PresentDrifted => "present, pointer drifted",
        ReconcileState::Converged => "converged",
        ReconcileState::Verified => "verified",
        ReconcileState::Halted => "halted",
    }
}

fn write_steps(out: &mut String, log: &RunLog) {
    for step in &log.steps {
        let mark = match step.status {
            StepStatus::Succeeded => "✓".green(),
            StepStatus::Warning => "⚠".yellow(),
            StepStatus::Failed => "✗".red(),
        };
        let _ = writeln!(out, "  {mark} {}: {}", step.step.as_str().bold(), step.message);
    }
    for skipped in &log.skipped {
        let _ = writeln!(
            out,
            "  {} {}: skipped ({})",
            "-".dark_grey(),
            skipped.step,
            skipped.reason
        );
    }
    let summary = format!("{}/{} steps succeeded", log.succeeded_count(), log.total());
    let summary = if log.failed_count() == 0 {
        summary.green()
    } else {
        summary.yellow()
    };
    let _ = writeln!(out, "{summary}");
}

/// Connection settings an installer enters on the gateway
pub fn connection_hints(topology: &Topology) -> String {
    let host = &topology.radio_plane_host;
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Gateway configuration".bold());
    let _ = writeln!(out, "  Basics Station LNS:   wss://{host}:{LNS_PORT}");
    let _ = writeln!(out, "  Basics Station CUPS:  https://{host}:{CUPS_PORT}");
    let _ = writeln!(out, "  UDP packet forwarder: {host}:{UDP_PORT} (up and down)");
    out
}

/// Full provisioning report
pub fn provision(
    report: &ProvisionReport,
    desired: &DesiredState,
    log_path: Option<&Path>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} ({}, {})",
        "Provisioning".bold(),
        report.device_id,
        desired.identity.eui,
        desired.frequency_plan
    );
    write_steps(&mut out, &report.log);
    let _ = writeln!(out, "State: {}", state_label(report.state));

    match &report.connection {
        Some(RadioConnection::Connected(state)) => {
            let _ = writeln!(
                out,
                "Radio plane: connected via {}",
                state.protocol.as_deref().unwrap_or("unknown protocol")
            );
        }
        Some(RadioConnection::NotConnected) => {
            let _ = writeln!(out, "Radio plane: not yet connected");
        }
        None => {}
    }

    if report.halted_at.is_none() {
        out.push_str(&connection_hints(&report.log.topology));
    }

    if !report.log.credentials.is_empty() {
        let _ = writeln!(out, "{}", "Credentials".bold());
        for receipt in &report.log.credentials {
            match &receipt.artifact {
                Some(location) => {
                    let _ = writeln!(out, "  {} key {}: {location}", receipt.kind, receipt.id);
                }
                None => {
                    let _ = writeln!(
                        out,
                        "  {} key {}: {}",
                        receipt.kind,
                        receipt.id,
                        "not saved, revoke it".red()
                    );
                }
            }
        }
        let _ = writeln!(
            out,
            "{}",
            "Key files hold secrets that cannot be retrieved again; store them securely.".yellow()
        );
    }

    if let Some(path) = log_path {
        let _ = writeln!(out, "Run log: {}", path.display());
    }
    out
}

/// Deprovisioning report
pub fn deprovision(report: &DeprovisionReport, log_path: Option<&Path>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "Deprovisioning".bold(), report.device_id);
    write_steps(&mut out, &report.log);
    let verdict = match report.outcome {
        DeprovisionOutcome::NotFound => "gateway was not registered".to_string(),
        DeprovisionOutcome::Removed { purged, confirmed } => format!(
            "removed{}{}",
            if purged { ", EUI released" } else { ", EUI still reserved" },
            if confirmed { "" } else { " (not yet confirmed)" }
        ),
        DeprovisionOutcome::Failed { step } => format!("failed at {step}"),
    };
    let _ = writeln!(out, "Outcome: {verdict}");
    if let Some(path) = log_path {
        let _ = writeln!(out, "Run log: {}", path.display());
    }
    out
}

/// Status report
pub fn status(report: &StatusReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "Status of".bold(), report.device_id);

    match &report.registration {
        Registration::Registered(record) => {
            let _ = writeln!(
                out,
                "  {} registered as {:?}, plans {}",
                "✓".green(),
                record.name.as_deref().unwrap_or("<unnamed>"),
                record.frequency_plan_ids.join(", ")
            );
        }
        Registration::NotFound => {
            let _ = writeln!(out, "  {} not registered", "✗".red());
            return out;
        }
        Registration::Unavailable(why) => {
            let _ = writeln!(out, "  {} registry unavailable: {why}", "✗".red());
            return out;
        }
    }

    match &report.pointer {
        PointerCheck::Correct => {
            let _ = writeln!(
                out,
                "  {} server pointer {}",
                "✓".green(),
                report.topology.radio_plane_host
            );
        }
        PointerCheck::Drifted { expected, observed } => {
            let _ = writeln!(
                out,
                "  {} server pointer is {} but should be {expected}; run provision to correct it",
                "⚠".yellow(),
                observed.as_deref().unwrap_or("<unset>")
            );
        }
        PointerCheck::Unknown => {}
    }

    match &report.connectivity {
        Some(Connectivity::Connected(state)) => {
            let _ = writeln!(
                out,
                "  {} connected since {}",
                "✓".green(),
                state.connected_at.as_deref().unwrap_or("unknown")
            );
            if let Some(uplink) = &state.last_uplink_received_at {
                let _ = writeln!(out, "    last uplink {uplink}");
            }
        }
        Some(Connectivity::NotConnected) => {
            let _ = writeln!(out, "  {} not connected", "⚠".yellow());
        }
        Some(Connectivity::Unavailable(why)) => {
            let _ = writeln!(out, "  {} radio plane unavailable: {why}", "✗".red());
        }
        None => {}
    }

    match &report.credentials {
        Some(CredentialListing::Listed(keys)) => {
            let _ = writeln!(out, "  {} API key(s)", keys.len());
            for key in keys {
                let _ = writeln!(
                    out,
                    "    {} {} [{}]",
                    key.id,
                    key.name.as_deref().unwrap_or(""),
                    key.rights.join(", ")
                );
            }
        }
        Some(CredentialListing::Unavailable(why)) => {
            let _ = writeln!(out, "  {} key listing unavailable: {why}", "✗".red());
        }
        None => {}
    }
    out
}

/// One line per batch entry plus a total
pub fn batch(entries: &[BatchEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Batch summary".bold());
    for entry in entries {
        match entry {
            BatchEntry::Completed(report) => {
                let mark = if report.is_complete() {
                    "✓".green()
                } else {
                    "✗".red()
                };
                let _ = writeln!(
                    out,
                    "  {mark} {} {} ({}/{})",
                    report.device_id,
                    state_label(report.state),
                    report.log.succeeded_count(),
                    report.log.total()
                );
            }
            BatchEntry::Aborted { device_id, reason } => {
                let _ = writeln!(out, "  {} {device_id} aborted: {reason}", "✗".red());
            }
        }
    }
    let complete = entries.iter().filter(|e| e.is_complete()).count();
    let _ = writeln!(out, "{complete}/{} gateways provisioned cleanly", entries.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tether_provision::Reconciler;
    use tether_testkit::{
        lns_request, test_desired_state, test_topology, MockGatewayBackend,
        RecordingArtifactWriter,
    };

    #[tokio::test]
    async fn test_provision_render_has_summary_and_hints() {
        let backend = MockGatewayBackend::new();
        let writer = RecordingArtifactWriter::new();
        let desired = test_desired_state().with_credential(lns_request());
        let report = Reconciler::new(
            Arc::new(backend.clone()),
            test_topology(),
            Arc::new(writer.clone()),
        )
        .reconcile(&desired)
        .await;

        let text = provision(&report, &desired, Some(Path::new("/tmp/log.json")));

        assert!(text.contains("3/3 steps succeeded"));
        assert!(text.contains("wss://nam1.cloud.thethings.network:8887"));
        assert!(text.contains("nam1.cloud.thethings.network:1700"));
        assert!(text.contains("memory://gw-a00009ef/lns"));
        assert!(text.contains("skipped (no antenna location given)"));
        for secret in writer.secrets() {
            assert!(!text.contains(&secret));
        }
    }

    #[test]
    fn test_hints_use_topology_host() {
        let topology =
            Topology::new("https://id.example", "https://rp.example", "rp.example").unwrap();
        let text = connection_hints(&topology);
        assert!(text.contains("https://rp.example:443"));
        assert!(text.contains("rp.example:1700"));
    }
}
