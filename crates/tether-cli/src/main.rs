// Operator CLI for provisioning LoRaWAN gateways across the identity and radio-plane clusters

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tether_core::OwnerKind;
use tracing_subscriber::EnvFilter;

mod commands;
mod input;
mod presets;
mod render;

use commands::common::Context;
use input::GatewaySpec;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Tether - gateway provisioning for split-cluster LoRaWAN deployments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = ".tether/config.toml")]
    config: PathBuf,

    /// Registry API token (defaults to TETHER_API_TOKEN)
    #[arg(long, global = true)]
    api_token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register or repair one gateway and issue its keys
    Provision {
        /// Gateway EUI (16 hex digits, separators allowed)
        #[arg(short, long)]
        eui: String,

        /// Owner user or organization id
        #[arg(short, long)]
        owner: String,

        /// Owner kind (user, org)
        #[arg(long, default_value = "user", value_parser = parse_owner_kind)]
        owner_type: OwnerKind,

        /// Gateway id (derived from the EUI when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Frequency plan (defaults to the configured plan)
        #[arg(short, long)]
        frequency_plan: Option<String>,

        /// Antenna latitude
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Antenna longitude
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Antenna altitude in meters
        #[arg(long, allow_negative_numbers = true)]
        alt: Option<f64>,

        /// Skip the LNS key
        #[arg(long)]
        no_lns: bool,

        /// Also issue a CUPS key
        #[arg(long)]
        cups: bool,

        /// Audit store organization id
        #[arg(long)]
        audit_org: Option<String>,

        /// Audit store site id
        #[arg(long, requires = "audit_org")]
        audit_site: Option<String>,

        /// Directory for key files (defaults to the configured directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Provision every gateway in a JSON batch file
    Batch {
        /// Batch file path
        file: PathBuf,
    },

    /// Show registration, pointer drift and connectivity of a gateway
    Status {
        /// Gateway id
        id: String,
    },

    /// Delete a gateway from the registry
    Deprovision {
        /// Gateway id
        id: String,

        /// Purge after deleting, releasing the EUI
        #[arg(long)]
        purge: bool,

        /// Confirm the removal
        #[arg(short, long)]
        yes: bool,
    },
}

fn parse_owner_kind(value: &str) -> Result<OwnerKind, String> {
    match value.to_ascii_lowercase().as_str() {
        "user" => Ok(OwnerKind::User),
        "org" | "organization" => Ok(OwnerKind::Organization),
        other => Err(format!("unknown owner type '{other}', expected user or org")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = Context::load(&cli.config, cli.api_token)?;

    match cli.command {
        Commands::Provision {
            eui,
            owner,
            owner_type,
            id,
            name,
            frequency_plan,
            lat,
            lon,
            alt,
            no_lns,
            cups,
            audit_org,
            audit_site,
            output_dir,
        } => {
            let spec = GatewaySpec {
                gateway_id: id,
                name,
                owner_id: Some(owner),
                owner_type: Some(owner_type),
                frequency_plan,
                latitude: lat,
                longitude: lon,
                altitude: alt,
                generate_lns_key: !no_lns,
                generate_cups_key: cups,
                audit_org_id: audit_org,
                audit_site_id: audit_site,
                ..GatewaySpec::new(eui)
            };
            commands::provision::run(&ctx, spec, output_dir).await?;
        }
        Commands::Batch { file } => {
            commands::batch::run(&ctx, &file).await?;
        }
        Commands::Status { id } => {
            commands::status::run(&ctx, &id).await?;
        }
        Commands::Deprovision { id, purge, yes } => {
            commands::deprovision::run(&ctx, &id, purge, yes).await?;
        }
    }

    Ok(())
}
