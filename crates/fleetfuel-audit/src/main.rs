//! Maintenance binary for the `FleetFuel` ledger.
//!
//! Verifies that every stored average consumption of one vehicle matches
//! its derivation from the chronological predecessor, and with `--repair`
//! overwrites the drifted rates in a single transaction.
//!
//! # Startup Sequence
//!
//! 1. Parse command-line arguments
//! 2. Load configuration from `fleetfuel-config.yaml`
//! 3. Initialize structured logging (tracing)
//! 4. Connect to `PostgreSQL` and apply migrations
//! 5. Audit or repair the vehicle ledger
//! 6. Log the result and exit non-zero on unrepaired drift

mod config;
mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use fleetfuel_db::PostgresPool;
use fleetfuel_ledger::AuditResult;
use fleetfuel_types::{OrganizationId, VehicleId};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::AuditConfig;
use crate::error::AuditError;

#[derive(Parser)]
#[command(
    name = "fleetfuel-audit",
    about = "Audit and repair a vehicle's fuel-consumption ledger"
)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long, default_value = "fleetfuel-config.yaml")]
    config: PathBuf,

    /// Organization owning the vehicle.
    organization_id: Uuid,

    /// Vehicle whose ledger is checked.
    vehicle_id: Uuid,

    /// Overwrite drifted rates with their derived values.
    #[arg(long)]
    repair: bool,
}

/// Application entry point for the audit binary.
///
/// # Errors
///
/// Returns an error if configuration, the database connection or the
/// ledger read fails.
#[tokio::main]
async fn main() -> Result<ExitCode, AuditError> {
    let cli = Cli::parse();

    let (config, from_file) = load_config(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!(
        config = %cli.config.display(),
        from_file,
        max_connections = config.database.max_connections,
        "fleetfuel-audit starting"
    );

    let pool = PostgresPool::connect(&config.database.pool_config()).await?;
    if config.database.run_migrations {
        pool.run_migrations().await?;
    }

    let organization_id = OrganizationId::from(cli.organization_id);
    let vehicle_id = VehicleId::from(cli.vehicle_id);
    let maintainer = pool.maintainer();

    let outcome = if cli.repair {
        maintainer.repair_vehicle(organization_id, vehicle_id).await
    } else {
        maintainer.audit_vehicle(organization_id, vehicle_id).await
    };
    pool.close().await;
    let result = outcome?;

    if report(vehicle_id, &result, cli.repair) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Load configuration from `path`, or fall back to defaults when the file
/// does not exist. The flag reports whether the file was read.
fn load_config(path: &Path) -> Result<(AuditConfig, bool), AuditError> {
    if path.exists() {
        Ok((AuditConfig::from_file(path)?, true))
    } else {
        Ok((AuditConfig::from_env(), false))
    }
}

/// Log the outcome. Returns `false` when drift was found and left in place.
fn report(vehicle_id: VehicleId, result: &AuditResult, repaired: bool) -> bool {
    match result {
        AuditResult::Consistent => {
            info!(%vehicle_id, "Ledger consistent");
            true
        }
        AuditResult::Drift(drifts) if repaired => {
            info!(%vehicle_id, repaired = drifts.len(), "Ledger repaired");
            true
        }
        AuditResult::Drift(drifts) => {
            info!(
                %vehicle_id,
                drifted = drifts.len(),
                "Ledger drift found; rerun with --repair to fix"
            );
            false
        }
    }
}
