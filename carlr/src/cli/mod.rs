/*
 * carlr - track vehicles, service logs, upcoming maintenance, and backups
 *
 * SPDX-FileCopyrightText: 2025-2026 Carlog contributors
 * SPDX-License-Identifier: Apache-2.0
 */
use std::path::PathBuf;

use anyhow::Result;
use carlog::prelude::*;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;

use crate::output::{Output, OutputFormat};

pub mod backup;
pub mod common;
pub mod defs;
pub mod health;
pub mod interval;
pub mod log;
pub mod prefs;
pub mod report;
pub mod service_type;
pub mod vehicle;

#[derive(Parser, Debug)]
#[command(name = "carlr")]
#[command(author, version, about = "carlr: track vehicles, service logs, upcoming maintenance, and backups", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Backend URL. Default: environment `CARLOG_URL` or <http://localhost:8000>
    #[arg(short = 'u', long, env = "CARLOG_URL")]
    pub url: Option<String>,

    /// Write output to file (default: stdout)
    #[arg(short = 'o', long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// JSON output (default)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Table output format
    #[arg(short, long, global = true)]
    pub table: bool,

    /// Quiet mode - suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (repeat for more: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global=true)]
    pub verbose: u8,

    /// Preferences file. Default: environment `CARLOG_PREFS_FILE` or `<config dir>/carlog/preferences.json`
    #[arg(long, env = "CARLOG_PREFS_FILE", value_name = "FILE")]
    pub prefs_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Vehicle list and CRUD operations
    #[command(alias = "vehicles")]
    Vehicle(VehicleArgs),

    /// Service type list and CRUD operations
    #[command(alias = "service-types", alias = "st")]
    ServiceType(ServiceTypeArgs),

    /// Maintenance log list and CRUD operations
    #[command(alias = "logs")]
    Log(LogArgs),

    /// Per-vehicle service interval overrides
    #[command(alias = "overrides")]
    Override(OverrideArgs),

    /// Upcoming and overdue maintenance
    Advise(AdviseArgs),

    /// Vehicle statistics and cost breakdown
    Stats(StatsArgs),

    /// Export a vehicle's log history as CSV
    ExportCsv(ExportCsvArgs),

    /// Backup export, analysis, and restore
    Backup(BackupArgs),

    /// Check that the backend is reachable
    Health(HealthArgs),

    /// Display preferences
    Prefs(PrefsArgs),

    /// Vehicle make/model/year lookups
    Defs(DefsArgs),
}

// ============================================================================
// vehicles
// ============================================================================

#[derive(Args, Debug)]
pub struct VehicleArgs {
    #[command(subcommand)]
    pub command: VehicleCommands,
}

#[derive(Subcommand, Debug)]
pub enum VehicleCommands {
    List,
    Get {
        /// vehicle id, name ("2019 Toyota Corolla"), or VIN
        vehicle: String,
    },
    Create {
        make: String,
        model: String,

        #[command(flatten)]
        fields: VehicleFieldArgs,
    },
    Update {
        /// vehicle id, name, or VIN
        vehicle: String,

        #[arg(long)]
        make: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[command(flatten)]
        fields: VehicleFieldArgs,
    },
    Delete {
        /// vehicle id, name, or VIN
        vehicle: String,
    },
}

#[derive(Args, Debug)]
pub struct VehicleFieldArgs {
    /// model year
    #[arg(long)]
    pub year: Option<i32>,

    /// vehicle identification number (max 17 characters)
    #[arg(long)]
    pub vin: Option<String>,

    /// odometer reading when acquired, in km
    #[arg(long, value_name = "KM")]
    pub initial_mileage: Option<i64>,

    /// date acquired (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub acquired: Option<NaiveDate>,
}

// ============================================================================
// service types
// ============================================================================

#[derive(Args, Debug)]
pub struct ServiceTypeArgs {
    #[command(subcommand)]
    pub command: ServiceTypeCommands,
}

#[derive(Subcommand, Debug)]
pub enum ServiceTypeCommands {
    List,
    Get {
        /// service type id or name
        service_type: String,
    },
    /// List custom fields of a service type
    Fields {
        /// service type id or name
        service_type: String,
    },
    Create {
        name: String,

        /// recommended interval in km
        #[arg(long, value_name = "KM")]
        interval_km: Option<i64>,

        /// recommended interval in days
        #[arg(long, value_name = "DAYS")]
        interval_days: Option<i64>,

        /// custom field, NAME:TYPE[:UNIT] where TYPE is text, number, date, or boolean
        #[arg(short = 'f', long = "field", value_name = "SPEC")]
        fields: Vec<String>,
    },
    Update {
        /// service type id or name
        service_type: String,

        #[arg(long)]
        name: Option<String>,

        /// recommended interval in km
        #[arg(long, value_name = "KM", conflicts_with = "clear_interval_km")]
        interval_km: Option<i64>,

        /// recommended interval in days
        #[arg(long, value_name = "DAYS", conflicts_with = "clear_interval_days")]
        interval_days: Option<i64>,

        /// remove the km interval
        #[arg(long)]
        clear_interval_km: bool,

        /// remove the days interval
        #[arg(long)]
        clear_interval_days: bool,

        /// replace custom fields, NAME:TYPE[:UNIT]
        #[arg(short = 'f', long = "field", value_name = "SPEC")]
        fields: Vec<String>,
    },
    Delete {
        /// service type id or name
        service_type: String,
    },
}

// ============================================================================
// logs
// ============================================================================

#[derive(Args, Debug)]
pub struct LogArgs {
    #[command(subcommand)]
    pub command: LogCommands,
}

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    List {
        /// vehicle id, name, or VIN
        vehicle: String,

        /// only logs of this service type (id or name)
        #[arg(long = "service-type", value_name = "SERVICE_TYPE")]
        service_type: Option<String>,
    },
    Get {
        id: i64,
    },
    Create {
        /// vehicle id, name, or VIN
        vehicle: String,

        /// service date (YYYY-MM-DD). Default: today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// odometer reading, in km
        #[arg(long)]
        mileage: i64,

        #[command(flatten)]
        fields: LogFieldArgs,
    },
    Update {
        id: i64,

        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        mileage: Option<i64>,

        #[command(flatten)]
        fields: LogFieldArgs,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct LogFieldArgs {
    #[arg(long)]
    pub cost: Option<f64>,

    #[arg(long)]
    pub notes: Option<String>,

    /// service type id or name
    #[arg(long = "service-type", value_name = "SERVICE_TYPE")]
    pub service_type: Option<String>,

    /// custom field value, FIELD=VALUE where FIELD is a field name or id
    #[arg(long = "value", value_name = "FIELD=VALUE")]
    pub values: Vec<String>,
}

// ============================================================================
// interval overrides
// ============================================================================

#[derive(Args, Debug)]
pub struct OverrideArgs {
    #[command(subcommand)]
    pub command: OverrideCommands,
}

#[derive(Subcommand, Debug)]
pub enum OverrideCommands {
    /// Create or replace an override
    Set {
        /// vehicle id, name, or VIN
        vehicle: String,

        /// service type id or name
        service_type: String,

        #[arg(long, value_name = "KM")]
        km: Option<i64>,

        #[arg(long, value_name = "DAYS")]
        days: Option<i64>,
    },
    /// Remove an override, falling back to the recommended interval
    Clear {
        /// vehicle id, name, or VIN
        vehicle: String,

        /// service type id or name
        service_type: String,
    },
}

// ============================================================================
// reports
// ============================================================================

#[derive(Args, Debug)]
pub struct AdviseArgs {
    /// vehicle id, name, or VIN. Default: all vehicles
    pub vehicle: Option<String>,

    /// evaluate as of this date (YYYY-MM-DD). Default: today
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// current odometer reading. Default: latest logged mileage
    #[arg(long, value_name = "KM")]
    pub mileage: Option<i64>,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// vehicle id, name, or VIN
    pub vehicle: String,

    #[arg(long)]
    pub today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct ExportCsvArgs {
    /// vehicle id, name, or VIN
    pub vehicle: String,

    /// output file. Default: `<vehicle>_maintenance_history_<date>.csv`
    #[arg(short = 'f', long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

// ============================================================================
// backup
// ============================================================================

#[derive(Args, Debug)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub command: BackupCommands,
}

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Export a backup file
    Export {
        /// only these vehicles (id, name, or VIN). Default: all
        #[arg(long = "vehicle", value_name = "VEHICLE")]
        vehicles: Vec<String>,

        /// only logs on or after this date
        #[arg(long, value_name = "DATE")]
        start_date: Option<NaiveDate>,

        /// only logs on or before this date
        #[arg(long, value_name = "DATE")]
        end_date: Option<NaiveDate>,

        /// leave out maintenance logs
        #[arg(long)]
        no_logs: bool,

        /// output file. Default: `carlog_backup_<date>.json`
        #[arg(short = 'f', long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Show what a restore would add and which vehicles conflict
    Analyze {
        /// backup file
        file: PathBuf,
    },
    /// Restore from a backup file
    Restore {
        /// backup file
        file: PathBuf,

        /// add only these new vehicles (backup ids). Default: all new vehicles
        #[arg(long = "add", value_name = "ID", conflicts_with = "no_new")]
        add: Vec<i64>,

        /// add none of the new vehicles
        #[arg(long)]
        no_new: bool,

        /// replace the existing vehicle with this VIN. Other conflicts are skipped
        #[arg(long = "replace", value_name = "VIN")]
        replace: Vec<String>,

        /// analyze and print the plan without restoring
        #[arg(long)]
        dry_run: bool,
    },
}

// ============================================================================
// health, prefs, defs
// ============================================================================

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// wait for the backend to come up
    #[arg(long)]
    pub wait: bool,

    /// give up waiting after this many seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    pub timeout: u64,
}

#[derive(Args, Debug)]
pub struct PrefsArgs {
    #[command(subcommand)]
    pub command: PrefsCommands,
}

#[derive(Subcommand, Debug)]
pub enum PrefsCommands {
    Show,
    Set {
        /// primary color (#hex, rgb(), hsl(), or oklch())
        #[arg(long)]
        primary: Option<String>,

        /// accent color
        #[arg(long)]
        accent: Option<String>,

        /// background image url
        #[arg(long, conflicts_with = "no_background")]
        background: Option<String>,

        /// remove the background image
        #[arg(long)]
        no_background: bool,
    },
    /// Restore default preferences
    Reset,
}

#[derive(Args, Debug)]
pub struct DefsArgs {
    #[arg(value_enum)]
    pub kind: DefinitionKindArg,

    #[arg(long)]
    pub make: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub year: Option<i32>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefinitionKindArg {
    Makes,
    Models,
    Years,
}

impl DefinitionKindArg {
    pub fn to_kind(self) -> DefinitionKind {
        match self {
            Self::Makes => DefinitionKind::Makes,
            Self::Models => DefinitionKind::Models,
            Self::Years => DefinitionKind::Years,
        }
    }
}

pub struct AppContext {
    pub client: CarlogClient,
    pub output: Output,
    pub prefs_file: Option<PathBuf>,
}

pub async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(resolve_output_format(&cli), cli.output.clone());
    let client = build_client(&cli)?;

    let ctx = AppContext {
        client,
        output,
        prefs_file: cli.prefs_file.clone(),
    };

    match cli.command {
        Commands::Vehicle(args) => vehicle::handle(&ctx, args).await,
        Commands::ServiceType(args) => service_type::handle(&ctx, args).await,
        Commands::Log(args) => log::handle(&ctx, args).await,
        Commands::Override(args) => interval::handle(&ctx, args).await,
        Commands::Advise(args) => report::advise(&ctx, args).await,
        Commands::Stats(args) => report::stats(&ctx, args).await,
        Commands::ExportCsv(args) => report::export_csv(&ctx, args).await,
        Commands::Backup(args) => backup::handle(&ctx, args).await,
        Commands::Health(args) => health::handle(&ctx, args).await,
        Commands::Prefs(args) => prefs::handle(&ctx, args),
        Commands::Defs(args) => defs::handle(&ctx, args).await,
    }
}

fn resolve_output_format(cli: &Cli) -> OutputFormat {
    if cli.quiet {
        OutputFormat::Quiet
    } else if cli.pretty {
        if cli.table {
            warn!("--pretty conflicts with --table. Using json pretty format");
        }
        OutputFormat::Pretty
    } else if cli.json {
        if cli.table {
            warn!("--json conflicts with --table. Using json format");
        }
        OutputFormat::Json
    } else if cli.table {
        OutputFormat::Table
    } else {
        OutputFormat::Json
    }
}

fn build_client(cli: &Cli) -> Result<CarlogClient> {
    let mut config = ClientConfig::default();
    if let Some(url) = &cli.url {
        config = config.base_url(url.trim_end_matches('/'));
    }
    Ok(CarlogClient::with_config(config)?)
}
