/*
 * carlog - vehicle maintenance api client
 *
 * SPDX-FileCopyrightText: 2025-2026 Carlog contributors
 * SPDX-License-Identifier: Apache-2.0
 */
//! # Carlog Rust API Client
//!
//! A typed client for the carlog vehicle maintenance backend, plus the
//! client-side logic that sits on top of it.
//!
//! ## Features
//!
//! - vehicles, service types, maintenance logs, custom fields, interval overrides
//! - upcoming-maintenance advisor (Overdue / Upcoming / NeverDone)
//! - backup export, analysis, and a restore session with an editable plan
//! - vehicle statistics and CSV export of log history
//! - backend liveness probing with backoff and cancellation
//! - http pipeline with retries, logging, and metrics
//! - cache for vehicle and service type lists with explicit invalidation
//! - preferences persisted through a pluggable key-value store
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use carlog::prelude::*;
//! # async fn example() -> Result<(), CarlogError> {
//!
//! let client = CarlogClient::with_config(ClientConfig::default())?;
//!
//! let vehicles = client.vehicles().list().await?;
//! let service_types = client.service_types().list().await?;
//!
//! for vehicle in &vehicles {
//!     let logs = client.vehicle_logs(vehicle.id).list().await?;
//!     let summaries = client.maintenance_summary(vehicle.id).await?;
//!     let today = chrono::Local::now().date_naive();
//!     let stats = VehicleStats::compute(vehicle, &logs, today);
//!     let items = build_advisory(vehicle, stats.current_mileage, &summaries, &service_types, today);
//!     for item in &items {
//!         println!("{} {}: {}", vehicle.display_name(), item.service_type_name, item.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API Structure
//!
//! Methods on `CarlogClient` return request builders that are configured with
//! chained method calls and then executed with a terminal method like
//! `get()`, `create()`, `update()`, `delete()`, or `list()`.
//!
//! ```rust,no_run
//! use carlog::prelude::*;
//! # async fn example(client: &CarlogClient) -> Result<(), CarlogError> {
//! let vehicle = client.new_vehicle("Toyota", "Corolla")
//!     .year(2019)
//!     .vin("JT2BF22K1W0123456")
//!     .create().await?;
//!
//! let vehicle = client.update_vehicle(vehicle.id)
//!     .initial_mileage(42_000)
//!     .update().await?;
//!
//! client.vehicle(vehicle.id).delete().await?;
//! # Ok(())
//! # }
//! ```
//!
//#![warn(clippy::pedantic)] // experimental
//#![warn(clippy::nursery)] // experimental
#![allow(clippy::missing_errors_doc)] // pedantic
#![allow(clippy::missing_const_for_fn)] //  nursery function
#![allow(clippy::must_use_candidate)] // pedantic
#![warn(clippy::default_trait_access)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::implicit_clone)]
#![warn(clippy::match_same_arms)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::redundant_closure)]
#![warn(clippy::uninlined_format_args)]
#![warn(clippy::unused_async)]

pub mod advisory;
pub mod backup;
pub mod cache;
pub mod client;
pub mod csv_export;
pub mod definitions;
pub mod error;
pub mod health;
mod http_client;
pub mod logs;
pub mod prefs;
pub mod restore;
pub mod service_types;
pub mod stats;
pub mod validation;
pub mod vehicles;

/// Result type alias using `CarlogError` as the default error.
pub type Result<T, E = crate::error::CarlogError> = std::result::Result<T, E>;

/// Prelude module - import (nearly) all the things with `use carlog::prelude::*;`
pub mod prelude {
    pub use super::CARLOG_DEFAULT_URL;
    // Error types
    pub use crate::error::*;
    pub use crate::{
        // Advisory engine
        advisory::{
            AdvisoryItem, AdvisoryStatus, DateDue, DueStatus, EffectiveInterval, LastPerformed,
            MileageDue, UPCOMING_THRESHOLD_DAYS, UPCOMING_THRESHOLD_KM, build_advisory,
            compute_due_status, resolve_interval,
        },
        // Backup and restore
        backup::{
            BackupAnalysis, BackupConfiguration, BackupMetadata, ConflictAction,
            ConflictResolution, ConflictingVehicle, FullBackupData, NewVehicleEntry, RestorePlan,
            parse_backup,
        },
        cache::CarlogCache,
        client::{CarlogClient, ClientConfig},
        csv_export::logs_to_csv,
        definitions::DefinitionKind,
        health::ProbeConfig,
        // HTTP metrics
        http_client::HttpMetricsSnapshot,
        logs::{CustomFieldValue, CustomFieldValueInput, MaintenanceLog, ServiceTypeLogSummary},
        prefs::{AppPreferences, FilePrefStore, MemoryPrefStore, PrefStore},
        restore::{RestoreAction, RestoreSession, RestoreState},
        service_types::{CustomField, CustomFieldInput, CustomFieldType, ServiceType},
        stats::{CostShare, VehicleStats, cost_breakdown},
        validation::ValidationLimits,
        vehicles::{ClearOutcome, IntervalOverride, Vehicle},
    };
}

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default backend endpoint (local backend process)
pub const CARLOG_DEFAULT_URL: &str = "http://localhost:8000";

pub(crate) mod config {
    /// Environment variable for default endpoint URL
    pub const CARLOG_URL_ENV: &str = "CARLOG_URL";

    /// Environment variable for the preferences file path
    pub const CARLOG_PREFS_FILE_ENV: &str = "CARLOG_PREFS_FILE";

    /// Config subdirectory for the preferences file
    pub const DEFAULT_CONFIG_DIR: &str = "carlog";

    /// Preferences file name
    pub const DEFAULT_PREFS_FILE: &str = "preferences.json";

    /// Max retries for HTTP client
    pub const MAX_RETRIES: u32 = 3;

    /// Default per-request timeout (seconds)
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Multipart field name for backup analysis uploads
    pub const BACKUP_UPLOAD_FIELD: &str = "backup_file";

    /// File name sent with backup uploads when none is known
    pub const DEFAULT_BACKUP_FILE_NAME: &str = "backup.json";

    // Validation limits
    pub const VALIDATION_NAME_MAX_LEN: u32 = 255;
    pub const VALIDATION_VIN_MAX_LEN: u32 = 17;
    pub const VALIDATION_NOTES_MAX_LEN: u32 = 64 * 1024;
    pub const VALIDATION_MAX_FIELDS: u32 = 100;
}
