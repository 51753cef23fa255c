//! # Backup and restore
//!
//! Backups are JSON documents produced by the backend's export endpoint.
//! Restoring is a three step exchange:
//!
//! 1. [`parse_backup`] checks the file locally,
//! 2. [`CarlogClient::analyze_backup`] uploads it and gets back which vehicles
//!    are new and which collide (by VIN) with existing vehicles,
//! 3. [`CarlogClient::execute_import`] submits a [`RestorePlan`] together with
//!    the backup contents.
//!
//! [`RestoreSession`](crate::restore::RestoreSession) drives these steps as a
//! state machine.
//!
//! ```rust,no_run
//! use carlog::prelude::*;
//! # async fn example(client: &CarlogClient) -> Result<(), CarlogError> {
//! let bytes = client
//!     .export_backup(&BackupConfiguration::default().include_maintenance_logs(true))
//!     .await?;
//! let data = parse_backup(&bytes)?;
//! let analysis = client.analyze_backup(bytes.clone(), None).await?;
//! let plan = RestorePlan::from_analysis(&analysis);
//! client.execute_import(&plan, &data).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Result,
    client::CarlogClient,
    config::{BACKUP_UPLOAD_FIELD, DEFAULT_BACKUP_FILE_NAME},
    prelude::*,
};

/// Top-level keys every backup file must have.
pub const REQUIRED_BACKUP_KEYS: [&str; 3] = ["metadata", "vehicles", "service_types"];

/// Selects what goes into a backup export. Unset fields use backend defaults
/// (all vehicles, all dates, logs included).
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct BackupConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_ids: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_maintenance_logs: Option<bool>,
}

impl BackupConfiguration {
    pub fn vehicle_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.vehicle_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn include_maintenance_logs(mut self, include: bool) -> Self {
        self.include_maintenance_logs = Some(include);
        self
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BackupMetadata {
    /// Export timestamp as written by the backend (ISO 8601, UTC)
    pub export_date_utc: String,

    #[serde(default)]
    pub config_used: BackupConfiguration,
}

/// Contents of a backup file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FullBackupData {
    pub metadata: BackupMetadata,
    pub service_types: Vec<ServiceType>,
    pub vehicles: Vec<Vehicle>,
}

impl FullBackupData {
    /// Total number of logs across all vehicles in the backup
    pub fn log_count(&self) -> usize {
        self.vehicles.iter().map(|v| v.maintenance_logs.len()).sum()
    }

    /// VINs of backed-up vehicles that have one
    pub fn vins(&self) -> Vec<&str> {
        self.vehicles
            .iter()
            .filter_map(|v| v.vin.as_deref())
            .filter(|vin| !vin.is_empty())
            .collect()
    }
}

/// Parses and checks a backup file.
///
/// # Errors
/// - [`CarlogError::CorruptBackup`] if the bytes are not valid JSON
/// - [`CarlogError::InvalidBackup`] if the JSON is not an object with
///   `metadata`, `vehicles`, and `service_types`, or their contents do not
///   have the expected shape
pub fn parse_backup(bytes: &[u8]) -> Result<FullBackupData> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|source| CarlogError::CorruptBackup { source })?;

    let Some(object) = value.as_object() else {
        return Err(CarlogError::InvalidBackup {
            message: "backup file must contain a JSON object".into(),
        });
    };
    let missing: Vec<&str> = REQUIRED_BACKUP_KEYS
        .into_iter()
        .filter(|key| !object.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(CarlogError::InvalidBackup {
            message: format!("missing required keys: {}", missing.join(", ")),
        });
    }

    serde_path_to_error::deserialize(value).map_err(|err| CarlogError::InvalidBackup {
        message: format!("at {}: {}", err.path(), err.inner()),
    })
}

/// A vehicle in the backup with no VIN match among existing vehicles.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct NewVehicleEntry {
    pub id_in_backup: i64,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub vin: Option<String>,
    #[serde(default)]
    pub log_count: i64,
}

impl NewVehicleEntry {
    pub fn display_name(&self) -> String {
        match self.year {
            Some(year) => format!("{year} {} {}", self.make, self.model),
            None => format!("{} {}", self.make, self.model),
        }
    }
}

/// A vehicle in the backup whose VIN matches an existing vehicle.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConflictingVehicle {
    pub vin: String,

    /// The vehicle as stored in the backup
    pub backup_vehicle: serde_json::Value,

    pub existing_vehicle_id: i64,
}

impl ConflictingVehicle {
    /// "make model" of the backed-up vehicle, or the VIN if those are missing.
    pub fn display_name(&self) -> String {
        let field = |name: &str| self.backup_vehicle.get(name).and_then(|v| v.as_str());
        match (field("make"), field("model")) {
            (Some(make), Some(model)) => format!("{make} {model}"),
            _ => self.vin.clone(),
        }
    }
}

/// Backend classification of a backup's vehicles.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct BackupAnalysis {
    #[serde(default)]
    pub new_vehicles: Vec<NewVehicleEntry>,

    #[serde(default)]
    pub conflicting_vehicles: Vec<ConflictingVehicle>,
}

/// What to do with a backed-up vehicle whose VIN already exists.
#[derive(
    Debug,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ConflictAction {
    /// keep the existing vehicle untouched
    #[default]
    Skip,
    /// overwrite the existing vehicle with the backed-up one
    Replace,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ConflictResolution {
    pub vin: String,
    pub action: ConflictAction,
}

/// Decisions submitted with a restore: which new vehicles to add (by backup id),
/// and the action for each conflicting VIN.
///
/// Sets and maps are ordered, so two plans with the same decisions compare equal
/// regardless of the order the decisions were made in.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(from = "RestorePlanWire", into = "RestorePlanWire")]
pub struct RestorePlan {
    pub vehicles_to_add: BTreeSet<i64>,
    pub conflict_resolutions: BTreeMap<String, ConflictAction>,
}

#[derive(Deserialize, Serialize, Clone)]
struct RestorePlanWire {
    vehicles_to_add: Vec<i64>,
    conflict_resolutions: Vec<ConflictResolution>,
}

impl From<RestorePlan> for RestorePlanWire {
    fn from(plan: RestorePlan) -> Self {
        Self {
            vehicles_to_add: plan.vehicles_to_add.into_iter().collect(),
            conflict_resolutions: plan
                .conflict_resolutions
                .into_iter()
                .map(|(vin, action)| ConflictResolution { vin, action })
                .collect(),
        }
    }
}

impl From<RestorePlanWire> for RestorePlan {
    fn from(wire: RestorePlanWire) -> Self {
        Self {
            vehicles_to_add: wire.vehicles_to_add.into_iter().collect(),
            conflict_resolutions: wire
                .conflict_resolutions
                .into_iter()
                .map(|r| (r.vin, r.action))
                .collect(),
        }
    }
}

impl RestorePlan {
    /// Default plan for an analysis: add every new vehicle, skip every conflict.
    pub fn from_analysis(analysis: &BackupAnalysis) -> Self {
        Self {
            vehicles_to_add: analysis
                .new_vehicles
                .iter()
                .map(|v| v.id_in_backup)
                .collect(),
            conflict_resolutions: analysis
                .conflicting_vehicles
                .iter()
                .map(|c| (c.vin.clone(), ConflictAction::Skip))
                .collect(),
        }
    }

    pub fn is_selected(&self, id_in_backup: i64) -> bool {
        self.vehicles_to_add.contains(&id_in_backup)
    }

    pub fn action_for(&self, vin: &str) -> Option<ConflictAction> {
        self.conflict_resolutions.get(vin).copied()
    }

    /// Number of conflicts that will overwrite an existing vehicle
    pub fn replace_count(&self) -> usize {
        self.conflict_resolutions
            .values()
            .filter(|a| **a == ConflictAction::Replace)
            .count()
    }

    /// True if executing the plan would change nothing.
    pub fn is_noop(&self) -> bool {
        self.vehicles_to_add.is_empty() && self.replace_count() == 0
    }
}

#[derive(Serialize)]
struct ExecuteImportRequestBody<'a> {
    plan: &'a RestorePlan,
    backup_data: &'a FullBackupData,
}

impl CarlogClient {
    /// Exports a backup. Returns the raw JSON document, ready to be written to a file.
    ///
    /// # Errors
    /// - [`CarlogError::Validation`] if `start_date` is after `end_date`
    pub async fn export_backup(&self, config: &BackupConfiguration) -> Result<Bytes> {
        self.limits()
            .validate_date_range(config.start_date, config.end_date)?;
        let bytes = self.client.post_for_bytes("/backup/export", config).await?;
        debug!(bytes = bytes.len(), "backup exported");
        Ok(bytes)
    }

    /// Uploads a backup file for analysis. Nothing is changed on the backend.
    /// `file_name` defaults to `backup.json`.
    pub async fn analyze_backup(
        &self,
        data: Bytes,
        file_name: Option<&str>,
    ) -> Result<BackupAnalysis> {
        let file_name = file_name.unwrap_or(DEFAULT_BACKUP_FILE_NAME);
        let analysis: BackupAnalysis = self
            .client
            .post_upload("/backup/analyze", BACKUP_UPLOAD_FIELD, file_name, data)
            .await?;
        debug!(
            new = analysis.new_vehicles.len(),
            conflicts = analysis.conflicting_vehicles.len(),
            "backup analyzed"
        );
        Ok(analysis)
    }

    /// Executes a restore. On success every cached list is dropped, since any of
    /// them may now be stale.
    pub async fn execute_import(&self, plan: &RestorePlan, backup_data: &FullBackupData) -> Result<()> {
        let body = ExecuteImportRequestBody { plan, backup_data };
        self.client
            .post_no_content("/backup/execute_import", &body)
            .await?;
        self.cache.clear();
        info!(
            added = plan.vehicles_to_add.len(),
            replaced = plan.replace_count(),
            "backup restored"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_backup() -> serde_json::Value {
        json!({
            "metadata": {
                "export_date_utc": "2024-06-01T10:00:00Z",
                "config_used": {"include_maintenance_logs": true}
            },
            "service_types": [
                {"id": 1, "name": "Oil change", "recommended_interval_km": 10000,
                 "recommended_interval_days": 365, "fields": []}
            ],
            "vehicles": [
                {"id": 5, "make": "Toyota", "model": "Corolla", "year": 2019,
                 "vin": "JT2BF22K1W0123456", "initial_mileage": 40000,
                 "acquisition_date": "2021-02-01",
                 "maintenance_logs": [
                    {"id": 1, "vehicle_id": 5, "date": "2024-01-05", "mileage": 50000,
                     "cost": 80.0, "notes": null, "service_type_id": 1, "service_type": null,
                     "custom_field_values": []}
                 ],
                 "interval_overrides": []}
            ]
        })
    }

    fn sample_analysis() -> BackupAnalysis {
        serde_json::from_value(json!({
            "new_vehicles": [
                {"id_in_backup": 5, "make": "Toyota", "model": "Corolla", "year": 2019,
                 "vin": null, "log_count": 3},
                {"id_in_backup": 8, "make": "Ford", "model": "Focus", "log_count": 0}
            ],
            "conflicting_vehicles": [
                {"vin": "VIN1", "backup_vehicle": {"make": "Honda", "model": "Civic"},
                 "existing_vehicle_id": 2}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_backup_ok() {
        let bytes = serde_json::to_vec(&sample_backup()).unwrap();
        let data = parse_backup(&bytes).unwrap();
        assert_eq!(data.vehicles.len(), 1);
        assert_eq!(data.log_count(), 1);
        assert_eq!(data.vins(), vec!["JT2BF22K1W0123456"]);
        assert_eq!(data.metadata.config_used.include_maintenance_logs, Some(true));
    }

    #[test]
    fn test_parse_backup_corrupt() {
        let err = parse_backup(b"{\"metadata\": ").unwrap_err();
        assert!(matches!(err, CarlogError::CorruptBackup { .. }));
        assert!(err.is_bad_backup_file());
    }

    #[test]
    fn test_parse_backup_missing_keys() {
        let err = parse_backup(br#"{"metadata": {"export_date_utc": "x"}}"#).unwrap_err();
        match err {
            CarlogError::InvalidBackup { message } => {
                assert!(message.contains("vehicles"), "{message}");
                assert!(message.contains("service_types"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
        let err = parse_backup(b"[1,2,3]").unwrap_err();
        assert!(matches!(err, CarlogError::InvalidBackup { .. }));
    }

    #[test]
    fn test_parse_backup_bad_shape() {
        let mut value = sample_backup();
        value["vehicles"][0]["make"] = json!(42);
        let bytes = serde_json::to_vec(&value).unwrap();
        let err = parse_backup(&bytes).unwrap_err();
        match err {
            CarlogError::InvalidBackup { message } => {
                assert!(message.contains("vehicles[0].make"), "{message}")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_plan_defaults() {
        let plan = RestorePlan::from_analysis(&sample_analysis());
        assert!(plan.is_selected(5));
        assert!(plan.is_selected(8));
        assert_eq!(plan.action_for("VIN1"), Some(ConflictAction::Skip));
        assert_eq!(plan.replace_count(), 0);
        assert!(!plan.is_noop());
    }

    #[test]
    fn test_plan_wire_format() {
        let mut plan = RestorePlan::from_analysis(&sample_analysis());
        plan.conflict_resolutions
            .insert("VIN1".into(), ConflictAction::Replace);
        assert_eq!(
            serde_json::to_value(&plan).unwrap(),
            json!({
                "vehicles_to_add": [5, 8],
                "conflict_resolutions": [{"vin": "VIN1", "action": "replace"}]
            })
        );
        let back: RestorePlan = serde_json::from_value(serde_json::to_value(&plan).unwrap()).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn test_conflict_display_name() {
        let analysis = sample_analysis();
        assert_eq!(analysis.conflicting_vehicles[0].display_name(), "Honda Civic");
        let bare = ConflictingVehicle {
            vin: "VIN9".into(),
            backup_vehicle: json!({}),
            existing_vehicle_id: 1,
        };
        assert_eq!(bare.display_name(), "VIN9");
        assert_eq!(analysis.new_vehicles[1].display_name(), "Ford Focus");
    }

    #[test]
    fn test_backup_configuration_serialization() {
        let config = BackupConfiguration::default()
            .vehicle_ids([1, 2])
            .start_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({"vehicle_ids": [1, 2], "start_date": "2024-01-01"})
        );
        assert_eq!(
            serde_json::to_string(&BackupConfiguration::default()).unwrap(),
            "{}"
        );
    }
}
