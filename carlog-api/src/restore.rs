//! # Restore session
//!
//! A [`RestoreSession`] walks a backup file through load, analysis, plan
//! editing, and execution:
//!
//! ```text
//! Idle --load--> Loaded --analyze--> Analyzed --execute--> Completed
//!   ^              |                   |  ^                   |
//!   +----clear-----+-------clear-------+  +--apply(action)    |
//!   +-------------------------clear---------------------------+
//! ```
//!
//! Loading a new file from any state replaces the session contents. A load
//! that fails validation leaves the session `Idle`. A failed analyze or execute
//! request leaves the state unchanged, so it can be retried without reloading.
//!
//! Network steps are split into `start_*` / `finish_*` halves so a caller can
//! run the request elsewhere and observe [`RestoreSession::is_pending`] in the
//! meantime. A result that arrives after the file was cleared or replaced is
//! ignored. [`RestoreSession::analyze`] and [`RestoreSession::execute`] run both
//! halves in one call.
//!
//! ```rust,no_run
//! use carlog::prelude::*;
//! # async fn example(client: &CarlogClient) -> Result<(), CarlogError> {
//! let mut session = RestoreSession::new();
//! session.load_file("backup.json").await?;
//! session.analyze(client).await?;
//! session.apply(RestoreAction::Resolve("JT2BF22K1W0123456".into(), ConflictAction::Replace))?;
//! if session.can_execute() {
//!     session.execute(client).await?;
//! }
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::{Result, client::CarlogClient, config::DEFAULT_BACKUP_FILE_NAME, prelude::*};

/// Stage of a restore session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum RestoreState {
    /// no file loaded
    #[default]
    Idle,
    /// a valid backup file is loaded, not yet analyzed
    Loaded,
    /// analysis returned; the plan can be edited
    Analyzed,
    /// the restore was executed
    Completed,
}

/// Plan edits, applied with [`RestoreSession::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreAction {
    /// Flip whether a new vehicle (by backup id) is added.
    ToggleAdd(i64),
    /// Set whether a new vehicle (by backup id) is added.
    SetAdd(i64, bool),
    /// Choose skip or replace for a conflicting VIN.
    Resolve(String, ConflictAction),
    /// Add every new vehicle.
    SelectAllNew,
    /// Add no new vehicles.
    SelectNoNew,
    /// Return the plan to its post-analysis defaults.
    Reset,
}

#[derive(Debug, Clone)]
struct LoadedFile {
    file_name: String,
    bytes: Bytes,
    data: FullBackupData,
}

/// Handle for an in-flight analyze request. Obtained from [`RestoreSession::start_analyze`].
#[derive(Debug, Clone)]
pub struct AnalyzeTicket {
    generation: u64,
    pub file_name: String,
    pub bytes: Bytes,
}

/// Handle for an in-flight execute request. Obtained from [`RestoreSession::start_execute`].
#[derive(Debug, Clone)]
pub struct ExecuteTicket {
    generation: u64,
    pub plan: RestorePlan,
    pub data: FullBackupData,
}

/// State of one restore workflow. Not shared across threads or sessions.
#[derive(Debug, Default)]
pub struct RestoreSession {
    state: RestoreState,
    file: Option<LoadedFile>,
    analysis: Option<BackupAnalysis>,
    plan: RestorePlan,
    pending: bool,
    // bumped whenever the file changes, so stale responses can be dropped
    generation: u64,
}

impl RestoreSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RestoreState {
        self.state
    }

    /// True while an analyze or execute request is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.file_name.as_str())
    }

    /// Parsed contents of the loaded file.
    pub fn backup(&self) -> Option<&FullBackupData> {
        self.file.as_ref().map(|f| &f.data)
    }

    pub fn analysis(&self) -> Option<&BackupAnalysis> {
        self.analysis.as_ref()
    }

    pub fn plan(&self) -> &RestorePlan {
        &self.plan
    }

    /// Execute is allowed only once analysis has returned and nothing is in flight.
    pub fn can_execute(&self) -> bool {
        self.state == RestoreState::Analyzed && !self.pending
    }

    /// Discards the file, analysis, and plan.
    pub fn clear(&mut self) {
        self.state = RestoreState::Idle;
        self.file = None;
        self.analysis = None;
        self.plan = RestorePlan::default();
        self.pending = false;
        self.generation += 1;
    }

    /// Loads a backup file from memory, replacing anything previously loaded.
    ///
    /// # Errors
    /// - [`CarlogError::CorruptBackup`] / [`CarlogError::InvalidBackup`] if the
    ///   file fails validation. The session is left `Idle`.
    pub fn load_bytes(&mut self, bytes: impl Into<Bytes>, file_name: Option<&str>) -> Result<()> {
        self.clear();
        let bytes = bytes.into();
        let data = parse_backup(&bytes)?;
        let file_name = file_name.unwrap_or(DEFAULT_BACKUP_FILE_NAME).to_string();
        debug!(
            %file_name,
            vehicles = data.vehicles.len(),
            service_types = data.service_types.len(),
            "backup loaded"
        );
        self.file = Some(LoadedFile {
            file_name,
            bytes,
            data,
        });
        self.state = RestoreState::Loaded;
        Ok(())
    }

    /// Reads and loads a backup file from disk.
    ///
    /// # Errors
    /// - [`CarlogError::Io`] if the file can't be read
    /// - see [`load_bytes`](Self::load_bytes)
    pub async fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(source) => {
                self.clear();
                return Err(CarlogError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let file_name = path.file_name().map(|n| n.to_string_lossy().to_string());
        self.load_bytes(bytes, file_name.as_deref())
    }

    /// Begins analysis of the loaded file. Re-analyzing an analyzed file is
    /// allowed and resets the plan when it returns.
    pub fn start_analyze(&mut self) -> Result<AnalyzeTicket> {
        self.ensure_not_pending("analyze")?;
        match (&self.state, &self.file) {
            (RestoreState::Loaded | RestoreState::Analyzed, Some(file)) => {
                let ticket = AnalyzeTicket {
                    generation: self.generation,
                    file_name: file.file_name.clone(),
                    bytes: file.bytes.clone(),
                };
                self.pending = true;
                Ok(ticket)
            }
            _ => Err(self.invalid("analyze")),
        }
    }

    /// Completes analysis with the backend response.
    /// On success the plan is set to its defaults: every new vehicle selected,
    /// every conflict skipped. On failure the state is unchanged.
    pub fn finish_analyze(
        &mut self,
        ticket: AnalyzeTicket,
        result: Result<BackupAnalysis>,
    ) -> Result<()> {
        if ticket.generation != self.generation {
            debug!("ignoring analysis for a file that is no longer loaded");
            return Ok(());
        }
        self.pending = false;
        let analysis = result?;
        self.plan = RestorePlan::from_analysis(&analysis);
        self.analysis = Some(analysis);
        self.state = RestoreState::Analyzed;
        Ok(())
    }

    /// Uploads the loaded file for analysis.
    pub async fn analyze(&mut self, client: &CarlogClient) -> Result<&BackupAnalysis> {
        let ticket = self.start_analyze()?;
        let result = client
            .analyze_backup(ticket.bytes.clone(), Some(&ticket.file_name))
            .await;
        if let Err(e) = &result {
            warn!(error = %e, "backup analysis failed");
        }
        self.finish_analyze(ticket, result)?;
        self.analysis.as_ref().ok_or_else(|| self.invalid("analyze"))
    }

    /// Begins execution of the current plan.
    pub fn start_execute(&mut self) -> Result<ExecuteTicket> {
        if !self.can_execute() {
            return Err(self.invalid("execute"));
        }
        let Some(file) = &self.file else {
            return Err(self.invalid("execute"));
        };
        let ticket = ExecuteTicket {
            generation: self.generation,
            plan: self.plan.clone(),
            data: file.data.clone(),
        };
        self.pending = true;
        Ok(ticket)
    }

    /// Completes execution. On failure the plan stays editable and execution
    /// can be retried.
    pub fn finish_execute(&mut self, ticket: ExecuteTicket, result: Result<()>) -> Result<()> {
        if ticket.generation != self.generation {
            debug!("ignoring restore result for a file that is no longer loaded");
            return Ok(());
        }
        self.pending = false;
        result?;
        self.state = RestoreState::Completed;
        Ok(())
    }

    /// Submits the plan with the backup contents. The client's cache is
    /// cleared on success.
    pub async fn execute(&mut self, client: &CarlogClient) -> Result<()> {
        let ticket = self.start_execute()?;
        let result = client.execute_import(&ticket.plan, &ticket.data).await;
        if let Err(e) = &result {
            warn!(error = %e, "backup restore failed");
        }
        self.finish_execute(ticket, result)
    }

    /// Applies a plan edit. Only allowed after analysis, while nothing is in flight.
    ///
    /// # Errors
    /// - [`CarlogError::InvalidState`] outside `Analyzed`
    /// - [`CarlogError::Validation`] for an id or VIN that is not part of the analysis
    pub fn apply(&mut self, action: RestoreAction) -> Result<()> {
        self.ensure_not_pending("edit plan")?;
        let Some(analysis) = self.analysis.as_ref().filter(|_| self.state == RestoreState::Analyzed)
        else {
            return Err(self.invalid("edit plan"));
        };
        let plan = &mut self.plan;
        match action {
            RestoreAction::ToggleAdd(id) => {
                ensure_new_vehicle(analysis, id)?;
                if !plan.vehicles_to_add.remove(&id) {
                    plan.vehicles_to_add.insert(id);
                }
            }
            RestoreAction::SetAdd(id, add) => {
                ensure_new_vehicle(analysis, id)?;
                if add {
                    plan.vehicles_to_add.insert(id);
                } else {
                    plan.vehicles_to_add.remove(&id);
                }
            }
            RestoreAction::Resolve(vin, action) => {
                if !analysis.conflicting_vehicles.iter().any(|c| c.vin == vin) {
                    return Err(CarlogError::validation(format!(
                        "VIN {vin} is not a conflict in this backup"
                    )));
                }
                plan.conflict_resolutions.insert(vin, action);
            }
            RestoreAction::SelectAllNew => {
                plan.vehicles_to_add = analysis
                    .new_vehicles
                    .iter()
                    .map(|v| v.id_in_backup)
                    .collect();
            }
            RestoreAction::SelectNoNew => plan.vehicles_to_add.clear(),
            RestoreAction::Reset => *plan = RestorePlan::from_analysis(analysis),
        }
        Ok(())
    }

    fn ensure_not_pending(&self, action: &str) -> Result<()> {
        if self.pending {
            return Err(CarlogError::InvalidState {
                action: action.to_string(),
                state: format!("{} (request pending)", self.state),
            });
        }
        Ok(())
    }

    fn invalid(&self, action: &str) -> CarlogError {
        CarlogError::InvalidState {
            action: action.to_string(),
            state: self.state.to_string(),
        }
    }
}

fn ensure_new_vehicle(analysis: &BackupAnalysis, id: i64) -> Result<()> {
    if analysis.new_vehicles.iter().any(|v| v.id_in_backup == id) {
        Ok(())
    } else {
        Err(CarlogError::validation(format!(
            "vehicle {id} is not a new vehicle in this backup"
        )))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn backup_bytes() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "metadata": {"export_date_utc": "2024-06-01T10:00:00Z", "config_used": {}},
            "service_types": [],
            "vehicles": [
                {"id": 1, "make": "Toyota", "model": "Corolla", "vin": "VIN1"},
                {"id": 2, "make": "Ford", "model": "Focus", "vin": "VIN2"},
                {"id": 3, "make": "Honda", "model": "Jazz", "vin": null}
            ]
        }))
        .unwrap()
    }

    fn analysis() -> BackupAnalysis {
        serde_json::from_value(json!({
            "new_vehicles": [
                {"id_in_backup": 2, "make": "Ford", "model": "Focus", "vin": "VIN2", "log_count": 1},
                {"id_in_backup": 3, "make": "Honda", "model": "Jazz", "log_count": 0}
            ],
            "conflicting_vehicles": [
                {"vin": "VIN1", "backup_vehicle": {"make": "Toyota"}, "existing_vehicle_id": 10}
            ]
        }))
        .unwrap()
    }

    fn analyzed_session() -> RestoreSession {
        let mut session = RestoreSession::new();
        session.load_bytes(backup_bytes(), Some("cars.json")).unwrap();
        let ticket = session.start_analyze().unwrap();
        session.finish_analyze(ticket, Ok(analysis())).unwrap();
        session
    }

    #[test]
    fn test_load_valid_file() {
        let mut session = RestoreSession::new();
        session.load_bytes(backup_bytes(), None).unwrap();
        assert_eq!(session.state(), RestoreState::Loaded);
        assert_eq!(session.file_name(), Some("backup.json"));
        assert_eq!(session.backup().unwrap().vehicles.len(), 3);
        assert!(!session.can_execute());
    }

    #[test]
    fn test_load_corrupt_file_stays_idle() {
        let mut session = analyzed_session();
        let err = session.load_bytes(&b"not json"[..], None).unwrap_err();
        assert!(matches!(err, CarlogError::CorruptBackup { .. }));
        assert_eq!(session.state(), RestoreState::Idle);
        assert!(session.analysis().is_none());
        assert!(session.plan().vehicles_to_add.is_empty());

        let err = session
            .load_bytes(&br#"{"metadata": {}, "vehicles": []}"#[..], None)
            .unwrap_err();
        assert!(matches!(err, CarlogError::InvalidBackup { .. }));
        assert_eq!(session.state(), RestoreState::Idle);
    }

    #[test]
    fn test_analysis_sets_default_plan() {
        let session = analyzed_session();
        assert_eq!(session.state(), RestoreState::Analyzed);
        let plan = session.plan();
        assert!(plan.is_selected(2));
        assert!(plan.is_selected(3));
        assert_eq!(plan.action_for("VIN1"), Some(ConflictAction::Skip));
        assert!(session.can_execute());
    }

    #[test]
    fn test_replace_then_skip_restores_default() {
        let mut session = analyzed_session();
        let default_plan = session.plan().clone();
        session
            .apply(RestoreAction::Resolve("VIN1".into(), ConflictAction::Replace))
            .unwrap();
        assert_ne!(session.plan(), &default_plan);
        session
            .apply(RestoreAction::Resolve("VIN1".into(), ConflictAction::Skip))
            .unwrap();
        assert_eq!(session.plan(), &default_plan);
    }

    #[test]
    fn test_toggle_add_twice_is_identity() {
        let mut session = analyzed_session();
        let default_plan = session.plan().clone();
        session.apply(RestoreAction::ToggleAdd(3)).unwrap();
        assert!(!session.plan().is_selected(3));
        session.apply(RestoreAction::ToggleAdd(3)).unwrap();
        assert_eq!(session.plan(), &default_plan);
    }

    #[test]
    fn test_select_all_none_and_reset() {
        let mut session = analyzed_session();
        let default_plan = session.plan().clone();
        session.apply(RestoreAction::SelectNoNew).unwrap();
        assert!(session.plan().vehicles_to_add.is_empty());
        session.apply(RestoreAction::SetAdd(2, true)).unwrap();
        assert_eq!(session.plan().vehicles_to_add.len(), 1);
        session.apply(RestoreAction::SelectAllNew).unwrap();
        assert_eq!(session.plan().vehicles_to_add.len(), 2);
        session
            .apply(RestoreAction::Resolve("VIN1".into(), ConflictAction::Replace))
            .unwrap();
        session.apply(RestoreAction::Reset).unwrap();
        assert_eq!(session.plan(), &default_plan);
    }

    #[test]
    fn test_unknown_ids_rejected() {
        let mut session = analyzed_session();
        assert!(matches!(
            session.apply(RestoreAction::ToggleAdd(99)),
            Err(CarlogError::Validation { .. })
        ));
        assert!(matches!(
            session.apply(RestoreAction::Resolve("NOPE".into(), ConflictAction::Replace)),
            Err(CarlogError::Validation { .. })
        ));
    }

    #[test]
    fn test_actions_require_analysis() {
        let mut session = RestoreSession::new();
        assert!(matches!(
            session.apply(RestoreAction::SelectAllNew),
            Err(CarlogError::InvalidState { .. })
        ));
        assert!(session.start_analyze().is_err());
        session.load_bytes(backup_bytes(), None).unwrap();
        assert!(session.start_execute().is_err());
        assert!(matches!(
            session.apply(RestoreAction::ToggleAdd(2)),
            Err(CarlogError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_failed_analysis_keeps_state() {
        let mut session = RestoreSession::new();
        session.load_bytes(backup_bytes(), None).unwrap();
        let ticket = session.start_analyze().unwrap();
        assert!(session.is_pending());
        assert!(session.start_analyze().is_err(), "already pending");
        let err = session
            .finish_analyze(ticket, Err(CarlogError::TooManyRetries { n: 4 }))
            .unwrap_err();
        assert!(matches!(err, CarlogError::TooManyRetries { .. }));
        assert_eq!(session.state(), RestoreState::Loaded);
        assert!(!session.is_pending());
        // retry without reloading
        let ticket = session.start_analyze().unwrap();
        session.finish_analyze(ticket, Ok(analysis())).unwrap();
        assert_eq!(session.state(), RestoreState::Analyzed);
    }

    #[test]
    fn test_stale_analysis_ignored_after_clear() {
        let mut session = RestoreSession::new();
        session.load_bytes(backup_bytes(), None).unwrap();
        let ticket = session.start_analyze().unwrap();
        session.clear();
        session.finish_analyze(ticket, Ok(analysis())).unwrap();
        assert_eq!(session.state(), RestoreState::Idle);
        assert!(session.analysis().is_none());
    }

    #[test]
    fn test_execute_flow() {
        let mut session = analyzed_session();
        session.apply(RestoreAction::ToggleAdd(2)).unwrap();
        let ticket = session.start_execute().unwrap();
        assert!(!session.can_execute());
        assert!(session.apply(RestoreAction::SelectAllNew).is_err());
        assert!(!ticket.plan.is_selected(2));
        assert_eq!(ticket.data.vehicles.len(), 3);

        // failure keeps plan editable
        session
            .finish_execute(ticket, Err(CarlogError::validation("bad plan")))
            .unwrap_err();
        assert_eq!(session.state(), RestoreState::Analyzed);
        assert!(session.can_execute());

        let ticket = session.start_execute().unwrap();
        session.finish_execute(ticket, Ok(())).unwrap();
        assert_eq!(session.state(), RestoreState::Completed);
        assert!(!session.can_execute());

        session.clear();
        assert_eq!(session.state(), RestoreState::Idle);
    }
}
