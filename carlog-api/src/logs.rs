//! # Maintenance Logs
//!
//! A maintenance log records one completed service: date, odometer reading,
//! cost, notes, and values for the service type's custom fields.
//!
//! ## Log methods on CarlogClient
//!
//! - [vehicle_logs](CarlogClient::vehicle_logs) - list a vehicle's logs, optionally for one service type
//! - [new_log](CarlogClient::new_log) - record a log for a vehicle
//! - [maintenance_log](CarlogClient::maintenance_log) - get or delete a log
//! - [update_log](CarlogClient::update_log) - update a log
//! - [maintenance_summary](CarlogClient::maintenance_summary) - per service type
//!   totals and last-performed date/mileage for a vehicle
//!
//! ```rust,no_run
//! use carlog::prelude::*;
//! use chrono::NaiveDate;
//!
//! # async fn example(client: &CarlogClient) -> Result<(), CarlogError> {
//! let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
//! let log = client.new_log(3, date, 61_250)
//!     .service_type(1)
//!     .cost(79.90)
//!     .notes("synthetic 5W-30")
//!     .custom_value(4, "Castrol")
//!     .create().await?;
//!
//! let oil_changes = client.vehicle_logs(3).service_type(1).list().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Result,
    cache::CarlogCache,
    client::CarlogClient,
    http_client::HttpClient,
    prelude::*,
};

/// A maintenance log, as returned by the backend.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MaintenanceLog {
    pub id: i64,

    pub vehicle_id: i64,

    pub date: NaiveDate,

    /// Odometer reading in km
    pub mileage: i64,

    pub cost: f64,

    pub notes: Option<String>,

    /// `None` if the service type was deleted after the log was recorded
    pub service_type_id: Option<i64>,

    pub service_type: Option<ServiceType>,

    #[serde(default)]
    pub custom_field_values: Vec<CustomFieldValue>,
}

impl MaintenanceLog {
    /// Name of the log's service type, if it still has one.
    pub fn service_type_name(&self) -> Option<&str> {
        self.service_type.as_ref().map(|st| st.name.as_str())
    }

    /// Value recorded for the custom field with this name.
    pub fn custom_value(&self, field_name: &str) -> Option<&str> {
        self.custom_field_values
            .iter()
            .find(|v| v.field_name() == Some(field_name))
            .map(|v| v.value.as_str())
    }
}

/// A recorded value for a custom field.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CustomFieldValue {
    #[serde(default)]
    pub id: i64,

    pub field_id: i64,

    /// Values of every field type travel as strings.
    pub value: String,

    pub custom_field: Option<CustomField>,
}

impl CustomFieldValue {
    pub fn field_name(&self) -> Option<&str> {
        self.custom_field.as_ref().map(|f| f.name.as_str())
    }
}

/// A custom field value sent with a new or updated log.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CustomFieldValueInput {
    pub field_id: i64,
    pub value: String,
}

impl CustomFieldValueInput {
    pub fn new(field_id: i64, value: impl Into<String>) -> Self {
        Self {
            field_id,
            value: value.into(),
        }
    }
}

/// Per service type aggregate of a vehicle's logs, computed by the backend.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServiceTypeLogSummary {
    pub service_type_id: i64,
    pub service_type_name: String,
    pub log_count: i64,
    pub last_log_date: Option<NaiveDate>,
    pub last_log_mileage: Option<i64>,
    pub total_cost_for_service_type: f64,
}

// ============================================================================
// REQUEST BODY TYPES (internal)
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateLogRequestBody {
    date: NaiveDate,
    mileage: i64,
    cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_type_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    custom_field_values: Vec<CustomFieldValueInput>,
}

#[derive(Debug, Serialize, Default)]
struct UpdateLogRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mileage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_type_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_field_values: Option<Vec<CustomFieldValueInput>>,
}

impl UpdateLogRequestBody {
    fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.mileage.is_none()
            && self.cost.is_none()
            && self.notes.is_none()
            && self.service_type_id.is_none()
            && self.custom_field_values.is_none()
    }
}

// ============================================================================
// BUILDER STRUCTS (public)
// ============================================================================

/// Request builder for a single log.
///
/// Obtained via [`CarlogClient::maintenance_log`].
#[derive(Debug)]
pub struct LogRequest {
    client: Arc<HttpClient>,
    cache: Arc<CarlogCache>,
    log_id: i64,
}

impl LogRequest {
    pub(crate) fn new(client: Arc<HttpClient>, cache: Arc<CarlogCache>, log_id: i64) -> Self {
        Self {
            client,
            cache,
            log_id,
        }
    }

    /// Retrieves the log by id.
    pub async fn get(self) -> Result<MaintenanceLog> {
        self.client
            .get_request(&format!("/maintenance_logs/{}", self.log_id), Vec::new())
            .await
    }

    /// Deletes the log.
    pub async fn delete(self) -> Result<()> {
        self.client
            .delete_request(&format!("/maintenance_logs/{}", self.log_id))
            .await?;
        // owning vehicle is unknown here
        self.cache.clear_vehicles();
        self.cache.clear_summaries(None);
        Ok(())
    }
}

/// Request builder for recording a log.
///
/// Obtained via [`CarlogClient::new_log`].
#[derive(Debug)]
pub struct NewLogRequest {
    client: Arc<HttpClient>,
    cache: Arc<CarlogCache>,
    limits: ValidationLimits,
    vehicle_id: i64,
    body: CreateLogRequestBody,
}

impl NewLogRequest {
    pub(crate) fn new(
        client: Arc<HttpClient>,
        cache: Arc<CarlogCache>,
        limits: ValidationLimits,
        vehicle_id: i64,
        date: NaiveDate,
        mileage: i64,
    ) -> Self {
        Self {
            client,
            cache,
            limits,
            vehicle_id,
            body: CreateLogRequestBody {
                date,
                mileage,
                cost: 0.0,
                notes: None,
                service_type_id: None,
                custom_field_values: Vec::new(),
            },
        }
    }

    pub fn cost(mut self, cost: f64) -> Self {
        self.body.cost = cost;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.body.notes = Some(notes.into());
        self
    }

    pub fn service_type(mut self, service_type_id: i64) -> Self {
        self.body.service_type_id = Some(service_type_id);
        self
    }

    /// Adds a value for one of the service type's custom fields.
    pub fn custom_value(mut self, field_id: i64, value: impl Into<String>) -> Self {
        self.body
            .custom_field_values
            .push(CustomFieldValueInput::new(field_id, value));
        self
    }

    pub fn custom_values(mut self, values: impl IntoIterator<Item = CustomFieldValueInput>) -> Self {
        self.body.custom_field_values.extend(values);
        self
    }

    /// Records the log.
    ///
    /// # Errors
    /// - [`CarlogError::Validation`] for negative mileage or cost, oversized notes,
    ///   or a backend rejection
    pub async fn create(self) -> Result<MaintenanceLog> {
        self.limits
            .validate_non_negative(self.body.mileage as f64, "mileage")?;
        self.limits.validate_non_negative(self.body.cost, "cost")?;
        if let Some(notes) = &self.body.notes {
            self.limits.validate_notes(notes)?;
        }
        self.limits
            .validate_num_fields(self.body.custom_field_values.len(), "log")?;

        let log: MaintenanceLog = self
            .client
            .post_request(&format!("/vehicles/{}/logs/", self.vehicle_id), &self.body)
            .await?;
        debug!(id = log.id, vehicle_id = self.vehicle_id, "log created");
        self.cache.invalidate_vehicle(self.vehicle_id);
        Ok(log)
    }
}

/// Request builder for updating a log. Only fields that are set are sent.
///
/// Obtained via [`CarlogClient::update_log`].
#[derive(Debug)]
pub struct UpdateLogRequest {
    client: Arc<HttpClient>,
    cache: Arc<CarlogCache>,
    limits: ValidationLimits,
    log_id: i64,
    body: UpdateLogRequestBody,
}

impl UpdateLogRequest {
    pub(crate) fn new(
        client: Arc<HttpClient>,
        cache: Arc<CarlogCache>,
        limits: ValidationLimits,
        log_id: i64,
    ) -> Self {
        Self {
            client,
            cache,
            limits,
            log_id,
            body: UpdateLogRequestBody::default(),
        }
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.body.date = Some(date);
        self
    }

    pub fn mileage(mut self, mileage: i64) -> Self {
        self.body.mileage = Some(mileage);
        self
    }

    pub fn cost(mut self, cost: f64) -> Self {
        self.body.cost = Some(cost);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.body.notes = Some(notes.into());
        self
    }

    pub fn service_type(mut self, service_type_id: i64) -> Self {
        self.body.service_type_id = Some(service_type_id);
        self
    }

    /// Replaces all custom field values.
    pub fn custom_values(mut self, values: impl IntoIterator<Item = CustomFieldValueInput>) -> Self {
        self.body.custom_field_values = Some(values.into_iter().collect());
        self
    }

    /// Applies the update.
    ///
    /// # Errors
    /// - [`CarlogError::Validation`] if no field was set, or a field is invalid
    /// - [`CarlogError::NotFound`] if the log doesn't exist
    pub async fn update(self) -> Result<MaintenanceLog> {
        if self.body.is_empty() {
            return Err(CarlogError::validation(
                "update_log: must set at least one field to update",
            ));
        }
        if let Some(mileage) = self.body.mileage {
            self.limits.validate_non_negative(mileage as f64, "mileage")?;
        }
        if let Some(cost) = self.body.cost {
            self.limits.validate_non_negative(cost, "cost")?;
        }
        if let Some(notes) = &self.body.notes {
            self.limits.validate_notes(notes)?;
        }

        let log: MaintenanceLog = self
            .client
            .put_request(&format!("/maintenance_logs/{}", self.log_id), &self.body)
            .await?;
        self.cache.invalidate_vehicle(log.vehicle_id);
        Ok(log)
    }
}

/// Request builder for listing a vehicle's logs.
///
/// Obtained via [`CarlogClient::vehicle_logs`].
#[derive(Debug)]
pub struct ListLogsRequest {
    client: Arc<HttpClient>,
    vehicle_id: i64,
    service_type_id: Option<i64>,
}

impl ListLogsRequest {
    pub(crate) fn new(client: Arc<HttpClient>, vehicle_id: i64) -> Self {
        Self {
            client,
            vehicle_id,
            service_type_id: None,
        }
    }

    /// Only logs of this service type.
    pub fn service_type(mut self, service_type_id: i64) -> Self {
        self.service_type_id = Some(service_type_id);
        self
    }

    /// Returns the logs, in backend order (newest first).
    pub async fn list(self) -> Result<Vec<MaintenanceLog>> {
        let query = self
            .service_type_id
            .map(|id| vec![("service_type_id".to_string(), id.to_string())])
            .unwrap_or_default();
        self.client
            .get_request(&format!("/vehicles/{}/logs", self.vehicle_id), query)
            .await
    }
}

// ============================================================================
// CARLOGCLIENT METHODS
// ============================================================================

impl CarlogClient {
    /// Creates a request builder for a single log.
    pub fn maintenance_log(&self, log_id: i64) -> LogRequest {
        LogRequest::new(self.client.clone(), self.cache.clone(), log_id)
    }

    /// Creates a request builder for a new log on a vehicle.
    pub fn new_log(&self, vehicle_id: i64, date: NaiveDate, mileage: i64) -> NewLogRequest {
        NewLogRequest::new(
            self.client.clone(),
            self.cache.clone(),
            self.limits().clone(),
            vehicle_id,
            date,
            mileage,
        )
    }

    /// Creates a request builder for updating a log.
    pub fn update_log(&self, log_id: i64) -> UpdateLogRequest {
        UpdateLogRequest::new(
            self.client.clone(),
            self.cache.clone(),
            self.limits().clone(),
            log_id,
        )
    }

    /// Creates a request builder for listing a vehicle's logs.
    pub fn vehicle_logs(&self, vehicle_id: i64) -> ListLogsRequest {
        ListLogsRequest::new(self.client.clone(), vehicle_id)
    }

    /// Per service type log summaries for a vehicle. Only service types with at
    /// least one log appear. Cached until the vehicle's logs change.
    pub async fn maintenance_summary(&self, vehicle_id: i64) -> Result<Vec<ServiceTypeLogSummary>> {
        if let Some(summaries) = self.cache.summaries(vehicle_id) {
            return Ok(summaries);
        }
        let summaries: Vec<ServiceTypeLogSummary> = self
            .client
            .get_request(
                &format!("/vehicles/{vehicle_id}/maintenance_summary_by_type"),
                Vec::new(),
            )
            .await?;
        self.cache.set_summaries(vehicle_id, summaries.clone());
        Ok(summaries)
    }
}
