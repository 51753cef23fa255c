//! # Service Types
//!
//! Service types are the kinds of maintenance that can be logged ("Oil change",
//! "Brake pads"), each with an optional recommended interval and a list of
//! custom field definitions recorded with every log.
//!
//! ## Service type methods on CarlogClient
//!
//! - [service_types](CarlogClient::service_types) - list all service types
//! - [service_type](CarlogClient::service_type) - get, delete, or list custom fields
//! - [new_service_type](CarlogClient::new_service_type) - create a service type
//! - [update_service_type](CarlogClient::update_service_type) - update a service type
//!
//! ```rust,no_run
//! use carlog::prelude::*;
//!
//! # async fn example(client: &CarlogClient) -> Result<(), CarlogError> {
//! let oil = client.new_service_type("Oil change")
//!     .interval_km(10_000)
//!     .interval_days(365)
//!     .field(CustomFieldInput::new("Oil brand", CustomFieldType::Text))
//!     .field(CustomFieldInput::new("Quantity", CustomFieldType::Number).unit("L"))
//!     .create().await?;
//!
//! let fields = client.service_type(oil.id).custom_fields().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Result, cache::CarlogCache, client::CarlogClient, http_client::HttpClient, prelude::*};

/// Value type of a custom field.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CustomFieldType {
    #[default]
    Text,
    Number,
    Date,
    Boolean,
}

/// A custom field definition, as returned by the backend.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CustomField {
    pub id: i64,
    pub name: String,
    pub field_type: CustomFieldType,
    pub unit: Option<String>,
}

/// A custom field definition sent when creating or updating a service type.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CustomFieldInput {
    pub name: String,
    pub field_type: CustomFieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl CustomFieldInput {
    pub fn new(name: impl Into<String>, field_type: CustomFieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            unit: None,
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

impl From<&CustomField> for CustomFieldInput {
    fn from(field: &CustomField) -> Self {
        Self {
            name: field.name.clone(),
            field_type: field.field_type,
            unit: field.unit.clone(),
        }
    }
}

/// A kind of maintenance, with optional recommended interval.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServiceType {
    pub id: i64,

    pub name: String,

    /// Recommended distance between services. `None` means no default cadence.
    pub recommended_interval_km: Option<i64>,

    /// Recommended time between services. `None` means no default cadence.
    pub recommended_interval_days: Option<i64>,

    #[serde(default)]
    pub fields: Vec<CustomField>,
}

impl ServiceType {
    /// Looks up a custom field definition by name.
    pub fn field_by_name(&self, name: &str) -> Option<&CustomField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ============================================================================
// REQUEST BODY TYPES (internal)
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateServiceTypeRequestBody {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommended_interval_km: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommended_interval_days: Option<i64>,
    fields: Vec<CustomFieldInput>,
}

#[derive(Debug, Serialize, Default)]
struct UpdateServiceTypeRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    // Some(None) sends null, which removes the recommended interval
    #[serde(skip_serializing_if = "Option::is_none")]
    recommended_interval_km: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommended_interval_days: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<CustomFieldInput>>,
}

impl UpdateServiceTypeRequestBody {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.recommended_interval_km.is_none()
            && self.recommended_interval_days.is_none()
            && self.fields.is_none()
    }
}

fn validate_fields(limits: &ValidationLimits, fields: &[CustomFieldInput]) -> Result<()> {
    limits.validate_num_fields(fields.len(), "service type")?;
    for field in fields {
        limits.validate_name(&field.name, "custom field name")?;
    }
    Ok(())
}

// ============================================================================
// BUILDER STRUCTS (public)
// ============================================================================

/// Request builder for a single service type.
///
/// Obtained via [`CarlogClient::service_type`].
#[derive(Debug)]
pub struct ServiceTypeRequest {
    client: Arc<HttpClient>,
    cache: Arc<CarlogCache>,
    service_type_id: i64,
}

impl ServiceTypeRequest {
    pub(crate) fn new(client: Arc<HttpClient>, cache: Arc<CarlogCache>, service_type_id: i64) -> Self {
        Self {
            client,
            cache,
            service_type_id,
        }
    }

    /// Retrieves the service type by id.
    ///
    /// # Errors
    /// - [`CarlogError::NotFound`] if the service type doesn't exist
    pub async fn get(self) -> Result<ServiceType> {
        if let Some(service_type) = self
            .cache
            .service_types()
            .and_then(|list| list.into_iter().find(|st| st.id == self.service_type_id))
        {
            return Ok(service_type);
        }
        self.client
            .get_request(&format!("/service_types/{}", self.service_type_id), Vec::new())
            .await
    }

    /// Lists the custom field definitions of this service type.
    pub async fn custom_fields(self) -> Result<Vec<CustomField>> {
        self.client
            .get_request(
                &format!("/service_types/{}/custom_fields/", self.service_type_id),
                Vec::new(),
            )
            .await
    }

    /// Deletes the service type. Existing logs keep their data but lose
    /// their service type association.
    pub async fn delete(self) -> Result<()> {
        self.client
            .delete_request(&format!("/service_types/{}", self.service_type_id))
            .await?;
        self.cache.clear_service_types();
        self.cache.clear_summaries(None);
        self.cache.clear_vehicles();
        Ok(())
    }
}

/// Request builder for creating a service type.
///
/// Obtained via [`CarlogClient::new_service_type`].
#[derive(Debug)]
pub struct NewServiceTypeRequest {
    client: Arc<HttpClient>,
    cache: Arc<CarlogCache>,
    limits: ValidationLimits,
    body: CreateServiceTypeRequestBody,
}

impl NewServiceTypeRequest {
    pub(crate) fn new(
        client: Arc<HttpClient>,
        cache: Arc<CarlogCache>,
        limits: ValidationLimits,
        name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            cache,
            limits,
            body: CreateServiceTypeRequestBody {
                name: name.into(),
                recommended_interval_km: None,
                recommended_interval_days: None,
                fields: Vec::new(),
            },
        }
    }

    pub fn interval_km(mut self, km: i64) -> Self {
        self.body.recommended_interval_km = Some(km);
        self
    }

    pub fn interval_days(mut self, days: i64) -> Self {
        self.body.recommended_interval_days = Some(days);
        self
    }

    /// Adds a custom field definition.
    pub fn field(mut self, field: CustomFieldInput) -> Self {
        self.body.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = CustomFieldInput>) -> Self {
        self.body.fields.extend(fields);
        self
    }

    /// Creates the service type.
    ///
    /// # Errors
    /// - [`CarlogError::Validation`] for an empty name, a non-positive interval,
    ///   or an unnamed custom field
    pub async fn create(self) -> Result<ServiceType> {
        self.limits.validate_name(&self.body.name, "service type name")?;
        self.limits
            .validate_interval(self.body.recommended_interval_km, "recommended interval km")?;
        self.limits.validate_interval(
            self.body.recommended_interval_days,
            "recommended interval days",
        )?;
        validate_fields(&self.limits, &self.body.fields)?;

        let service_type: ServiceType = self
            .client
            .post_request("/service_types/", &self.body)
            .await?;
        self.cache.clear_service_types();
        Ok(service_type)
    }
}

/// Request builder for updating a service type. Only fields that are set are sent.
///
/// Obtained via [`CarlogClient::update_service_type`].
#[derive(Debug)]
pub struct UpdateServiceTypeRequest {
    client: Arc<HttpClient>,
    cache: Arc<CarlogCache>,
    limits: ValidationLimits,
    service_type_id: i64,
    body: UpdateServiceTypeRequestBody,
}

impl UpdateServiceTypeRequest {
    pub(crate) fn new(
        client: Arc<HttpClient>,
        cache: Arc<CarlogCache>,
        limits: ValidationLimits,
        service_type_id: i64,
    ) -> Self {
        Self {
            client,
            cache,
            limits,
            service_type_id,
            body: UpdateServiceTypeRequestBody::default(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.body.name = Some(name.into());
        self
    }

    /// Sets the recommended km interval. `None` removes it.
    pub fn interval_km(mut self, km: Option<i64>) -> Self {
        self.body.recommended_interval_km = Some(km);
        self
    }

    /// Sets the recommended day interval. `None` removes it.
    pub fn interval_days(mut self, days: Option<i64>) -> Self {
        self.body.recommended_interval_days = Some(days);
        self
    }

    /// Replaces the full list of custom field definitions.
    pub fn fields(mut self, fields: impl IntoIterator<Item = CustomFieldInput>) -> Self {
        self.body.fields = Some(fields.into_iter().collect());
        self
    }

    /// Applies the update.
    ///
    /// # Errors
    /// - [`CarlogError::Validation`] if no field was set, or a field is invalid
    /// - [`CarlogError::NotFound`] if the service type doesn't exist
    pub async fn update(self) -> Result<ServiceType> {
        if self.body.is_empty() {
            return Err(CarlogError::validation(
                "update_service_type: must set at least one field to update",
            ));
        }
        if let Some(name) = &self.body.name {
            self.limits.validate_name(name, "service type name")?;
        }
        self.limits.validate_interval(
            self.body.recommended_interval_km.flatten(),
            "recommended interval km",
        )?;
        self.limits.validate_interval(
            self.body.recommended_interval_days.flatten(),
            "recommended interval days",
        )?;
        if let Some(fields) = &self.body.fields {
            validate_fields(&self.limits, fields)?;
        }

        let service_type: ServiceType = self
            .client
            .put_request(
                &format!("/service_types/{}", self.service_type_id),
                &self.body,
            )
            .await?;
        // summaries and vehicle logs embed the service type name
        self.cache.clear_service_types();
        self.cache.clear_summaries(None);
        self.cache.clear_vehicles();
        Ok(service_type)
    }
}

/// Request builder for listing service types.
///
/// Obtained via [`CarlogClient::service_types`].
#[derive(Debug)]
pub struct ListServiceTypesRequest {
    client: Arc<HttpClient>,
    cache: Arc<CarlogCache>,
}

impl ListServiceTypesRequest {
    pub(crate) fn new(client: Arc<HttpClient>, cache: Arc<CarlogCache>) -> Self {
        Self { client, cache }
    }

    /// Returns all service types, from cache when available.
    pub async fn list(self) -> Result<Vec<ServiceType>> {
        if let Some(service_types) = self.cache.service_types() {
            return Ok(service_types);
        }
        let service_types: Vec<ServiceType> = self
            .client
            .get_request("/service_types/", Vec::new())
            .await?;
        self.cache.set_service_types(service_types.clone());
        Ok(service_types)
    }
}

// ============================================================================
// CARLOGCLIENT METHODS
// ============================================================================

impl CarlogClient {
    /// Creates a request builder for a single service type.
    pub fn service_type(&self, service_type_id: i64) -> ServiceTypeRequest {
        ServiceTypeRequest::new(self.client.clone(), self.cache.clone(), service_type_id)
    }

    /// Creates a request builder for a new service type.
    pub fn new_service_type(&self, name: impl Into<String>) -> NewServiceTypeRequest {
        NewServiceTypeRequest::new(
            self.client.clone(),
            self.cache.clone(),
            self.limits().clone(),
            name,
        )
    }

    /// Creates a request builder for updating a service type.
    pub fn update_service_type(&self, service_type_id: i64) -> UpdateServiceTypeRequest {
        UpdateServiceTypeRequest::new(
            self.client.clone(),
            self.cache.clone(),
            self.limits().clone(),
            service_type_id,
        )
    }

    /// Creates a request builder for listing service types.
    pub fn service_types(&self) -> ListServiceTypesRequest {
        ListServiceTypesRequest::new(self.client.clone(), self.cache.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_field_type_strings() {
        assert_eq!(CustomFieldType::Boolean.to_string(), "boolean");
        assert_eq!(CustomFieldType::from_str("Number").unwrap(), CustomFieldType::Number);
        assert!(CustomFieldType::from_str("float").is_err());
        assert_eq!(
            serde_json::to_value(CustomFieldType::Date).unwrap(),
            json!("date")
        );
    }

    #[test]
    fn test_service_type_deserialize() {
        let st: ServiceType = serde_json::from_value(json!({
            "id": 4,
            "name": "Tire rotation",
            "recommended_interval_km": 8000,
            "recommended_interval_days": null,
            "fields": [{"id": 9, "name": "Pressure", "field_type": "number", "unit": "psi"}]
        }))
        .unwrap();
        assert_eq!(st.recommended_interval_days, None);
        assert_eq!(st.field_by_name("Pressure").unwrap().unit.as_deref(), Some("psi"));
    }

    #[test]
    fn test_update_body_null_interval() {
        let body = UpdateServiceTypeRequestBody {
            recommended_interval_days: Some(None),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"recommended_interval_days": null})
        );
        assert!(UpdateServiceTypeRequestBody::default().is_empty());
    }

    #[test]
    fn test_create_body_omits_missing_intervals() {
        let body = CreateServiceTypeRequestBody {
            name: "Wipers".into(),
            recommended_interval_km: None,
            recommended_interval_days: Some(180),
            fields: vec![CustomFieldInput::new("Brand", CustomFieldType::Text)],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "name": "Wipers",
                "recommended_interval_days": 180,
                "fields": [{"name": "Brand", "field_type": "text"}]
            })
        );
    }

    #[test]
    fn test_validate_fields_rejects_unnamed() {
        let limits = ValidationLimits::default();
        let fields = vec![CustomFieldInput::new("", CustomFieldType::Text)];
        assert!(validate_fields(&limits, &fields).is_err());
    }
}
