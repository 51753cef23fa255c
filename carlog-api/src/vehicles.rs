//! # Vehicles
//!
//! Fluent builders for vehicles and their per-vehicle interval overrides.
//!
//! ## Vehicle methods on CarlogClient
//!
//! - [vehicles](CarlogClient::vehicles) - list all vehicles
//! - [vehicle](CarlogClient::vehicle) - get or delete a vehicle
//! - [new_vehicle](CarlogClient::new_vehicle) - create a vehicle
//! - [update_vehicle](CarlogClient::update_vehicle) - update vehicle properties
//! - [interval_override](CarlogClient::interval_override) - set or clear a vehicle's
//!   interval for one service type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use carlog::prelude::*;
//!
//! # async fn example(client: &CarlogClient) -> Result<(), CarlogError> {
//! let vehicles = client.vehicles().list().await?;
//!
//! let vehicle = client.new_vehicle("Honda", "Civic")
//!     .year(2016)
//!     .initial_mileage(88_000)
//!     .create().await?;
//!
//! // oil changes every 7500 km on this car
//! client.interval_override(vehicle.id, 1)
//!     .km(7500)
//!     .set().await?;
//!
//! match client.interval_override(vehicle.id, 1).clear().await? {
//!     ClearOutcome::Cleared => println!("override cleared"),
//!     ClearOutcome::NothingToClear => println!("no override was set"),
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Result, cache::CarlogCache, client::CarlogClient, http_client::HttpClient,
    logs::MaintenanceLog, prelude::*,
};

/// A vehicle, as returned by the backend.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Vehicle {
    pub id: i64,

    pub make: String,

    pub model: String,

    pub year: Option<i32>,

    pub vin: Option<String>,

    /// Odometer reading when the vehicle was acquired.
    /// Baseline mileage for service types that were never performed.
    pub initial_mileage: Option<i64>,

    /// Baseline date for service types that were never performed.
    pub acquisition_date: Option<NaiveDate>,

    /// Logs embedded by the backend. May be empty even when logs exist;
    /// use `client.vehicle_logs(id)` for the authoritative list.
    #[serde(default)]
    pub maintenance_logs: Vec<MaintenanceLog>,

    #[serde(default)]
    pub interval_overrides: Vec<IntervalOverride>,
}

impl Vehicle {
    /// Human readable name: "2019 Toyota Corolla", or "Toyota Corolla" without a year.
    pub fn display_name(&self) -> String {
        match self.year {
            Some(year) => format!("{year} {} {}", self.make, self.model),
            None => format!("{} {}", self.make, self.model),
        }
    }

    /// The override for a service type, if one is set.
    /// The backend keeps at most one per (vehicle, service type); the first match is used.
    pub fn override_for(&self, service_type_id: i64) -> Option<&IntervalOverride> {
        self.interval_overrides
            .iter()
            .find(|ov| ov.service_type_id == service_type_id)
    }
}

/// A vehicle-specific maintenance interval for one service type.
///
/// A `None` dimension means "no override for that dimension", and the
/// service type's recommended interval applies.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct IntervalOverride {
    #[serde(default)]
    pub id: i64,

    #[serde(default)]
    pub vehicle_id: i64,

    pub service_type_id: i64,

    pub override_interval_km: Option<i64>,

    pub override_interval_days: Option<i64>,
}

/// Result of clearing an interval override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ClearOutcome {
    /// The override existed and was removed.
    #[strum(serialize = "Interval override cleared.")]
    Cleared,
    /// There was no override to remove (backend returned 404).
    #[strum(serialize = "No override was set for this service to clear.")]
    NothingToClear,
}

// ============================================================================
// REQUEST BODY TYPES (internal)
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateVehicleRequestBody {
    make: String,
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_mileage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    acquisition_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Default)]
struct UpdateVehicleRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_mileage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    acquisition_date: Option<NaiveDate>,
}

impl UpdateVehicleRequestBody {
    fn is_empty(&self) -> bool {
        self.make.is_none()
            && self.model.is_none()
            && self.year.is_none()
            && self.vin.is_none()
            && self.initial_mileage.is_none()
            && self.acquisition_date.is_none()
    }
}

// both dimensions are always sent; null means "no override for that dimension"
#[derive(Debug, Serialize)]
struct IntervalOverrideRequestBody {
    override_interval_km: Option<i64>,
    override_interval_days: Option<i64>,
}

// ============================================================================
// BUILDER STRUCTS (public)
// ============================================================================

/// Request builder for getting or deleting a single vehicle.
///
/// Obtained via [`CarlogClient::vehicle`].
#[derive(Debug)]
pub struct VehicleRequest {
    client: Arc<HttpClient>,
    vehicle_id: i64,
    cache: Arc<CarlogCache>,
}

impl VehicleRequest {
    pub(crate) fn new(client: Arc<HttpClient>, vehicle_id: i64, cache: Arc<CarlogCache>) -> Self {
        Self {
            client,
            vehicle_id,
            cache,
        }
    }

    /// Retrieves the vehicle by id.
    ///
    /// # Errors
    /// - [`CarlogError::NotFound`] if the vehicle doesn't exist
    pub async fn get(self) -> Result<Vehicle> {
        if let Some(vehicle) = self
            .cache
            .vehicles()
            .and_then(|list| list.into_iter().find(|v| v.id == self.vehicle_id))
        {
            return Ok(vehicle);
        }
        self.client
            .get_request(&format!("/vehicles/{}", self.vehicle_id), Vec::new())
            .await
    }

    /// Deletes the vehicle, with its logs and overrides.
    ///
    /// # Errors
    /// - [`CarlogError::NotFound`] if the vehicle doesn't exist
    pub async fn delete(self) -> Result<()> {
        self.client
            .delete_request(&format!("/vehicles/{}", self.vehicle_id))
            .await?;
        self.cache.invalidate_vehicle(self.vehicle_id);
        Ok(())
    }
}

/// Request builder for creating a vehicle.
///
/// Obtained via [`CarlogClient::new_vehicle`].
///
/// # Example
///
/// ```rust,no_run
/// # use carlog::prelude::*;
/// # async fn example(client: &CarlogClient) -> Result<(), CarlogError> {
/// let vehicle = client.new_vehicle("Mazda", "MX-5")
///     .year(2021)
///     .acquisition_date(chrono::NaiveDate::from_ymd_opt(2023, 5, 1).unwrap())
///     .create().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct NewVehicleRequest {
    client: Arc<HttpClient>,
    cache: Arc<CarlogCache>,
    limits: ValidationLimits,
    body: CreateVehicleRequestBody,
}

impl NewVehicleRequest {
    pub(crate) fn new(
        client: Arc<HttpClient>,
        cache: Arc<CarlogCache>,
        limits: ValidationLimits,
        make: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            cache,
            limits,
            body: CreateVehicleRequestBody {
                make: make.into(),
                model: model.into(),
                year: None,
                vin: None,
                initial_mileage: None,
                acquisition_date: None,
            },
        }
    }

    pub fn year(mut self, year: i32) -> Self {
        self.body.year = Some(year);
        self
    }

    pub fn vin(mut self, vin: impl Into<String>) -> Self {
        self.body.vin = Some(vin.into());
        self
    }

    pub fn initial_mileage(mut self, km: i64) -> Self {
        self.body.initial_mileage = Some(km);
        self
    }

    pub fn acquisition_date(mut self, date: NaiveDate) -> Self {
        self.body.acquisition_date = Some(date);
        self
    }

    /// Creates the vehicle.
    ///
    /// # Errors
    /// - [`CarlogError::Validation`] if make or model is empty, the VIN is too long,
    ///   or the backend rejects the request
    pub async fn create(self) -> Result<Vehicle> {
        self.limits.validate_name(&self.body.make, "make")?;
        self.limits.validate_name(&self.body.model, "model")?;
        if let Some(vin) = &self.body.vin {
            self.limits.validate_vin(vin)?;
        }
        if let Some(km) = self.body.initial_mileage {
            self.limits
                .validate_non_negative(km as f64, "initial mileage")?;
        }

        let vehicle: Vehicle = self.client.post_request("/vehicles/", &self.body).await?;
        debug!(id = vehicle.id, name = %vehicle.display_name(), "vehicle created");
        self.cache.clear_vehicles();
        Ok(vehicle)
    }
}

/// Request builder for updating a vehicle. Only fields that are set are sent.
///
/// Obtained via [`CarlogClient::update_vehicle`].
#[derive(Debug)]
pub struct UpdateVehicleRequest {
    client: Arc<HttpClient>,
    cache: Arc<CarlogCache>,
    limits: ValidationLimits,
    vehicle_id: i64,
    body: UpdateVehicleRequestBody,
}

impl UpdateVehicleRequest {
    pub(crate) fn new(
        client: Arc<HttpClient>,
        cache: Arc<CarlogCache>,
        limits: ValidationLimits,
        vehicle_id: i64,
    ) -> Self {
        Self {
            client,
            cache,
            limits,
            vehicle_id,
            body: UpdateVehicleRequestBody::default(),
        }
    }

    pub fn make(mut self, make: impl Into<String>) -> Self {
        self.body.make = Some(make.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.body.model = Some(model.into());
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.body.year = Some(year);
        self
    }

    pub fn vin(mut self, vin: impl Into<String>) -> Self {
        self.body.vin = Some(vin.into());
        self
    }

    pub fn initial_mileage(mut self, km: i64) -> Self {
        self.body.initial_mileage = Some(km);
        self
    }

    pub fn acquisition_date(mut self, date: NaiveDate) -> Self {
        self.body.acquisition_date = Some(date);
        self
    }

    /// Applies the update.
    ///
    /// # Errors
    /// - [`CarlogError::Validation`] if no field was set, or a field is invalid
    /// - [`CarlogError::NotFound`] if the vehicle doesn't exist
    pub async fn update(self) -> Result<Vehicle> {
        if self.body.is_empty() {
            return Err(CarlogError::validation(
                "update_vehicle: must set at least one field to update",
            ));
        }
        if let Some(make) = &self.body.make {
            self.limits.validate_name(make, "make")?;
        }
        if let Some(model) = &self.body.model {
            self.limits.validate_name(model, "model")?;
        }
        if let Some(vin) = &self.body.vin {
            self.limits.validate_vin(vin)?;
        }

        let vehicle: Vehicle = self
            .client
            .put_request(&format!("/vehicles/{}", self.vehicle_id), &self.body)
            .await?;
        self.cache.clear_vehicles();
        Ok(vehicle)
    }
}

/// Request builder for listing all vehicles.
///
/// Obtained via [`CarlogClient::vehicles`].
#[derive(Debug)]
pub struct ListVehiclesRequest {
    client: Arc<HttpClient>,
    cache: Arc<CarlogCache>,
}

impl ListVehiclesRequest {
    pub(crate) fn new(client: Arc<HttpClient>, cache: Arc<CarlogCache>) -> Self {
        Self { client, cache }
    }

    /// Returns all vehicles, from cache when available.
    pub async fn list(self) -> Result<Vec<Vehicle>> {
        if let Some(vehicles) = self.cache.vehicles() {
            return Ok(vehicles);
        }
        let vehicles: Vec<Vehicle> = self.client.get_request("/vehicles/", Vec::new()).await?;
        self.cache.set_vehicles(vehicles.clone());
        Ok(vehicles)
    }
}

/// Request builder for a vehicle's interval override on one service type.
///
/// Obtained via [`CarlogClient::interval_override`].
#[derive(Debug)]
pub struct IntervalOverrideRequest {
    client: Arc<HttpClient>,
    cache: Arc<CarlogCache>,
    limits: ValidationLimits,
    vehicle_id: i64,
    service_type_id: i64,
    km: Option<i64>,
    days: Option<i64>,
}

impl IntervalOverrideRequest {
    pub(crate) fn new(
        client: Arc<HttpClient>,
        cache: Arc<CarlogCache>,
        limits: ValidationLimits,
        vehicle_id: i64,
        service_type_id: i64,
    ) -> Self {
        Self {
            client,
            cache,
            limits,
            vehicle_id,
            service_type_id,
            km: None,
            days: None,
        }
    }

    /// Overrides the distance interval, in km.
    pub fn km(mut self, km: i64) -> Self {
        self.km = Some(km);
        self
    }

    /// Overrides the time interval, in days.
    pub fn days(mut self, days: i64) -> Self {
        self.days = Some(days);
        self
    }

    fn path(&self) -> String {
        format!(
            "/vehicles/{}/interval_overrides/{}",
            self.vehicle_id, self.service_type_id
        )
    }

    /// Creates or replaces the override. Dimensions not set fall back to the
    /// service type's recommended interval.
    ///
    /// # Errors
    /// - [`CarlogError::Validation`] if neither dimension is set, or one is not positive
    pub async fn set(self) -> Result<IntervalOverride> {
        if self.km.is_none() && self.days.is_none() {
            return Err(CarlogError::validation(
                "interval override: set km, days, or both",
            ));
        }
        self.limits.validate_interval(self.km, "override interval km")?;
        self.limits
            .validate_interval(self.days, "override interval days")?;

        let body = IntervalOverrideRequestBody {
            override_interval_km: self.km,
            override_interval_days: self.days,
        };
        let saved: IntervalOverride = self.client.put_request(&self.path(), &body).await?;
        self.cache.invalidate_vehicle(self.vehicle_id);
        Ok(saved)
    }

    /// Removes the override. A missing override is reported as
    /// [`ClearOutcome::NothingToClear`], not as an error.
    pub async fn clear(self) -> Result<ClearOutcome> {
        match self.client.delete_request(&self.path()).await {
            Ok(()) => {
                self.cache.invalidate_vehicle(self.vehicle_id);
                Ok(ClearOutcome::Cleared)
            }
            Err(e) if e.is_not_found() => {
                debug!(
                    vehicle_id = self.vehicle_id,
                    service_type_id = self.service_type_id,
                    "no interval override to clear"
                );
                Ok(ClearOutcome::NothingToClear)
            }
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// CARLOGCLIENT METHODS
// ============================================================================

impl CarlogClient {
    /// Creates a request builder for getting or deleting a vehicle.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use carlog::prelude::*;
    /// # async fn example(client: &CarlogClient) -> Result<(), CarlogError> {
    /// let vehicle = client.vehicle(3).get().await?;
    /// println!("{}", vehicle.display_name());
    /// # Ok(())
    /// # }
    /// ```
    pub fn vehicle(&self, vehicle_id: i64) -> VehicleRequest {
        VehicleRequest::new(self.client.clone(), vehicle_id, self.cache.clone())
    }

    /// Creates a request builder for a new vehicle.
    pub fn new_vehicle(
        &self,
        make: impl Into<String>,
        model: impl Into<String>,
    ) -> NewVehicleRequest {
        NewVehicleRequest::new(
            self.client.clone(),
            self.cache.clone(),
            self.limits().clone(),
            make,
            model,
        )
    }

    /// Creates a request builder for updating a vehicle.
    pub fn update_vehicle(&self, vehicle_id: i64) -> UpdateVehicleRequest {
        UpdateVehicleRequest::new(
            self.client.clone(),
            self.cache.clone(),
            self.limits().clone(),
            vehicle_id,
        )
    }

    /// Creates a request builder for listing vehicles.
    pub fn vehicles(&self) -> ListVehiclesRequest {
        ListVehiclesRequest::new(self.client.clone(), self.cache.clone())
    }

    /// Creates a request builder for the interval override of
    /// (`vehicle_id`, `service_type_id`).
    pub fn interval_override(&self, vehicle_id: i64, service_type_id: i64) -> IntervalOverrideRequest {
        IntervalOverrideRequest::new(
            self.client.clone(),
            self.cache.clone(),
            self.limits().clone(),
            vehicle_id,
            service_type_id,
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
