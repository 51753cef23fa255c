//! Shared fixtures for carlog integration tests
//!
//! Each test starts its own mockito server and builds a client pointed at it,
//! with short retry delays so retry tests finish quickly.
#![allow(dead_code)]

use std::time::Duration;

use carlog::prelude::*;
use mockito::{Mock, Server, ServerGuard};
use serde_json::{Value, json};

pub type TestResult<T = ()> = anyhow::Result<T>;

pub struct TestContext {
    pub server: ServerGuard,
    pub client: CarlogClient,
}

/// Starts a mock server and a client with default test settings.
pub async fn context() -> TestContext {
    context_with(|config| config).await
}

/// Starts a mock server and a client, letting the caller adjust the config.
pub async fn context_with(adjust: impl FnOnce(ClientConfig) -> ClientConfig) -> TestContext {
    let server = Server::new_async().await;
    let config = ClientConfig::default()
        .base_url(server.url())
        .max_retries(2)
        .retry_base_delay(Duration::from_millis(1))
        .request_timeout(Duration::from_secs(5));
    let client = CarlogClient::with_config(adjust(config)).expect("client");
    TestContext { server, client }
}

impl TestContext {
    /// Mocks a json response for `method path`, expecting exactly `hits` calls.
    pub async fn json_mock(
        &mut self,
        method: &str,
        path: &str,
        status: usize,
        body: &Value,
        hits: usize,
    ) -> Mock {
        self.server
            .mock(method, path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(hits)
            .create_async()
            .await
    }
}

pub fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn vehicle_json(id: i64, make: &str, model: &str, vin: Option<&str>) -> Value {
    json!({
        "id": id,
        "make": make,
        "model": model,
        "year": 2019,
        "vin": vin,
        "initial_mileage": 40000,
        "acquisition_date": "2022-01-01",
        "maintenance_logs": [],
        "interval_overrides": []
    })
}

pub fn service_type_json(id: i64, name: &str, km: Option<i64>, days: Option<i64>) -> Value {
    json!({
        "id": id,
        "name": name,
        "recommended_interval_km": km,
        "recommended_interval_days": days,
        "fields": []
    })
}

pub fn log_json(id: i64, vehicle_id: i64, date: &str, mileage: i64, cost: f64) -> Value {
    json!({
        "id": id,
        "vehicle_id": vehicle_id,
        "date": date,
        "mileage": mileage,
        "cost": cost,
        "notes": null,
        "service_type_id": 1,
        "service_type": service_type_json(1, "Oil change", Some(10000), Some(365)),
        "custom_field_values": []
    })
}

/// Backup with one vehicle whose VIN collides with an existing vehicle, and one new vehicle.
pub fn backup_json() -> Value {
    json!({
        "metadata": {
            "export_date_utc": "2024-05-01T10:00:00Z",
            "config_used": {"include_maintenance_logs": true}
        },
        "service_types": [service_type_json(1, "Oil change", Some(10000), Some(365))],
        "vehicles": [
            {
                "id": 11, "make": "Toyota", "model": "Corolla", "year": 2019,
                "vin": "VIN-EXISTING", "initial_mileage": 40000, "acquisition_date": null,
                "maintenance_logs": [log_json(100, 11, "2024-01-10", 52000, 80.0)],
                "interval_overrides": []
            },
            {
                "id": 12, "make": "Honda", "model": "Civic", "year": 2021,
                "vin": "VIN-NEW", "initial_mileage": 0, "acquisition_date": null,
                "maintenance_logs": [],
                "interval_overrides": []
            }
        ]
    })
}

pub fn analysis_json() -> Value {
    json!({
        "new_vehicles": [
            {"id_in_backup": 12, "make": "Honda", "model": "Civic", "year": 2021,
             "vin": "VIN-NEW", "log_count": 0}
        ],
        "conflicting_vehicles": [
            {"vin": "VIN-EXISTING",
             "backup_vehicle": {"id": 11, "make": "Toyota", "model": "Corolla", "year": 2019},
             "existing_vehicle_id": 3}
        ]
    })
}
