//! # Carlog cache
//!
//! The cache saves round trips for the lists that nearly every view needs:
//! the vehicle list, the service type list, and per-vehicle maintenance
//! summaries (which drive the advisory list).
//!
//! Entries are never refreshed in the background. Mutations made through
//! `CarlogClient` invalidate the entries they affect; a completed restore
//! clears everything. Changes made by other processes are not detected, so
//! apps that share a backend should call `clear()` when they need fresh data.
//!

/*
 # Notes on Locking design:

 - No code ever tries to hold more than one mutex lock, so there is no risk of deadlock.

 - List calls check the cache, then fetch and insert without holding a lock across the
   fetch. A race costs at most an extra fetch; each cache update is a single atomic
   assignment, so readers never see a partial list.

 - We use non-poisoning parking_lot mutexes.
*/

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{logs::ServiceTypeLogSummary, service_types::ServiceType, vehicles::Vehicle};

/// Cache for vehicles, service types, and per-vehicle summaries
pub struct CarlogCache {
    vehicles: Mutex<Option<Vec<Vehicle>>>,
    service_types: Mutex<Option<Vec<ServiceType>>>,
    /// summaries keyed by vehicle id
    summaries: Mutex<HashMap<i64, Vec<ServiceTypeLogSummary>>>,
    enabled: Mutex<bool>,
}

impl Default for CarlogCache {
    fn default() -> Self {
        Self {
            enabled: Mutex::new(true),
            vehicles: Mutex::new(None),
            service_types: Mutex::new(None),
            summaries: Mutex::new(HashMap::new()),
        }
    }
}

impl std::fmt::Debug for CarlogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarlogCache")
            .field("enabled", &self.is_enabled())
            .field("vehicles", &self.num_vehicles())
            .field("service_types", &self.num_service_types())
            .field("summaries", &self.num_summaries())
            .finish()
    }
}

impl CarlogCache {
    /// Clears the entire cache.
    pub fn clear(&self) {
        self.clear_vehicles();
        self.clear_service_types();
        self.clear_summaries(None);
    }

    /// Enables cache
    /// Cache is always cleared if disabled and re-enabled, to ensure it's not stale
    pub fn enable(&self) {
        self.clear();
        *self.enabled.lock() = true;
    }

    /// disable and clear cache
    pub fn disable(&self) {
        self.clear();
        *self.enabled.lock() = false;
    }

    /// returns true if the cache is enabled
    pub fn is_enabled(&self) -> bool {
        *self.enabled.lock()
    }

    /// Clears the cached vehicle list so the next list fetches from the API.
    pub fn clear_vehicles(&self) {
        self.vehicles.lock().take();
    }

    /// Clears the cached service type list.
    pub fn clear_service_types(&self) {
        self.service_types.lock().take();
    }

    /// Clears cached summaries for one vehicle, or all vehicles
    pub fn clear_summaries(&self, vehicle_id: Option<i64>) {
        let mut summaries = self.summaries.lock();
        if let Some(vehicle_id) = vehicle_id {
            summaries.remove(&vehicle_id);
        } else {
            summaries.clear();
        }
    }

    /// Drops everything derived from one vehicle's logs or overrides.
    /// The vehicle list is cleared too because vehicles embed their overrides.
    pub fn invalidate_vehicle(&self, vehicle_id: i64) {
        self.clear_vehicles();
        self.clear_summaries(Some(vehicle_id));
    }

    pub(crate) fn vehicles(&self) -> Option<Vec<Vehicle>> {
        if self.is_enabled() {
            self.vehicles.lock().clone()
        } else {
            None
        }
    }

    pub(crate) fn set_vehicles(&self, vehicles: Vec<Vehicle>) {
        if self.is_enabled() {
            *self.vehicles.lock() = Some(vehicles);
        }
    }

    pub(crate) fn service_types(&self) -> Option<Vec<ServiceType>> {
        if self.is_enabled() {
            self.service_types.lock().clone()
        } else {
            None
        }
    }

    pub(crate) fn set_service_types(&self, service_types: Vec<ServiceType>) {
        if self.is_enabled() {
            *self.service_types.lock() = Some(service_types);
        }
    }

    pub(crate) fn summaries(&self, vehicle_id: i64) -> Option<Vec<ServiceTypeLogSummary>> {
        if self.is_enabled() {
            self.summaries.lock().get(&vehicle_id).cloned()
        } else {
            None
        }
    }

    pub(crate) fn set_summaries(&self, vehicle_id: i64, summaries: Vec<ServiceTypeLogSummary>) {
        if self.is_enabled() {
            self.summaries.lock().insert(vehicle_id, summaries);
        }
    }

    /// Number of cached vehicles (0 if the list is not cached)
    pub fn num_vehicles(&self) -> usize {
        self.vehicles.lock().as_ref().map_or(0, Vec::len)
    }

    /// Number of cached service types (0 if the list is not cached)
    pub fn num_service_types(&self) -> usize {
        self.service_types.lock().as_ref().map_or(0, Vec::len)
    }

    /// Number of vehicles with cached summaries
    pub fn num_summaries(&self) -> usize {
        self.summaries.lock().len()
    }

    pub fn has_vehicles(&self) -> bool {
        self.is_enabled() && self.vehicles.lock().is_some()
    }

    pub fn has_service_types(&self) -> bool {
        self.is_enabled() && self.service_types.lock().is_some()
    }

    pub fn has_summaries(&self, vehicle_id: i64) -> bool {
        self.is_enabled() && self.summaries.lock().contains_key(&vehicle_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::CarlogCache;
    use crate::prelude::*;

    fn sample_vehicle(id: i64) -> Vehicle {
        serde_json::from_value(json!({
            "id": id,
            "make": "Toyota",
            "model": "Corolla",
            "interval_overrides": []
        }))
        .expect("vehicle fixture")
    }

    fn sample_service_type(id: i64, name: &str) -> ServiceType {
        serde_json::from_value(json!({
            "id": id,
            "name": name,
            "recommended_interval_km": 10000,
            "fields": []
        }))
        .expect("service type fixture")
    }

    fn sample_summary(service_type_id: i64) -> ServiceTypeLogSummary {
        serde_json::from_value(json!({
            "service_type_id": service_type_id,
            "service_type_name": "Oil change",
            "log_count": 1,
            "last_log_date": "2024-01-01",
            "last_log_mileage": 50000,
            "total_cost_for_service_type": 80.0
        }))
        .expect("summary fixture")
    }

    #[test]
    fn test_cache_counts_and_clear() {
        let cache = CarlogCache::default();
        cache.set_vehicles(vec![sample_vehicle(1), sample_vehicle(2)]);
        cache.set_service_types(vec![sample_service_type(1, "Oil change")]);
        cache.set_summaries(1, vec![sample_summary(1)]);
        cache.set_summaries(2, vec![sample_summary(1)]);

        assert_eq!(cache.num_vehicles(), 2);
        assert_eq!(cache.num_service_types(), 1);
        assert_eq!(cache.num_summaries(), 2);

        cache.invalidate_vehicle(1);
        assert!(!cache.has_vehicles());
        assert!(!cache.has_summaries(1));
        assert!(cache.has_summaries(2));
        assert!(cache.has_service_types());

        cache.clear();
        assert_eq!(cache.num_service_types(), 0);
        assert_eq!(cache.num_summaries(), 0);
    }

    #[test]
    fn test_disabled_cache_stays_empty() {
        let cache = CarlogCache::default();
        cache.disable();
        cache.set_vehicles(vec![sample_vehicle(1)]);
        cache.set_summaries(1, vec![sample_summary(1)]);
        assert!(cache.vehicles().is_none());
        assert!(cache.summaries(1).is_none());
        assert!(!cache.has_vehicles());

        cache.enable();
        cache.set_vehicles(vec![sample_vehicle(1)]);
        assert_eq!(cache.vehicles().map(|v| v.len()), Some(1));
    }
}
