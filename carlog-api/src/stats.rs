//! Vehicle statistics derived from the log history.

use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::prelude::*;

/// Summary figures for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleStats {
    /// Mileage of the latest log, else the vehicle's initial mileage, else 0
    pub current_mileage: i64,
    pub last_service_date: Option<NaiveDate>,
    pub days_since_last_service: Option<i64>,
    pub total_logs: usize,
    pub total_cost: f64,
    /// 0 when there are no logs
    pub average_cost: f64,
    /// Calendar years since the model year
    pub vehicle_age_years: Option<i32>,
    /// Total cost over km driven since acquisition
    pub cost_per_km: Option<f64>,
    /// Total cost over years owned since acquisition
    pub cost_per_year: Option<f64>,
}

impl VehicleStats {
    pub fn compute(vehicle: &Vehicle, logs: &[MaintenanceLog], today: NaiveDate) -> Self {
        let latest = latest_log(logs);
        let current_mileage = latest
            .map(|log| log.mileage)
            .or(vehicle.initial_mileage)
            .unwrap_or(0);
        let total_cost: f64 = logs.iter().map(|log| log.cost).sum();
        let average_cost = if logs.is_empty() {
            0.0
        } else {
            total_cost / logs.len() as f64
        };

        let distance = vehicle
            .initial_mileage
            .map(|initial| current_mileage - initial)
            .filter(|d| *d > 0);
        let years_owned = vehicle
            .acquisition_date
            .map(|acquired| (today - acquired).num_days() as f64 / 365.25)
            .filter(|y| *y > 0.0);

        Self {
            current_mileage,
            last_service_date: latest.map(|log| log.date),
            days_since_last_service: latest.map(|log| (today - log.date).num_days()),
            total_logs: logs.len(),
            total_cost,
            average_cost,
            vehicle_age_years: vehicle.year.map(|year| today.year() - year),
            cost_per_km: distance.map(|km| total_cost / km as f64),
            cost_per_year: years_owned.map(|years| total_cost / years),
        }
    }
}

/// The most recent log: latest date, ties broken by higher mileage.
/// Does not depend on the order logs are returned in.
pub fn latest_log(logs: &[MaintenanceLog]) -> Option<&MaintenanceLog> {
    logs.iter()
        .max_by(|a, b| a.date.cmp(&b.date).then(a.mileage.cmp(&b.mileage)))
}

/// Mileage of the most recent log.
pub fn latest_mileage(logs: &[MaintenanceLog]) -> Option<i64> {
    latest_log(logs).map(|log| log.mileage)
}

/// Spend per service type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostShare {
    pub service_type_id: i64,
    pub name: String,
    pub total_cost: f64,
    /// Fraction of the vehicle's total spend, 0.0 to 1.0
    pub share: f64,
}

/// Cost per service type, highest first. Service types with no cost are left out.
pub fn cost_breakdown(summaries: &[ServiceTypeLogSummary]) -> Vec<CostShare> {
    let total: f64 = summaries
        .iter()
        .map(|s| s.total_cost_for_service_type)
        .filter(|c| *c > 0.0)
        .sum();
    let mut shares: Vec<CostShare> = summaries
        .iter()
        .filter(|s| s.total_cost_for_service_type > 0.0)
        .map(|s| CostShare {
            service_type_id: s.service_type_id,
            name: s.service_type_name.clone(),
            total_cost: s.total_cost_for_service_type,
            share: s.total_cost_for_service_type / total,
        })
        .collect();
    shares.sort_by(|a, b| {
        b.total_cost
            .partial_cmp(&a.total_cost)
            .unwrap_or(Ordering::Equal)
    });
    shares
}
