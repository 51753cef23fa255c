//! # Upcoming maintenance advisor
//!
//! Pure functions that turn a vehicle, its log summaries, and the service type
//! catalogue into a list of services needing attention.
//!
//! - [`resolve_interval`] - effective km/day interval: the vehicle's override
//!   where set, else the service type's recommendation
//! - [`compute_due_status`] - OK / Upcoming / Overdue / NeverDone for one service type
//! - [`build_advisory`] - every actionable service type for a vehicle
//!
//! A dimension (days or km) counts as defined only when its interval is
//! positive and a baseline exists for it. The baseline is the last logged
//! occurrence, falling back to the vehicle's acquisition date and initial mileage.
//! A service type is *upcoming* within [`UPCOMING_THRESHOLD_DAYS`] days or
//! [`UPCOMING_THRESHOLD_KM`] km of being due (both inclusive), and *overdue*
//! when the remaining amount is zero or less.
//!
//! ```rust
//! use carlog::prelude::*;
//! use chrono::NaiveDate;
//!
//! let interval = EffectiveInterval { km: Some(10_000), days: None };
//! let last = LastPerformed { date: None, mileage: Some(50_000) };
//! let vehicle: Vehicle = serde_json::from_str(r#"{"id":1,"make":"VW","model":"Golf"}"#).unwrap();
//! let today = NaiveDate::from_ymd_opt(2024, 4, 15).unwrap();
//!
//! let due = compute_due_status(interval, Some(last), &vehicle, 59_500, today).unwrap();
//! assert_eq!(due.status, AdvisoryStatus::Upcoming);
//! assert_eq!(due.message, "Upcoming in 500 km.");
//! ```

use std::cmp::Ordering;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::prelude::*;

/// Days before the due date at which a service becomes "upcoming"
pub const UPCOMING_THRESHOLD_DAYS: i64 = 30;

/// Kilometers before the due mileage at which a service becomes "upcoming"
pub const UPCOMING_THRESHOLD_KM: i64 = 1000;

/// Maintenance interval after override resolution. `None` means no cadence
/// for that dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EffectiveInterval {
    pub km: Option<i64>,
    pub days: Option<i64>,
}

impl EffectiveInterval {
    // negative intervals count as unmanaged, same as zero or null
    fn usable_km(&self) -> Option<i64> {
        self.km.filter(|km| *km > 0)
    }

    fn usable_days(&self) -> Option<i64> {
        self.days.filter(|days| *days > 0)
    }

    /// True if neither dimension has a usable (positive) interval.
    /// Unmanaged service types never produce advisory items.
    pub fn is_unmanaged(&self) -> bool {
        self.usable_km().is_none() && self.usable_days().is_none()
    }
}

/// Effective interval for a service type on a vehicle.
///
/// Each dimension of the override wins when it is set. A `None` dimension in
/// the override falls back to the recommendation; it never cancels it.
pub fn resolve_interval(
    service_type: &ServiceType,
    override_: Option<&IntervalOverride>,
) -> EffectiveInterval {
    EffectiveInterval {
        km: override_
            .and_then(|ov| ov.override_interval_km)
            .or(service_type.recommended_interval_km),
        days: override_
            .and_then(|ov| ov.override_interval_days)
            .or(service_type.recommended_interval_days),
    }
}

/// Advisory status of one service type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString)]
pub enum AdvisoryStatus {
    /// Nothing due soon. Never appears in an advisory list.
    #[strum(serialize = "OK")]
    Ok,
    Upcoming,
    Overdue,
    /// No log exists for this service type
    NeverDone,
}

impl AdvisoryStatus {
    /// Display ordering: most urgent first.
    pub fn urgency(self) -> u8 {
        match self {
            Self::Overdue => 0,
            Self::NeverDone => 1,
            Self::Upcoming => 2,
            Self::Ok => 3,
        }
    }
}

/// Date-based due information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateDue {
    pub due: NaiveDate,
    /// Whole days from today to the due date. Zero or negative when overdue.
    pub remaining_days: i64,
}

/// Mileage-based due information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MileageDue {
    pub due: i64,
    /// Kilometers left until due. Zero or negative when overdue.
    pub remaining_km: i64,
}

/// Date and mileage of the most recent log of a service type. Either may be
/// unknown even when logs exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LastPerformed {
    pub date: Option<NaiveDate>,
    pub mileage: Option<i64>,
}

impl From<&ServiceTypeLogSummary> for LastPerformed {
    fn from(summary: &ServiceTypeLogSummary) -> Self {
        Self {
            date: summary.last_log_date,
            mileage: summary.last_log_mileage,
        }
    }
}

/// Result of [`compute_due_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueStatus {
    pub status: AdvisoryStatus,
    pub message: String,
    pub by_date: Option<DateDue>,
    pub by_mileage: Option<MileageDue>,
}

/// An actionable maintenance item for one service type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisoryItem {
    pub service_type_id: i64,
    pub service_type_name: String,
    pub status: AdvisoryStatus,
    pub message: String,
    pub by_date: Option<DateDue>,
    pub by_mileage: Option<MileageDue>,
    pub last_performed: LastPerformed,
}

/// Computes the due status of one service type.
///
/// `last_performed` is `None` when the service type has never been logged on
/// this vehicle, which yields [`AdvisoryStatus::NeverDone`] regardless of
/// dates and mileage. `today` is a calendar date, so times of day never affect
/// the result.
///
/// Returns `None` if the interval has no usable dimension.
pub fn compute_due_status(
    interval: EffectiveInterval,
    last_performed: Option<LastPerformed>,
    vehicle: &Vehicle,
    current_mileage: i64,
    today: NaiveDate,
) -> Option<DueStatus> {
    if interval.is_unmanaged() {
        return None;
    }
    let last = last_performed.unwrap_or_default();
    let base_date = last.date.or(vehicle.acquisition_date);
    let base_mileage = last.mileage.or(vehicle.initial_mileage);

    let by_date = match (interval.usable_days(), base_date) {
        (Some(days), Some(base)) => u64::try_from(days)
            .ok()
            .and_then(|days| base.checked_add_days(Days::new(days)))
            .map(|due| DateDue {
                due,
                remaining_days: (due - today).num_days(),
            }),
        _ => None,
    };
    let by_mileage = match (interval.usable_km(), base_mileage) {
        (Some(km), Some(base)) => base.checked_add(km).map(|due| MileageDue {
            due,
            remaining_km: due.saturating_sub(current_mileage),
        }),
        _ => None,
    };

    let overdue_by_date = by_date.filter(|d| d.remaining_days <= 0);
    let overdue_by_km = by_mileage.filter(|m| m.remaining_km <= 0);
    let upcoming_by_date =
        by_date.filter(|d| d.remaining_days > 0 && d.remaining_days <= UPCOMING_THRESHOLD_DAYS);
    let upcoming_by_km =
        by_mileage.filter(|m| m.remaining_km > 0 && m.remaining_km <= UPCOMING_THRESHOLD_KM);

    let (status, message) = if last_performed.is_none() {
        let mut estimate = String::new();
        if let Some(d) = by_date {
            estimate.push_str(&format!(" Est. due {}.", format_date(d.due)));
        }
        if let Some(m) = by_mileage {
            estimate.push_str(&format!(" Est. due at {} km.", format_km(m.due)));
        }
        let message = if estimate.is_empty() {
            "Interval set, but never performed.".to_string()
        } else {
            format!("Never performed.{estimate}")
        };
        (AdvisoryStatus::NeverDone, message)
    } else if overdue_by_date.is_some() || overdue_by_km.is_some() {
        let reasons: Vec<String> = [
            overdue_by_date
                .map(|d| format!("by date ({} days ago)", d.remaining_days.unsigned_abs())),
            overdue_by_km.map(|m| {
                format!(
                    "by mileage ({} km ago)",
                    group_thousands(m.remaining_km.unsigned_abs())
                )
            }),
        ]
        .into_iter()
        .flatten()
        .collect();
        (
            AdvisoryStatus::Overdue,
            format!("Overdue {}.", reasons.join(" and ")),
        )
    } else if upcoming_by_date.is_some() || upcoming_by_km.is_some() {
        let reasons: Vec<String> = [
            upcoming_by_date.map(|d| format!("in {} days", d.remaining_days)),
            upcoming_by_km.map(|m| format!("in {} km", format_km(m.remaining_km))),
        ]
        .into_iter()
        .flatten()
        .collect();
        (
            AdvisoryStatus::Upcoming,
            format!("Upcoming {}.", reasons.join(" or ")),
        )
    } else {
        (AdvisoryStatus::Ok, "Service is up to date.".to_string())
    };

    Some(DueStatus {
        status,
        message,
        by_date,
        by_mileage,
    })
}

/// Builds the advisory list for a vehicle.
///
/// Items follow the order of `service_types`. Unmanaged service types and
/// service types that are OK are left out. Summaries and overrides are matched
/// by service type id; the first match wins.
pub fn build_advisory(
    vehicle: &Vehicle,
    current_mileage: i64,
    summaries: &[ServiceTypeLogSummary],
    service_types: &[ServiceType],
    today: NaiveDate,
) -> Vec<AdvisoryItem> {
    service_types
        .iter()
        .filter_map(|st| {
            let interval = resolve_interval(st, vehicle.override_for(st.id));
            let last_performed = summaries
                .iter()
                .find(|s| s.service_type_id == st.id)
                .map(LastPerformed::from);
            let due = compute_due_status(interval, last_performed, vehicle, current_mileage, today)?;
            if due.status == AdvisoryStatus::Ok {
                return None;
            }
            Some(AdvisoryItem {
                service_type_id: st.id,
                service_type_name: st.name.clone(),
                status: due.status,
                message: due.message,
                by_date: due.by_date,
                by_mileage: due.by_mileage,
                last_performed: last_performed.unwrap_or_default(),
            })
        })
        .collect()
}

/// Sorts items most urgent first. Within a status, the item due soonest comes first.
pub fn sort_by_urgency(items: &mut [AdvisoryItem]) {
    fn soonest(item: &AdvisoryItem) -> i64 {
        // compare days and km on one scale: a day is roughly UPCOMING_THRESHOLD_KM / 30 km
        let by_days = item
            .by_date
            .map(|d| d.remaining_days * UPCOMING_THRESHOLD_KM / UPCOMING_THRESHOLD_DAYS);
        let by_km = item.by_mileage.map(|m| m.remaining_km);
        match (by_days, by_km) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => i64::MAX,
        }
    }
    items.sort_by(|a, b| match a.status.urgency().cmp(&b.status.urgency()) {
        Ordering::Equal => soonest(a).cmp(&soonest(b)),
        other => other,
    });
}

/// "Mar 31, 2024"
pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Thousands-separated kilometers: 10000 -> "10,000"
pub(crate) fn format_km(km: i64) -> String {
    let digits = group_thousands(km.unsigned_abs());
    if km < 0 {
        format!("-{digits}")
    } else {
        digits
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn vehicle(overrides: serde_json::Value) -> Vehicle {
        serde_json::from_value(json!({
            "id": 1,
            "make": "Toyota",
            "model": "Corolla",
            "initial_mileage": 40000,
            "acquisition_date": "2023-01-01",
            "interval_overrides": overrides
        }))
        .unwrap()
    }

    fn service_type(id: i64, km: Option<i64>, days: Option<i64>) -> ServiceType {
        serde_json::from_value(json!({
            "id": id,
            "name": format!("Service {id}"),
            "recommended_interval_km": km,
            "recommended_interval_days": days,
            "fields": []
        }))
        .unwrap()
    }

    fn summary(id: i64, date: Option<&str>, mileage: Option<i64>) -> ServiceTypeLogSummary {
        serde_json::from_value(json!({
            "service_type_id": id,
            "service_type_name": format!("Service {id}"),
            "log_count": 1,
            "last_log_date": date,
            "last_log_mileage": mileage,
            "total_cost_for_service_type": 50.0
        }))
        .unwrap()
    }

    fn last(date: Option<NaiveDate>, mileage: Option<i64>) -> Option<LastPerformed> {
        Some(LastPerformed { date, mileage })
    }

    #[test]
    fn test_resolve_override_wins() {
        let st = service_type(1, Some(10000), Some(365));
        let ov = IntervalOverride {
            service_type_id: 1,
            override_interval_km: Some(7500),
            override_interval_days: None,
            ..Default::default()
        };
        assert_eq!(
            resolve_interval(&st, Some(&ov)),
            EffectiveInterval {
                km: Some(7500),
                days: Some(365)
            }
        );
        assert_eq!(
            resolve_interval(&st, None),
            EffectiveInterval {
                km: Some(10000),
                days: Some(365)
            }
        );
    }

    #[test]
    fn test_resolve_null_override_falls_back() {
        let st = service_type(1, Some(8000), None);
        let ov = IntervalOverride {
            service_type_id: 1,
            override_interval_km: None,
            override_interval_days: None,
            ..Default::default()
        };
        let interval = resolve_interval(&st, Some(&ov));
        assert_eq!(interval.km, Some(8000));
        assert_eq!(interval.days, None);
    }

    #[test]
    fn test_overdue_by_date() {
        let interval = EffectiveInterval {
            km: None,
            days: Some(90),
        };
        let due = compute_due_status(
            interval,
            last(Some(date(2024, 1, 1)), None),
            &vehicle(json!([])),
            0,
            date(2024, 4, 15),
        )
        .unwrap();
        assert_eq!(due.status, AdvisoryStatus::Overdue);
        let by_date = due.by_date.unwrap();
        assert_eq!(by_date.due, date(2024, 3, 31));
        assert_eq!(by_date.remaining_days, -15);
        assert_eq!(due.message, "Overdue by date (15 days ago).");
    }

    #[test]
    fn test_upcoming_by_mileage() {
        let interval = EffectiveInterval {
            km: Some(10000),
            days: None,
        };
        let due = compute_due_status(
            interval,
            last(None, Some(50000)),
            &vehicle(json!([])),
            59500,
            date(2024, 4, 15),
        )
        .unwrap();
        assert_eq!(due.status, AdvisoryStatus::Upcoming);
        assert_eq!(due.by_mileage.unwrap().remaining_km, 500);
        assert_eq!(due.message, "Upcoming in 500 km.");
    }

    #[test]
    fn test_upcoming_km_boundary_inclusive() {
        let interval = EffectiveInterval {
            km: Some(5000),
            days: None,
        };
        let v = vehicle(json!([]));
        let today = date(2024, 4, 15);
        let due = compute_due_status(interval, last(None, Some(20000)), &v, 24000, today).unwrap();
        assert_eq!(due.by_mileage.unwrap().remaining_km, 1000);
        assert_eq!(due.status, AdvisoryStatus::Upcoming);
        assert_eq!(due.message, "Upcoming in 1,000 km.");

        let due = compute_due_status(interval, last(None, Some(20000)), &v, 23999, today).unwrap();
        assert_eq!(due.status, AdvisoryStatus::Ok);

        let due = compute_due_status(interval, last(None, Some(20000)), &v, 25000, today).unwrap();
        assert_eq!(due.status, AdvisoryStatus::Overdue);
        assert_eq!(due.message, "Overdue by mileage (0 km ago).");
    }

    #[test]
    fn test_upcoming_days_boundary() {
        let interval = EffectiveInterval {
            km: None,
            days: Some(60),
        };
        let v = vehicle(json!([]));
        // due 2024-03-01, today 30 days before
        let due = compute_due_status(
            interval,
            last(Some(date(2024, 1, 1)), None),
            &v,
            0,
            date(2024, 1, 31),
        )
        .unwrap();
        assert_eq!(due.by_date.unwrap().remaining_days, 30);
        assert_eq!(due.status, AdvisoryStatus::Upcoming);
        assert_eq!(due.message, "Upcoming in 30 days.");

        let due = compute_due_status(
            interval,
            last(Some(date(2024, 1, 1)), None),
            &v,
            0,
            date(2024, 1, 30),
        )
        .unwrap();
        assert_eq!(due.status, AdvisoryStatus::Ok);
    }

    #[test]
    fn test_overdue_both_dimensions() {
        let interval = EffectiveInterval {
            km: Some(10000),
            days: Some(180),
        };
        let due = compute_due_status(
            interval,
            last(Some(date(2023, 6, 1)), Some(30000)),
            &vehicle(json!([])),
            41500,
            date(2024, 1, 1),
        )
        .unwrap();
        assert_eq!(due.status, AdvisoryStatus::Overdue);
        assert_eq!(
            due.message,
            "Overdue by date (34 days ago) and by mileage (1,500 km ago)."
        );
    }

    #[test]
    fn test_upcoming_both_dimensions() {
        let interval = EffectiveInterval {
            km: Some(10000),
            days: Some(365),
        };
        let due = compute_due_status(
            interval,
            last(Some(date(2023, 1, 20)), Some(30000)),
            &vehicle(json!([])),
            39200,
            date(2024, 1, 1),
        )
        .unwrap();
        assert_eq!(due.status, AdvisoryStatus::Upcoming);
        assert_eq!(due.message, "Upcoming in 19 days or in 800 km.");
    }

    #[test]
    fn test_overdue_wins_over_upcoming() {
        let interval = EffectiveInterval {
            km: Some(10000),
            days: Some(365),
        };
        let due = compute_due_status(
            interval,
            last(Some(date(2023, 1, 20)), Some(30000)),
            &vehicle(json!([])),
            40100,
            date(2024, 1, 1),
        )
        .unwrap();
        assert_eq!(due.status, AdvisoryStatus::Overdue);
        assert_eq!(due.message, "Overdue by mileage (100 km ago).");
    }

    #[test]
    fn test_never_done_with_estimates() {
        let interval = EffectiveInterval {
            km: Some(10000),
            days: Some(365),
        };
        // baseline from vehicle: 2023-01-01 and 40000 km
        let due = compute_due_status(interval, None, &vehicle(json!([])), 40100, date(2023, 2, 1))
            .unwrap();
        assert_eq!(due.status, AdvisoryStatus::NeverDone);
        assert_eq!(
            due.message,
            "Never performed. Est. due Jan 1, 2024. Est. due at 50,000 km."
        );
    }

    #[test]
    fn test_never_done_without_baseline() {
        let v: Vehicle =
            serde_json::from_value(json!({"id": 2, "make": "Fiat", "model": "Panda"})).unwrap();
        let interval = EffectiveInterval {
            km: Some(10000),
            days: None,
        };
        let due = compute_due_status(interval, None, &v, 0, date(2024, 1, 1)).unwrap();
        assert_eq!(due.status, AdvisoryStatus::NeverDone);
        assert_eq!(due.message, "Interval set, but never performed.");
        assert!(due.by_mileage.is_none());
    }

    #[test]
    fn test_never_done_regardless_of_mileage_and_date() {
        let interval = EffectiveInterval {
            km: Some(1000),
            days: Some(1),
        };
        let v = vehicle(json!([]));
        for (mileage, today) in [
            (0, date(2000, 1, 1)),
            (40000, date(2023, 1, 1)),
            (1_000_000, date(2099, 12, 31)),
        ] {
            let due = compute_due_status(interval, None, &v, mileage, today).unwrap();
            assert_eq!(due.status, AdvisoryStatus::NeverDone);
        }
    }

    #[test]
    fn test_summary_without_dates_uses_vehicle_baseline() {
        let interval = EffectiveInterval {
            km: Some(5000),
            days: None,
        };
        // logged, but last mileage unknown: baseline falls back to initial mileage 40000
        let due = compute_due_status(
            interval,
            last(None, None),
            &vehicle(json!([])),
            44500,
            date(2024, 1, 1),
        )
        .unwrap();
        assert_eq!(due.status, AdvisoryStatus::Upcoming);
        assert_eq!(due.by_mileage.unwrap().due, 45000);
    }

    #[test]
    fn test_missing_baseline_skips_dimension() {
        let v: Vehicle =
            serde_json::from_value(json!({"id": 2, "make": "Fiat", "model": "Panda"})).unwrap();
        let interval = EffectiveInterval {
            km: Some(5000),
            days: Some(30),
        };
        let due =
            compute_due_status(interval, last(None, Some(1000)), &v, 1200, date(2024, 1, 1)).unwrap();
        assert!(due.by_date.is_none());
        assert_eq!(due.status, AdvisoryStatus::Ok);
    }

    #[test]
    fn test_saturated_mileage_does_not_panic() {
        let interval = EffectiveInterval {
            km: Some(5000),
            days: None,
        };
        let due = compute_due_status(
            interval,
            last(Some(date(2024, 1, 1)), Some(0)),
            &vehicle(json!([])),
            i64::MAX,
            date(2024, 1, 2),
        )
        .unwrap();
        assert_eq!(due.status, AdvisoryStatus::Overdue);
        assert_eq!(due.by_mileage.unwrap().remaining_km, i64::MIN + 5001);

        let due = compute_due_status(
            interval,
            last(Some(date(2024, 1, 1)), Some(i64::MIN)),
            &vehicle(json!([])),
            i64::MAX,
            date(2024, 1, 2),
        )
        .unwrap();
        assert_eq!(due.by_mileage.unwrap().remaining_km, i64::MIN);
        assert!(due.message.contains("9,223,372,036,854,775,808 km ago"));
    }

    #[test]
    fn test_negative_interval_is_unmanaged() {
        let interval = EffectiveInterval {
            km: Some(-5000),
            days: Some(-30),
        };
        assert!(interval.is_unmanaged());
    }

    #[test]
    fn test_zero_interval_is_unmanaged() {
        let interval = EffectiveInterval {
            km: Some(0),
            days: None,
        };
        assert!(interval.is_unmanaged());
        assert!(
            compute_due_status(interval, None, &vehicle(json!([])), 0, date(2024, 1, 1)).is_none()
        );
    }

    #[test]
    fn test_build_excludes_unmanaged_and_ok() {
        let v = vehicle(json!([]));
        let service_types = vec![
            service_type(1, None, None),          // unmanaged, never done
            service_type(2, None, None),          // unmanaged, with history
            service_type(3, Some(10000), None),   // ok
            service_type(4, Some(10000), None),   // never done
            service_type(5, None, Some(90)),      // overdue
        ];
        let summaries = vec![
            summary(2, Some("2020-01-01"), Some(1000)),
            summary(3, Some("2024-01-01"), Some(50000)),
            summary(5, Some("2024-01-01"), Some(50000)),
        ];
        let items = build_advisory(&v, 52000, &summaries, &service_types, date(2024, 4, 15));
        let ids: Vec<i64> = items.iter().map(|i| i.service_type_id).collect();
        assert_eq!(ids, vec![4, 5]);
        assert_eq!(items[0].status, AdvisoryStatus::NeverDone);
        assert_eq!(items[0].last_performed, LastPerformed::default());
        assert_eq!(items[1].status, AdvisoryStatus::Overdue);
        assert_eq!(items[1].last_performed.mileage, Some(50000));
        assert_eq!(items[1].service_type_name, "Service 5");
    }

    #[test]
    fn test_build_applies_override() {
        let v = vehicle(json!([
            {"id": 1, "vehicle_id": 1, "service_type_id": 3,
             "override_interval_km": 2500, "override_interval_days": null}
        ]));
        let service_types = vec![service_type(3, Some(10000), None)];
        let summaries = vec![summary(3, Some("2024-01-01"), Some(50000))];
        let items = build_advisory(&v, 52000, &summaries, &service_types, date(2024, 4, 15));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status, AdvisoryStatus::Upcoming);
        assert_eq!(items[0].by_mileage.unwrap().due, 52500);
    }

    #[test]
    fn test_build_override_cannot_unmanage() {
        // null override dimensions fall back to the recommendation
        let v = vehicle(json!([
            {"service_type_id": 3, "override_interval_km": null, "override_interval_days": null}
        ]));
        let service_types = vec![service_type(3, Some(8000), None)];
        let items = build_advisory(&v, 40000, &[], &service_types, date(2024, 1, 1));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status, AdvisoryStatus::NeverDone);
    }

    #[test]
    fn test_build_is_deterministic() {
        let v = vehicle(json!([]));
        let service_types = vec![
            service_type(1, Some(5000), Some(180)),
            service_type(2, Some(1000), None),
        ];
        let summaries = vec![summary(1, Some("2023-10-01"), Some(44000))];
        let today = date(2024, 3, 1);
        let a = build_advisory(&v, 48500, &summaries, &service_types, today);
        let b = build_advisory(&v, 48500, &summaries, &service_types, today);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sort_by_urgency() {
        let v = vehicle(json!([]));
        let service_types = vec![
            service_type(1, Some(10000), None), // upcoming
            service_type(2, Some(10000), None), // never done
            service_type(3, Some(10000), None), // overdue
        ];
        let summaries = vec![
            summary(1, None, Some(40000)),
            summary(3, None, Some(30000)),
        ];
        let mut items = build_advisory(&v, 49500, &summaries, &service_types, date(2024, 1, 1));
        sort_by_urgency(&mut items);
        let statuses: Vec<AdvisoryStatus> = items.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![
                AdvisoryStatus::Overdue,
                AdvisoryStatus::NeverDone,
                AdvisoryStatus::Upcoming
            ]
        );
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_km(0), "0");
        assert_eq!(format_km(999), "999");
        assert_eq!(format_km(1000), "1,000");
        assert_eq!(format_km(1234567), "1,234,567");
        assert_eq!(format_km(-1500), "-1,500");
        assert_eq!(format_km(i64::MIN), "-9,223,372,036,854,775,808");
        assert_eq!(format_date(date(2024, 3, 31)), "Mar 31, 2024");
        assert_eq!(AdvisoryStatus::Ok.to_string(), "OK");
        assert_eq!(AdvisoryStatus::NeverDone.to_string(), "NeverDone");
    }
}
