//! CSV export of a vehicle's log history.
//!
//! Columns are `Date, Service Type, Mileage, Cost, Notes`, followed by one
//! column per custom field name seen in any log, sorted alphabetically.
//! Cells a log has no value for are left empty. A custom field named like a
//! fixed column gets a ` (custom)` suffix in the header.

use std::{collections::BTreeSet, io::Write};

use chrono::NaiveDate;
use snafu::ResultExt;

use crate::{Result, error::CsvSnafu, prelude::*};

/// Fixed leading columns
pub const BASE_COLUMNS: [&str; 5] = ["Date", "Service Type", "Mileage", "Cost", "Notes"];

/// Service type column value for logs whose service type was deleted
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Writes logs as CSV to `writer`.
///
/// # Errors
/// - [`CarlogError::Validation`] if `logs` is empty
/// - [`CarlogError::Csv`] if writing fails
pub fn write_logs_csv<W: Write>(logs: &[MaintenanceLog], writer: W) -> Result<()> {
    if logs.is_empty() {
        return Err(CarlogError::validation("no maintenance logs to export"));
    }

    let custom_columns: BTreeSet<&str> = logs
        .iter()
        .flat_map(|log| log.custom_field_values.iter())
        .filter_map(|v| v.field_name())
        .filter(|name| !name.is_empty())
        .collect();

    let mut wtr = csv::Writer::from_writer(writer);
    let custom_headers = custom_columns.iter().map(|name| custom_header(name));
    wtr.write_record(BASE_COLUMNS.iter().map(ToString::to_string).chain(custom_headers))
        .context(CsvSnafu)?;

    for log in logs {
        let mut record = vec![
            log.date.to_string(),
            log.service_type_name().unwrap_or(UNCATEGORIZED).to_string(),
            log.mileage.to_string(),
            log.cost.to_string(),
            log.notes.clone().unwrap_or_default(),
        ];
        record.extend(
            custom_columns
                .iter()
                .map(|name| log.custom_value(name).unwrap_or_default().to_string()),
        );
        wtr.write_record(&record).context(CsvSnafu)?;
    }
    wtr.flush().map_err(|e| CarlogError::Csv { source: e.into() })?;
    Ok(())
}

fn custom_header(name: &str) -> String {
    if BASE_COLUMNS.iter().any(|base| base.eq_ignore_ascii_case(name)) {
        format!("{name} (custom)")
    } else {
        name.to_string()
    }
}

/// Renders logs as a CSV string.
pub fn logs_to_csv(logs: &[MaintenanceLog]) -> Result<String> {
    let mut buf = Vec::new();
    write_logs_csv(logs, &mut buf)?;
    String::from_utf8(buf).map_err(|e| CarlogError::Other {
        message: format!("csv output is not utf-8: {e}"),
    })
}

/// Suggested file name: `toyota_corolla_maintenance_history_2024-05-02.csv`
pub fn default_csv_file_name(vehicle_name: &str, today: NaiveDate) -> String {
    let safe: String = vehicle_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let safe = if safe.is_empty() { "vehicle".to_string() } else { safe };
    format!("{safe}_maintenance_history_{today}.csv")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn logs() -> Vec<MaintenanceLog> {
        serde_json::from_value(json!([
            {
                "id": 2, "vehicle_id": 1, "date": "2024-02-01", "mileage": 52000, "cost": 80.5,
                "notes": "used \"5W-30\", filter too",
                "service_type_id": 1,
                "service_type": {"id": 1, "name": "Oil change", "fields": []},
                "custom_field_values": [
                    {"id": 1, "field_id": 3, "value": "Castrol",
                     "custom_field": {"id": 3, "name": "Oil brand", "field_type": "text", "unit": null}},
                    {"id": 2, "field_id": 4, "value": "4.5",
                     "custom_field": {"id": 4, "name": "Amount", "field_type": "number", "unit": "L"}}
                ]
            },
            {
                "id": 1, "vehicle_id": 1, "date": "2023-08-15", "mileage": 45000, "cost": 300.0,
                "notes": null, "service_type_id": null, "service_type": null,
                "custom_field_values": [
                    {"id": 3, "field_id": 9, "value": "front",
                     "custom_field": {"id": 9, "name": "Axle", "field_type": "text", "unit": null}}
                ]
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_csv_columns_and_rows() {
        let csv = logs_to_csv(&logs()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Date,Service Type,Mileage,Cost,Notes,Amount,Axle,Oil brand"
        );
        assert_eq!(
            lines[1],
            r#"2024-02-01,Oil change,52000,80.5,"used ""5W-30"", filter too",4.5,,Castrol"#
        );
        assert_eq!(lines[2], "2023-08-15,Uncategorized,45000,300,,,front,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_csv_custom_field_named_like_base_column() {
        let logs: Vec<MaintenanceLog> = serde_json::from_value(json!([{
            "id": 1, "vehicle_id": 1, "date": "2024-02-01", "mileage": 52000, "cost": 10.0,
            "notes": "log notes", "service_type_id": null, "service_type": null,
            "custom_field_values": [
                {"id": 1, "field_id": 3, "value": "field notes",
                 "custom_field": {"id": 3, "name": "Notes", "field_type": "text", "unit": null}},
                {"id": 2, "field_id": 4, "value": "2",
                 "custom_field": {"id": 4, "name": "cost", "field_type": "number", "unit": null}}
            ]
        }]))
        .unwrap();
        let csv = logs_to_csv(&logs).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Date,Service Type,Mileage,Cost,Notes,Notes (custom),cost (custom)"
        );
        assert_eq!(lines[1], "2024-02-01,Uncategorized,52000,10,log notes,field notes,2");
    }

    #[test]
    fn test_csv_empty_is_error() {
        let err = logs_to_csv(&[]).unwrap_err();
        assert!(matches!(err, CarlogError::Validation { .. }));
    }

    #[test]
    fn test_default_file_name() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        assert_eq!(
            default_csv_file_name("2019 Toyota Corolla", today),
            "2019_toyota_corolla_maintenance_history_2024-05-02.csv"
        );
        assert_eq!(
            default_csv_file_name("", today),
            "vehicle_maintenance_history_2024-05-02.csv"
        );
    }
}
