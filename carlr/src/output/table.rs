use carlog::prelude::*;

pub trait TableRow {
    fn headers() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

pub fn render_table<T: TableRow>(items: &[T]) -> String {
    let headers = T::headers();
    let rows: Vec<Vec<String>> = items.iter().map(TableRow::row).collect();
    let widths = column_widths(headers, &rows);

    let mut out = String::new();
    out.push_str(&format_row(
        &headers.iter().map(ToString::to_string).collect::<Vec<_>>(),
        &widths,
    ));
    out.push('\n');
    out.push_str(&format_separator(&widths));

    for row in rows {
        out.push('\n');
        out.push_str(&format_row(&row, &widths));
    }

    out
}

fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            if idx >= widths.len() {
                widths.push(len);
            } else {
                widths[idx] = widths[idx].max(len);
            }
        }
    }
    widths
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    use std::fmt::Write as _;
    let mut out = String::new();
    for (idx, cell) in row.iter().enumerate() {
        if idx > 0 {
            out.push_str("  ");
        }
        // last column is not padded
        if idx + 1 == row.len() {
            out.push_str(cell);
            continue;
        }
        let width = widths.get(idx).copied().unwrap_or(0);
        let _ = write!(out, "{cell:<width$}");
    }
    out
}

fn format_separator(widths: &[usize]) -> String {
    let mut out = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            out.push_str("  ");
        }
        out.push_str(&"-".repeat(*width));
    }
    out
}

fn opt<T: ToString>(val: Option<T>) -> String {
    val.map(|v| v.to_string()).unwrap_or_default()
}

impl TableRow for Vehicle {
    fn headers() -> &'static [&'static str] {
        &["id", "make", "model", "year", "vin", "initial km", "acquired"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.make.clone(),
            self.model.clone(),
            opt(self.year),
            self.vin.clone().unwrap_or_default(),
            opt(self.initial_mileage),
            opt(self.acquisition_date),
        ]
    }
}

impl TableRow for ServiceType {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "interval km", "interval days", "fields"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            opt(self.recommended_interval_km),
            opt(self.recommended_interval_days),
            self.fields
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ]
    }
}

impl TableRow for CustomField {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "type", "unit"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.field_type.to_string(),
            self.unit.clone().unwrap_or_default(),
        ]
    }
}

impl TableRow for MaintenanceLog {
    fn headers() -> &'static [&'static str] {
        &["id", "date", "service type", "mileage", "cost", "notes"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.date.to_string(),
            self.service_type_name().unwrap_or("Uncategorized").to_string(),
            self.mileage.to_string(),
            format!("{:.2}", self.cost),
            self.notes.clone().unwrap_or_default(),
        ]
    }
}

impl TableRow for CostShare {
    fn headers() -> &'static [&'static str] {
        &["service type", "total cost", "share"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            format!("{:.2}", self.total_cost),
            format!("{:.0}%", self.share * 100.0),
        ]
    }
}

impl TableRow for NewVehicleEntry {
    fn headers() -> &'static [&'static str] {
        &["backup id", "vehicle", "vin", "logs"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id_in_backup.to_string(),
            self.display_name(),
            self.vin.clone().unwrap_or_default(),
            self.log_count.to_string(),
        ]
    }
}

impl TableRow for ConflictingVehicle {
    fn headers() -> &'static [&'static str] {
        &["vin", "vehicle", "existing id"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.vin.clone(),
            self.display_name(),
            self.existing_vehicle_id.to_string(),
        ]
    }
}
