//! advise, stats, and export-csv
//!

use std::path::PathBuf;

use anyhow::Result;
use carlog::{advisory::sort_by_urgency, csv_export::default_csv_file_name, prelude::*};
use chrono::NaiveDate;
use serde::Serialize;

use super::{AdviseArgs, ExportCsvArgs, StatsArgs};
use crate::{
    cli::{
        AppContext,
        common::{resolve_vehicle, today},
    },
    output::{OutputFormat, TableRow},
};

/// One advisory item, labeled with its vehicle
#[derive(Debug, Serialize)]
pub struct AdvisoryRow {
    pub vehicle_id: i64,
    pub vehicle: String,
    #[serde(flatten)]
    pub item: AdvisoryItem,
}

impl TableRow for AdvisoryRow {
    fn headers() -> &'static [&'static str] {
        &["vehicle", "service type", "status", "message"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.vehicle.clone(),
            self.item.service_type_name.clone(),
            self.item.status.to_string(),
            self.item.message.clone(),
        ]
    }
}

pub async fn advise(ctx: &AppContext, args: AdviseArgs) -> Result<()> {
    let today = args.today.unwrap_or_else(today);
    let vehicles = match &args.vehicle {
        Some(vehicle) => vec![resolve_vehicle(ctx, vehicle).await?],
        None => ctx.client.vehicles().list().await?,
    };
    let service_types = ctx.client.service_types().list().await?;

    let mut rows = Vec::new();
    for vehicle in &vehicles {
        let current_mileage = match args.mileage {
            Some(km) => km,
            None => {
                let logs = ctx.client.vehicle_logs(vehicle.id).list().await?;
                VehicleStats::compute(vehicle, &logs, today).current_mileage
            }
        };
        let summaries = ctx.client.maintenance_summary(vehicle.id).await?;
        let mut items = build_advisory(vehicle, current_mileage, &summaries, &service_types, today);
        sort_by_urgency(&mut items);
        rows.extend(items.into_iter().map(|item| AdvisoryRow {
            vehicle_id: vehicle.id,
            vehicle: vehicle.display_name(),
            item,
        }));
    }

    if rows.is_empty() && ctx.output.format() == OutputFormat::Table {
        return ctx.output.emit_text("No upcoming or overdue maintenance.");
    }
    ctx.output.emit_table(&rows)
}

#[derive(Debug, Serialize)]
struct StatsReport<'a> {
    vehicle: &'a Vehicle,
    #[serde(flatten)]
    stats: &'a VehicleStats,
    cost_breakdown: &'a [CostShare],
}

pub async fn stats(ctx: &AppContext, args: StatsArgs) -> Result<()> {
    let today = args.today.unwrap_or_else(today);
    let vehicle = resolve_vehicle(ctx, &args.vehicle).await?;
    let logs = ctx.client.vehicle_logs(vehicle.id).list().await?;
    let summaries = ctx.client.maintenance_summary(vehicle.id).await?;
    let stats = VehicleStats::compute(&vehicle, &logs, today);
    let breakdown = cost_breakdown(&summaries);

    if ctx.output.format() == OutputFormat::Table {
        let mut text = stats_text(&vehicle, &stats);
        if !breakdown.is_empty() {
            text.push('\n');
            text.push_str(&crate::output::render_table(&breakdown));
        }
        return ctx.output.emit_text(&text);
    }
    ctx.output.emit_json(&StatsReport {
        vehicle: &vehicle,
        stats: &stats,
        cost_breakdown: &breakdown,
    })
}

fn stats_text(vehicle: &Vehicle, stats: &VehicleStats) -> String {
    let date = |d: Option<NaiveDate>| d.map_or_else(|| "never".to_string(), |d| d.to_string());
    let money = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
    let mut lines = vec![
        vehicle.display_name(),
        format!("current mileage:   {} km", stats.current_mileage),
        format!("last service:      {}", date(stats.last_service_date)),
    ];
    if let Some(days) = stats.days_since_last_service {
        lines.push(format!("days since:        {days}"));
    }
    lines.extend([
        format!("logs:              {}", stats.total_logs),
        format!("total cost:        {:.2}", stats.total_cost),
        format!("average cost:      {:.2}", stats.average_cost),
        format!("cost per km:       {}", money(stats.cost_per_km)),
        format!("cost per year:     {}", money(stats.cost_per_year)),
    ]);
    if let Some(age) = stats.vehicle_age_years {
        lines.push(format!("vehicle age:       {age} years"));
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

pub async fn export_csv(ctx: &AppContext, args: ExportCsvArgs) -> Result<()> {
    let vehicle = resolve_vehicle(ctx, &args.vehicle).await?;
    let logs = ctx.client.vehicle_logs(vehicle.id).list().await?;
    let csv = logs_to_csv(&logs)?;
    let default_path = args.file.unwrap_or_else(|| {
        PathBuf::from(default_csv_file_name(&vehicle.display_name(), today()))
    });
    let path = ctx.output.write_file(default_path, csv.as_bytes())?;
    ctx.output.emit_status(&format!(
        "wrote {} log(s) for {} to {}",
        logs.len(),
        vehicle.display_name(),
        path.display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_stats_text() {
        let vehicle: Vehicle =
            serde_json::from_value(json!({"id": 1, "make": "Fiat", "model": "Uno"})).unwrap();
        let stats = VehicleStats::compute(&vehicle, &[], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let text = stats_text(&vehicle, &stats);
        assert!(text.starts_with("Fiat Uno\n"));
        assert!(text.contains("last service:      never"));
        assert!(text.contains("cost per km:       -"));
        assert!(!text.contains("vehicle age"));
    }
}
