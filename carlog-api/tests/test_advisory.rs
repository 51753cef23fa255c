//! Advisory list built from live endpoint data.

mod common;

use carlog::{advisory::sort_by_urgency, prelude::*};
use common::*;
use serde_json::json;

#[test_log::test(tokio::test)]
async fn test_advisory_from_backend_data() -> TestResult {
    let mut ctx = context().await;
    let mut vehicle = vehicle_json(1, "Toyota", "Corolla", Some("VIN1"));
    vehicle["interval_overrides"] = json!([
        {"id": 1, "vehicle_id": 1, "service_type_id": 3,
         "override_interval_km": 30000, "override_interval_days": null}
    ]);
    ctx.json_mock("GET", "/vehicles/1", 200, &vehicle, 1).await;
    ctx.json_mock(
        "GET",
        "/service_types/",
        200,
        &json!([
            service_type_json(1, "Oil change", Some(10000), Some(365)),
            service_type_json(2, "Tire rotation", None, None),
            service_type_json(3, "Brake fluid", None, Some(730))
        ]),
        1,
    )
    .await;
    ctx.json_mock(
        "GET",
        "/vehicles/1/maintenance_summary_by_type",
        200,
        &json!([{
            "service_type_id": 1, "service_type_name": "Oil change", "log_count": 2,
            "last_log_date": "2024-01-10", "last_log_mileage": 52000,
            "total_cost_for_service_type": 160.0
        }]),
        1,
    )
    .await;
    ctx.json_mock(
        "GET",
        "/vehicles/1/logs",
        200,
        &json!([
            log_json(2, 1, "2024-02-20", 61500, 80.0),
            log_json(1, 1, "2024-01-10", 52000, 80.0)
        ]),
        1,
    )
    .await;

    let today = date(2024, 3, 1);
    let vehicle = ctx.client.vehicle(1).get().await?;
    let service_types = ctx.client.service_types().list().await?;
    let summaries = ctx.client.maintenance_summary(1).await?;
    let logs = ctx.client.vehicle_logs(1).list().await?;
    let stats = VehicleStats::compute(&vehicle, &logs, today);
    assert_eq!(stats.current_mileage, 61500);

    let mut items = build_advisory(&vehicle, stats.current_mileage, &summaries, &service_types, today);
    sort_by_urgency(&mut items);

    let summary: Vec<(&str, AdvisoryStatus, &str)> = items
        .iter()
        .map(|i| (i.service_type_name.as_str(), i.status, i.message.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (
                "Brake fluid",
                AdvisoryStatus::NeverDone,
                "Never performed. Est. due Jan 1, 2024. Est. due at 70,000 km."
            ),
            ("Oil change", AdvisoryStatus::Upcoming, "Upcoming in 500 km."),
        ]
    );
    Ok(())
}
