//! common functions for cli
//!

use anyhow::{Result, anyhow, bail};
use carlog::prelude::*;
use chrono::NaiveDate;

use crate::cli::AppContext;

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// resolve vehicle id, name ("2019 Toyota Corolla" or "Toyota Corolla"), or VIN into a vehicle
pub(crate) async fn resolve_vehicle(ctx: &AppContext, vehicle: &str) -> Result<Vehicle> {
    if let Ok(id) = vehicle.parse::<i64>() {
        return Ok(ctx.client.vehicle(id).get().await?);
    }
    let vehicles = ctx.client.vehicles().list().await?;
    pick_vehicle(vehicles, vehicle)
}

pub(crate) async fn resolve_vehicle_id(ctx: &AppContext, vehicle: &str) -> Result<i64> {
    if let Ok(id) = vehicle.parse::<i64>() {
        return Ok(id);
    }
    Ok(resolve_vehicle(ctx, vehicle).await?.id)
}

fn pick_vehicle(vehicles: Vec<Vehicle>, needle: &str) -> Result<Vehicle> {
    let needle = needle.trim().to_lowercase();
    let matches: Vec<Vehicle> = vehicles
        .into_iter()
        .filter(|v| {
            v.display_name().to_lowercase() == needle
                || format!("{} {}", v.make, v.model).to_lowercase() == needle
                || v.vin.as_deref().is_some_and(|vin| vin.to_lowercase() == needle)
        })
        .collect();
    match <[Vehicle; 1]>::try_from(matches) {
        Ok([vehicle]) => Ok(vehicle),
        Err(matches) if matches.is_empty() => Err(anyhow!("vehicle not found: {needle}")),
        Err(_) => Err(anyhow!("vehicle name is ambiguous: {needle}. Use the id or VIN")),
    }
}

/// resolve service type id or name (case-insensitive) into a service type
pub(crate) async fn resolve_service_type(ctx: &AppContext, service_type: &str) -> Result<ServiceType> {
    if let Ok(id) = service_type.parse::<i64>() {
        return Ok(ctx.client.service_type(id).get().await?);
    }
    let needle = service_type.trim().to_lowercase();
    ctx.client
        .service_types()
        .list()
        .await?
        .into_iter()
        .find(|st| st.name.to_lowercase() == needle)
        .ok_or_else(|| anyhow!("service type not found: {service_type}"))
}

pub(crate) async fn resolve_service_type_id(ctx: &AppContext, service_type: &str) -> Result<i64> {
    if let Ok(id) = service_type.parse::<i64>() {
        return Ok(id);
    }
    Ok(resolve_service_type(ctx, service_type).await?.id)
}

/// parse custom field spec `NAME:TYPE[:UNIT]`
pub(crate) fn parse_field_spec(spec: &str) -> Result<CustomFieldInput> {
    let mut parts = spec.splitn(3, ':');
    let name = parts.next().unwrap_or_default().trim();
    let Some(field_type) = parts.next() else {
        bail!("invalid field '{spec}': expected NAME:TYPE[:UNIT]");
    };
    if name.is_empty() {
        bail!("invalid field '{spec}': name is empty");
    }
    let field_type: CustomFieldType = field_type.trim().parse().map_err(|_| {
        anyhow!("invalid field type '{field_type}': expected text, number, date, or boolean")
    })?;
    let mut field = CustomFieldInput::new(name, field_type);
    if let Some(unit) = parts.next().map(str::trim).filter(|u| !u.is_empty()) {
        field = field.unit(unit);
    }
    Ok(field)
}

/// parse `FIELD=VALUE` pairs, where FIELD is a field id or a field name of `service_type`
pub(crate) fn parse_field_values(
    values: &[String],
    service_type: Option<&ServiceType>,
) -> Result<Vec<CustomFieldValueInput>> {
    values
        .iter()
        .map(|pair| {
            let (field, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("invalid value '{pair}': expected FIELD=VALUE"))?;
            let field = field.trim();
            let field_id = match field.parse::<i64>() {
                Ok(id) => id,
                Err(_) => service_type
                    .and_then(|st| st.field_by_name(field))
                    .map(|f| f.id)
                    .ok_or_else(|| {
                        anyhow!("unknown custom field '{field}'. Use --service-type or the field id")
                    })?,
            };
            Ok(CustomFieldValueInput::new(field_id, value))
        })
        .collect()
}
