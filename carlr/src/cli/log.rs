use anyhow::Result;
use carlog::prelude::*;

use super::{LogArgs, LogCommands, LogFieldArgs};
use crate::cli::{
    AppContext,
    common::{parse_field_values, resolve_service_type, resolve_vehicle_id, today},
};

/// Resolves the service type named in `fields` and the custom values, which may
/// refer to fields of that service type by name.
async fn resolve_fields(
    ctx: &AppContext,
    fields: &LogFieldArgs,
) -> Result<(Option<ServiceType>, Vec<CustomFieldValueInput>)> {
    let service_type = match &fields.service_type {
        Some(st) => Some(resolve_service_type(ctx, st).await?),
        None => None,
    };
    let values = parse_field_values(&fields.values, service_type.as_ref())?;
    Ok((service_type, values))
}

pub async fn handle(ctx: &AppContext, args: LogArgs) -> Result<()> {
    match args.command {
        LogCommands::List {
            vehicle,
            service_type,
        } => {
            let vehicle_id = resolve_vehicle_id(ctx, &vehicle).await?;
            let mut request = ctx.client.vehicle_logs(vehicle_id);
            if let Some(st) = service_type {
                request = request.service_type(resolve_service_type(ctx, &st).await?.id);
            }
            let logs = request.list().await?;
            ctx.output.emit_table(&logs)
        }
        LogCommands::Get { id } => {
            let log = ctx.client.maintenance_log(id).get().await?;
            ctx.output.emit_json(&log)
        }
        LogCommands::Create {
            vehicle,
            date,
            mileage,
            fields,
        } => {
            let vehicle_id = resolve_vehicle_id(ctx, &vehicle).await?;
            let (service_type, values) = resolve_fields(ctx, &fields).await?;
            let mut request = ctx
                .client
                .new_log(vehicle_id, date.unwrap_or_else(today), mileage)
                .custom_values(values);
            if let Some(cost) = fields.cost {
                request = request.cost(cost);
            }
            if let Some(notes) = fields.notes {
                request = request.notes(notes);
            }
            if let Some(st) = service_type {
                request = request.service_type(st.id);
            }
            let log = request.create().await?;
            ctx.output.emit_json(&log)
        }
        LogCommands::Update {
            id,
            date,
            mileage,
            fields,
        } => {
            let (service_type, values) = resolve_fields(ctx, &fields).await?;
            let mut request = ctx.client.update_log(id);
            if let Some(date) = date {
                request = request.date(date);
            }
            if let Some(mileage) = mileage {
                request = request.mileage(mileage);
            }
            if let Some(cost) = fields.cost {
                request = request.cost(cost);
            }
            if let Some(notes) = fields.notes {
                request = request.notes(notes);
            }
            if let Some(st) = service_type {
                request = request.service_type(st.id);
            }
            if !values.is_empty() {
                request = request.custom_values(values);
            }
            let log = request.update().await?;
            ctx.output.emit_json(&log)
        }
        LogCommands::Delete { id } => {
            ctx.client.maintenance_log(id).delete().await?;
            ctx.output.emit_text(&format!("deleted log {id}"))
        }
    }
}
