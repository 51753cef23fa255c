use anyhow::Result;

use super::{ServiceTypeArgs, ServiceTypeCommands};
use crate::cli::{
    AppContext,
    common::{parse_field_spec, resolve_service_type, resolve_service_type_id},
};

pub async fn handle(ctx: &AppContext, args: ServiceTypeArgs) -> Result<()> {
    match args.command {
        ServiceTypeCommands::List => {
            let service_types = ctx.client.service_types().list().await?;
            ctx.output.emit_table(&service_types)
        }
        ServiceTypeCommands::Get { service_type } => {
            let service_type = resolve_service_type(ctx, &service_type).await?;
            ctx.output.emit_json(&service_type)
        }
        ServiceTypeCommands::Fields { service_type } => {
            let id = resolve_service_type_id(ctx, &service_type).await?;
            let fields = ctx.client.service_type(id).custom_fields().await?;
            ctx.output.emit_table(&fields)
        }
        ServiceTypeCommands::Create {
            name,
            interval_km,
            interval_days,
            fields,
        } => {
            let fields = fields
                .iter()
                .map(String::as_str)
                .map(parse_field_spec)
                .collect::<Result<Vec<_>>>()?;
            let mut request = ctx.client.new_service_type(name).fields(fields);
            if let Some(km) = interval_km {
                request = request.interval_km(km);
            }
            if let Some(days) = interval_days {
                request = request.interval_days(days);
            }
            let service_type = request.create().await?;
            ctx.output.emit_json(&service_type)
        }
        ServiceTypeCommands::Update {
            service_type,
            name,
            interval_km,
            interval_days,
            clear_interval_km,
            clear_interval_days,
            fields,
        } => {
            let id = resolve_service_type_id(ctx, &service_type).await?;
            let mut request = ctx.client.update_service_type(id);
            if let Some(name) = name {
                request = request.name(name);
            }
            if interval_km.is_some() || clear_interval_km {
                request = request.interval_km(interval_km);
            }
            if interval_days.is_some() || clear_interval_days {
                request = request.interval_days(interval_days);
            }
            if !fields.is_empty() {
                let fields = fields
                    .iter()
                    .map(String::as_str)
                    .map(parse_field_spec)
                    .collect::<Result<Vec<_>>>()?;
                request = request.fields(fields);
            }
            let service_type = request.update().await?;
            ctx.output.emit_json(&service_type)
        }
        ServiceTypeCommands::Delete { service_type } => {
            let service_type = resolve_service_type(ctx, &service_type).await?;
            ctx.client.service_type(service_type.id).delete().await?;
            ctx.output.emit_text(&format!(
                "deleted service type {} ({}). Its logs are now uncategorized",
                service_type.name, service_type.id
            ))
        }
    }
}
