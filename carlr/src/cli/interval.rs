use anyhow::{Result, bail};

use super::{OverrideArgs, OverrideCommands};
use crate::cli::{
    AppContext,
    common::{resolve_service_type_id, resolve_vehicle_id},
};

pub async fn handle(ctx: &AppContext, args: OverrideArgs) -> Result<()> {
    match args.command {
        OverrideCommands::Set {
            vehicle,
            service_type,
            km,
            days,
        } => {
            if km.is_none() && days.is_none() {
                bail!("override set: specify --km, --days, or both");
            }
            let vehicle_id = resolve_vehicle_id(ctx, &vehicle).await?;
            let service_type_id = resolve_service_type_id(ctx, &service_type).await?;
            let mut request = ctx.client.interval_override(vehicle_id, service_type_id);
            if let Some(km) = km {
                request = request.km(km);
            }
            if let Some(days) = days {
                request = request.days(days);
            }
            let saved = request.set().await?;
            ctx.output.emit_json(&saved)
        }
        OverrideCommands::Clear {
            vehicle,
            service_type,
        } => {
            let vehicle_id = resolve_vehicle_id(ctx, &vehicle).await?;
            let service_type_id = resolve_service_type_id(ctx, &service_type).await?;
            let outcome = ctx
                .client
                .interval_override(vehicle_id, service_type_id)
                .clear()
                .await?;
            ctx.output.emit_text(&outcome.to_string())
        }
    }
}
