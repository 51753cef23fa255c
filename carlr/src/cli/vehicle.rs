use anyhow::Result;

use super::{VehicleArgs, VehicleCommands, VehicleFieldArgs};
use crate::cli::{
    AppContext,
    common::{resolve_vehicle, resolve_vehicle_id},
};

pub async fn handle(ctx: &AppContext, args: VehicleArgs) -> Result<()> {
    match args.command {
        VehicleCommands::List => {
            let vehicles = ctx.client.vehicles().list().await?;
            ctx.output.emit_table(&vehicles)
        }
        VehicleCommands::Get { vehicle } => {
            let vehicle = resolve_vehicle(ctx, &vehicle).await?;
            ctx.output.emit_json(&vehicle)
        }
        VehicleCommands::Create {
            make,
            model,
            fields,
        } => {
            let VehicleFieldArgs {
                year,
                vin,
                initial_mileage,
                acquired,
            } = fields;
            let mut request = ctx.client.new_vehicle(make, model);
            if let Some(year) = year {
                request = request.year(year);
            }
            if let Some(vin) = vin {
                request = request.vin(vin);
            }
            if let Some(km) = initial_mileage {
                request = request.initial_mileage(km);
            }
            if let Some(date) = acquired {
                request = request.acquisition_date(date);
            }
            let vehicle = request.create().await?;
            ctx.output.emit_json(&vehicle)
        }
        VehicleCommands::Update {
            vehicle,
            make,
            model,
            fields,
        } => {
            let id = resolve_vehicle_id(ctx, &vehicle).await?;
            let mut request = ctx.client.update_vehicle(id);
            if let Some(make) = make {
                request = request.make(make);
            }
            if let Some(model) = model {
                request = request.model(model);
            }
            if let Some(year) = fields.year {
                request = request.year(year);
            }
            if let Some(vin) = fields.vin {
                request = request.vin(vin);
            }
            if let Some(km) = fields.initial_mileage {
                request = request.initial_mileage(km);
            }
            if let Some(date) = fields.acquired {
                request = request.acquisition_date(date);
            }
            let vehicle = request.update().await?;
            ctx.output.emit_json(&vehicle)
        }
        VehicleCommands::Delete { vehicle } => {
            let vehicle = resolve_vehicle(ctx, &vehicle).await?;
            ctx.client.vehicle(vehicle.id).delete().await?;
            ctx.output
                .emit_text(&format!("deleted {} ({})", vehicle.display_name(), vehicle.id))
        }
    }
}
