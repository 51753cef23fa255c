use anyhow::Result;

use super::DefsArgs;
use crate::{cli::AppContext, output::OutputFormat};

pub async fn handle(ctx: &AppContext, args: DefsArgs) -> Result<()> {
    let mut request = ctx.client.vehicle_definitions();
    if let Some(make) = args.make {
        request = request.make(make);
    }
    if let Some(model) = args.model {
        request = request.model(model);
    }
    if let Some(year) = args.year {
        request = request.year(year);
    }
    let values = request.lookup(args.kind.to_kind()).await?;

    if ctx.output.format() == OutputFormat::Table {
        return ctx.output.emit_text(&values.join("\n"));
    }
    ctx.output.emit_json(&values)
}
