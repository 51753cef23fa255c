//! backup export, analyze, and restore
//!

use std::path::PathBuf;

use anyhow::Result;
use carlog::prelude::*;
use serde::Serialize;

use super::{BackupArgs, BackupCommands};
use crate::{
    cli::{
        AppContext,
        common::{resolve_vehicle_id, today},
    },
    output::{OutputFormat, render_table},
};

#[derive(Serialize)]
struct PlanReport<'a> {
    analysis: &'a BackupAnalysis,
    plan: &'a RestorePlan,
    executed: bool,
}

pub async fn handle(ctx: &AppContext, args: BackupArgs) -> Result<()> {
    match args.command {
        BackupCommands::Export {
            vehicles,
            start_date,
            end_date,
            no_logs,
            file,
        } => {
            let mut config = BackupConfiguration::default().include_maintenance_logs(!no_logs);
            if !vehicles.is_empty() {
                let mut ids = Vec::with_capacity(vehicles.len());
                for vehicle in &vehicles {
                    ids.push(resolve_vehicle_id(ctx, vehicle).await?);
                }
                config = config.vehicle_ids(ids);
            }
            if let Some(date) = start_date {
                config = config.start_date(date);
            }
            if let Some(date) = end_date {
                config = config.end_date(date);
            }
            let bytes = ctx.client.export_backup(&config).await?;
            let default_path =
                file.unwrap_or_else(|| PathBuf::from(format!("carlog_backup_{}.json", today())));
            let path = ctx.output.write_file(default_path, &bytes)?;
            ctx.output
                .emit_status(&format!("backup written to {}", path.display()));
            Ok(())
        }
        BackupCommands::Analyze { file } => {
            let mut session = RestoreSession::new();
            session.load_file(&file).await?;
            session.analyze(&ctx.client).await?;
            emit_plan(ctx, &session, false)
        }
        BackupCommands::Restore {
            file,
            add,
            no_new,
            replace,
            dry_run,
        } => {
            let mut session = RestoreSession::new();
            session.load_file(&file).await?;
            session.analyze(&ctx.client).await?;

            for action in plan_actions(&add, no_new, &replace) {
                session.apply(action)?;
            }
            if dry_run {
                return emit_plan(ctx, &session, false);
            }
            if session.plan().is_noop() {
                ctx.output
                    .emit_status("nothing selected to restore; backend not changed");
                return emit_plan(ctx, &session, false);
            }
            session.execute(&ctx.client).await?;
            emit_plan(ctx, &session, true)
        }
    }
}

/// Plan edits for the restore flags, applied on top of the default plan
/// (all new vehicles added, all conflicts skipped).
fn plan_actions(add: &[i64], no_new: bool, replace: &[String]) -> Vec<RestoreAction> {
    let mut actions = Vec::new();
    if no_new || !add.is_empty() {
        actions.push(RestoreAction::SelectNoNew);
    }
    actions.extend(add.iter().map(|id| RestoreAction::SetAdd(*id, true)));
    actions.extend(
        replace
            .iter()
            .map(|vin| RestoreAction::Resolve(vin.clone(), ConflictAction::Replace)),
    );
    actions
}

fn emit_plan(ctx: &AppContext, session: &RestoreSession, executed: bool) -> Result<()> {
    let Some(analysis) = session.analysis() else {
        return Ok(());
    };
    let plan = session.plan();
    if ctx.output.format() != OutputFormat::Table {
        return ctx.output.emit_json(&PlanReport {
            analysis,
            plan,
            executed,
        });
    }

    let mut text = String::new();
    if analysis.new_vehicles.is_empty() {
        text.push_str("No new vehicles in backup.\n");
    } else {
        text.push_str("New vehicles:\n");
        text.push_str(&render_table(&analysis.new_vehicles));
        text.push('\n');
    }
    if analysis.conflicting_vehicles.is_empty() {
        text.push_str("No conflicts.\n");
    } else {
        text.push_str("\nConflicts (VIN already exists):\n");
        text.push_str(&render_table(&analysis.conflicting_vehicles));
        text.push('\n');
    }
    let verb = if executed { "restored" } else { "plan" };
    text.push_str(&format!(
        "\n{verb}: add {} new vehicle(s), replace {}, skip {}",
        plan.vehicles_to_add.len(),
        plan.replace_count(),
        plan.conflict_resolutions.len() - plan.replace_count(),
    ));
    ctx.output.emit_text(&text)
}
