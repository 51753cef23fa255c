use std::time::{Duration, Instant};

use anyhow::Result;
use carlog::{health::wait_for_backend, prelude::*};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use super::HealthArgs;
use crate::{cli::AppContext, output::OutputFormat};

#[derive(Serialize)]
struct HealthReport<'a> {
    url: &'a str,
    online: bool,
    attempts: usize,
}

pub async fn handle(ctx: &AppContext, args: HealthArgs) -> Result<()> {
    let url = ctx.client.base_url();
    let attempts = if args.wait {
        let config = ProbeConfig::default().timeout(Duration::from_secs(args.timeout));
        let (cancel_tx, cancel_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("ctrl-c: cancelling backend wait");
                let _ = cancel_tx.send(true);
            }
        });
        wait_for_backend(&ctx.client, &config, cancel_rx).await?
    } else {
        let start = Instant::now();
        if !ctx.client.is_backend_online().await {
            return Err(CarlogError::BackendUnavailable {
                url: url.to_string(),
                attempts: 1,
                elapsed: start.elapsed(),
                last_error: None,
            }
            .into());
        }
        1
    };

    if ctx.output.format() == OutputFormat::Table {
        return ctx.output.emit_text(&format!("backend online at {url}"));
    }
    ctx.output.emit_json(&HealthReport {
        url,
        online: true,
        attempts,
    })
}
