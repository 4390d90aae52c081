use std::io;
use std::process::ExitCode;
use std::sync::Mutex;

use crate::error::CliError;
use crate::output::NdjsonStreamWriter;

use super::Context;

/// Run the scheduler until Ctrl-C, streaming every event to stdout.
pub async fn run(context: &mut Context) -> Result<ExitCode, CliError> {
    let scheduler = context.scheduler()?;
    if !scheduler.config().enabled {
        tracing::warn!("scheduler is disabled in configuration, nothing to run");
        return Ok(ExitCode::SUCCESS);
    }

    let writer = Mutex::new(NdjsonStreamWriter::new(io::stdout()));
    scheduler.on(move |event| {
        let mut writer = writer.lock().expect("stream writer lock is not poisoned");
        if let Err(error) = writer.write_event(event) {
            tracing::warn!(%error, kind = %event.kind, "failed to write scheduler event");
        }
    });

    scheduler.start()?;
    tracing::info!(
        ingestion_secs = scheduler.config().ingestion_interval.as_secs(),
        enrichment_secs = scheduler.config().enrichment_interval.as_secs(),
        refresh_secs = scheduler.config().refresh_interval.as_secs(),
        "scheduler running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("stopping scheduler");
    scheduler.stop().await;

    let status = scheduler.status();
    tracing::info!(
        prospects = status.total_prospects_processed,
        errors = status.total_errors,
        "scheduler stopped"
    );
    Ok(ExitCode::SUCCESS)
}
