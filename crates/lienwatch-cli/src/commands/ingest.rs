use std::process::ExitCode;

use lienwatch_core::Jurisdiction;

use crate::cli::IngestArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

/// Exit code when at least one source failed.
const PARTIAL_FAILURE: u8 = 3;

pub async fn run(args: &IngestArgs, context: &mut Context) -> Result<ExitCode, CliError> {
    if !args.jurisdictions.is_empty() {
        context.config.jurisdictions = Jurisdiction::parse_all(&args.jurisdictions)?;
    }

    let scheduler = context.scheduler()?;
    let report = scheduler.trigger_ingestion().await?;
    output::render(&report, context.pretty)?;

    let failed = report.results.iter().filter(|result| !result.success).count();
    if failed > 0 {
        tracing::warn!(failed, "some sources failed");
        return Ok(ExitCode::from(PARTIAL_FAILURE));
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use lienwatch_core::ProspectStore;

    use super::*;
    use crate::commands::test_support::memory_context;

    #[tokio::test]
    async fn empty_upstream_succeeds_and_logs_one_run() {
        let mut context = memory_context();
        let args = IngestArgs {
            jurisdictions: vec![String::from("ca"), String::from("NV")],
        };

        let code = run(&args, &mut context).await.expect("runs");

        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(context.config.jurisdictions.len(), 2);
        let runs = context.run_log().recent(10).expect("reads");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].source, "ca-api");
        assert_eq!(context.store.len().expect("len"), 0);
    }

    #[tokio::test]
    async fn invalid_jurisdiction_is_rejected() {
        let mut context = memory_context();
        let args = IngestArgs {
            jurisdictions: vec![String::from("C A")],
        };

        let err = run(&args, &mut context).await.expect_err("must fail");
        assert_eq!(err.exit_code(), 2);
    }
}
