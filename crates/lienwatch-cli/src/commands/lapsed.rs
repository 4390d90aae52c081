use std::process::ExitCode;

use lienwatch_core::Filing;
use serde::Serialize;

use crate::cli::LapsedArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Debug, Serialize)]
struct LapsedResponse {
    min_age_days: u32,
    count: usize,
    filings: Vec<Filing>,
}

pub async fn run(args: &LapsedArgs, context: &mut Context) -> Result<ExitCode, CliError> {
    let orchestrator = context.orchestrator()?;
    let filings = orchestrator.find_lapsed_filings(args.min_age_days).await;

    output::render(
        &LapsedResponse {
            min_age_days: args.min_age_days,
            count: filings.len(),
            filings,
        },
        context.pretty,
    )?;
    Ok(ExitCode::SUCCESS)
}
