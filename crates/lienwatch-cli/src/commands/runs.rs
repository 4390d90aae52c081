use std::process::ExitCode;

use lienwatch_core::IngestionRunRecord;
use serde::Serialize;

use crate::cli::RunsArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Debug, Serialize)]
struct RunsResponse {
    runs: Vec<IngestionRunRecord>,
}

pub fn run(args: &RunsArgs, context: &Context) -> Result<ExitCode, CliError> {
    let runs = context.run_log().recent(args.limit)?;
    output::render(&RunsResponse { runs }, context.pretty)?;
    Ok(ExitCode::SUCCESS)
}
