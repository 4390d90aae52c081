use std::process::ExitCode;

use crate::cli::RefreshArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

pub async fn run(args: &RefreshArgs, context: &mut Context) -> Result<ExitCode, CliError> {
    let scheduler = context.scheduler()?;
    let prospect = scheduler.refresh_prospect(args.id.trim()).await?;
    output::render(&prospect, context.pretty)?;
    Ok(ExitCode::SUCCESS)
}
