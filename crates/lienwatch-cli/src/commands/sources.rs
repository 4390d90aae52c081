use std::process::ExitCode;

use lienwatch_core::{Jurisdiction, SourceSnapshot};
use serde::Serialize;

use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Debug, Serialize)]
struct SourcesResponse {
    jurisdictions: Vec<Jurisdiction>,
    sources: Vec<SourceSnapshot>,
}

pub fn run(context: &Context) -> Result<ExitCode, CliError> {
    let response = describe(context)?;
    output::render(&response, context.pretty)?;
    Ok(ExitCode::SUCCESS)
}

fn describe(context: &Context) -> Result<SourcesResponse, CliError> {
    let orchestrator = context.orchestrator()?;
    Ok(SourcesResponse {
        jurisdictions: context.config.jurisdictions.clone(),
        sources: orchestrator.snapshots(),
    })
}

#[cfg(test)]
mod tests {
    use lienwatch_core::{CircuitStatus, SourceKind};

    use super::*;
    use crate::commands::test_support::memory_context;

    #[test]
    fn lists_configured_sources_with_closed_circuits() {
        let response = describe(&memory_context()).expect("describes");

        assert_eq!(response.jurisdictions.len(), 1);
        assert_eq!(response.sources.len(), 1);
        let source = &response.sources[0];
        assert_eq!(source.name, "ca-api");
        assert_eq!(source.kind, SourceKind::Api);
        assert_eq!(source.circuit, CircuitStatus::Closed);
        assert_eq!(source.requests_in_window, 0);
    }
}
