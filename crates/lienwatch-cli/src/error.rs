use thiserror::Error;

use crate::output::StreamError;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] lienwatch_core::ValidationError),

    #[error(transparent)]
    Config(#[from] lienwatch_core::ConfigError),

    #[error(transparent)]
    Core(#[from] lienwatch_core::CoreError),

    #[error(transparent)]
    Scheduler(#[from] lienwatch_core::SchedulerError),

    #[error(transparent)]
    Store(#[from] lienwatch_core::StoreError),

    #[error(transparent)]
    Warehouse(#[from] lienwatch_warehouse::WarehouseError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) | Self::Core(_) => 2,
            Self::Scheduler(_) => 5,
            Self::Store(_) | Self::Warehouse(_) => 7,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
            Self::Stream(_) => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use lienwatch_core::{ConfigError, SchedulerError};

    use super::*;

    #[test]
    fn configuration_problems_exit_with_usage_code() {
        assert_eq!(CliError::from(ConfigError::NoSources).exit_code(), 2);
        assert_eq!(CliError::from(SchedulerError::NoRuntime).exit_code(), 5);
    }
}
