mod ingest;
mod lapsed;
mod refresh;
mod run;
mod runs;
mod sources;

use std::process::ExitCode;
use std::sync::Arc;

use lienwatch_core::{
    AppConfig, HttpClient, IngestionOrchestrator, IngestionRunLog, MemoryProspectStore,
    MemoryRunLog, ProspectStore, ReqwestHttpClient, ScheduleConfig, Scheduler, ScoreCardEnricher,
};
use lienwatch_warehouse::{build_adapters, Warehouse};

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Everything a command needs: validated configuration and the stores.
pub struct Context {
    pub config: AppConfig,
    pub pretty: bool,
    run_log: Arc<dyn IngestionRunLog>,
    store: Arc<dyn ProspectStore>,
    http_client: Arc<dyn HttpClient>,
}

impl Context {
    pub fn load(cli: &Cli) -> Result<Self, CliError> {
        let path = AppConfig::resolve_path(cli.config.as_deref());
        let config = AppConfig::load(&path)?;
        tracing::debug!(
            config = %path.display(),
            sources = config.sources.len(),
            "loaded configuration"
        );

        let run_log: Arc<dyn IngestionRunLog>;
        let store: Arc<dyn ProspectStore>;
        if cli.memory {
            run_log = Arc::new(MemoryRunLog::new());
            store = Arc::new(MemoryProspectStore::new());
        } else {
            let warehouse = Arc::new(Warehouse::open_default()?);
            tracing::debug!(db = %warehouse.db_path().display(), "opened warehouse");
            run_log = warehouse.clone();
            store = warehouse;
        }

        Ok(Self::new(
            config,
            cli.pretty,
            run_log,
            store,
            Arc::new(ReqwestHttpClient::default()),
        ))
    }

    pub fn new(
        config: AppConfig,
        pretty: bool,
        run_log: Arc<dyn IngestionRunLog>,
        store: Arc<dyn ProspectStore>,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            config,
            pretty,
            run_log,
            store,
            http_client,
        }
    }

    pub fn run_log(&self) -> &dyn IngestionRunLog {
        self.run_log.as_ref()
    }

    pub fn orchestrator(&self) -> Result<IngestionOrchestrator, CliError> {
        let policy = self.config.policy();
        let adapters = build_adapters(
            &self.config.sources,
            Arc::clone(&self.http_client),
            policy.request_timeout,
        )?;
        let orchestrator = IngestionOrchestrator::new(adapters, policy)?
            .with_run_log(Arc::clone(&self.run_log));
        Ok(orchestrator)
    }

    /// Scheduler over a fresh orchestrator; never auto-started here.
    pub fn scheduler(&self) -> Result<Scheduler, CliError> {
        let schedule = ScheduleConfig {
            auto_start: false,
            ..self.config.schedule_config()
        };
        let scheduler = Scheduler::new(
            schedule,
            Arc::new(self.orchestrator()?),
            Arc::new(ScoreCardEnricher),
            Arc::clone(&self.store),
        )?;
        Ok(scheduler)
    }
}

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let mut context = Context::load(cli)?;
    dispatch(&cli.command, &mut context).await
}

async fn dispatch(command: &Command, context: &mut Context) -> Result<ExitCode, CliError> {
    match command {
        Command::Ingest(args) => ingest::run(args, context).await,
        Command::Lapsed(args) => lapsed::run(args, context).await,
        Command::Run => run::run(context).await,
        Command::Refresh(args) => refresh::run(args, context).await,
        Command::Runs(args) => runs::run(args, context),
        Command::Sources => sources::run(context),
    }
}
