//! Process-wide application context
//!
//! Everything the HTTP server and the chat loop share is built here once at
//! startup: the model client, the tool registries, both stores and the
//! controller. Components receive what they need from it; nothing is global.

use std::sync::Arc;

use crate::agent::{AgentKind, CodeReader, Delegator, SubAgent};
use crate::config::Config;
use crate::controller;
use crate::llm::{LlmClient, OpenAiClient};
use crate::orchestrator::Orchestrator;
use crate::store::{CheckpointStore, FileSummaryCache, MemoryCheckpointStore, SummaryStore};
use crate::tools::{ArxivIndex, PaperIndex, Sandbox, ToolRegistry};
use crate::Result;

/// Shared services for one process
pub struct AppContext {
    config: Config,
    llm: Arc<dyn LlmClient>,
    papers: Arc<dyn PaperIndex>,
    sandbox: Sandbox,
    checkpoints: Arc<dyn CheckpointStore>,
    summaries: Arc<dyn SummaryStore>,
}

impl AppContext {
    /// Build the context from configuration
    ///
    /// A durable store that cannot be opened is not fatal: the process
    /// continues with in-memory checkpoints and the flat-file summary cache.
    pub async fn bootstrap(config: Config) -> Result<Self> {
        let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::new(&config.llm)?);
        let papers: Arc<dyn PaperIndex> = Arc::new(ArxivIndex::new()?);
        let (checkpoints, summaries) = open_stores(&config).await;

        Self::with_parts(config, llm, papers, checkpoints, summaries)
    }

    /// Assemble a context from already-built parts
    pub fn with_parts(
        config: Config,
        llm: Arc<dyn LlmClient>,
        papers: Arc<dyn PaperIndex>,
        checkpoints: Arc<dyn CheckpointStore>,
        summaries: Arc<dyn SummaryStore>,
    ) -> Result<Self> {
        let sandbox = Sandbox::new(&config.orchestrator.workspace_root)?;

        tracing::info!(
            model = llm.model_name(),
            strategy = %config.orchestrator.strategy,
            workspace = %sandbox.root().display(),
            checkpoints = checkpoints.backend(),
            summaries = summaries.backend(),
            "Application context ready"
        );

        Ok(Self {
            config,
            llm,
            papers,
            sandbox,
            checkpoints,
            summaries,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    pub fn checkpoints(&self) -> &Arc<dyn CheckpointStore> {
        &self.checkpoints
    }

    pub fn summaries(&self) -> &Arc<dyn SummaryStore> {
        &self.summaries
    }

    /// The Researcher and DevLead wired to this context's tools
    pub fn delegator(&self) -> Delegator {
        let settings = &self.config.orchestrator;
        let temperature = self.config.llm.temperature;

        let researcher = SubAgent::new(
            AgentKind::Research,
            self.llm.clone(),
            ToolRegistry::researcher(self.papers.clone()),
        )
        .with_max_tool_rounds(settings.max_tool_rounds)
        .with_temperature(temperature);

        let devlead = SubAgent::new(
            AgentKind::Dev,
            self.llm.clone(),
            ToolRegistry::devlead(self.sandbox.clone()),
        )
        .with_code_reader(CodeReader::new(self.sandbox.clone(), self.summaries.clone()))
        .with_max_tool_rounds(settings.max_tool_rounds)
        .with_temperature(temperature);

        Delegator::new(researcher, devlead)
    }

    /// Orchestrator running the configured controller strategy
    pub fn orchestrator(&self) -> Orchestrator {
        let controller = controller::build(
            &self.config.orchestrator,
            self.llm.clone(),
            Arc::new(self.delegator()),
            self.config.llm.temperature,
        );
        Orchestrator::new(controller, self.checkpoints.clone())
    }
}

/// Local backends used without a durable store
fn local_stores(config: &Config) -> (Arc<dyn CheckpointStore>, Arc<dyn SummaryStore>) {
    (
        Arc::new(MemoryCheckpointStore::new()),
        Arc::new(FileSummaryCache::new(&config.storage.summary_cache_dir)),
    )
}

#[cfg(feature = "database")]
async fn open_stores(config: &Config) -> (Arc<dyn CheckpointStore>, Arc<dyn SummaryStore>) {
    use crate::store::{SqliteCheckpointStore, SqliteSummaryStore};

    let Some(address) = config.storage.durable_address() else {
        return local_stores(config);
    };

    match confer_db::Database::connect(address).await {
        Ok(db) => {
            tracing::info!(address, "Using durable store");
            (
                Arc::new(SqliteCheckpointStore::new(&db)),
                Arc::new(SqliteSummaryStore::new(&db)),
            )
        }
        Err(e) => {
            tracing::warn!(address, error = %e, "Durable store unavailable, using local storage");
            local_stores(config)
        }
    }
}

#[cfg(not(feature = "database"))]
async fn open_stores(config: &Config) -> (Arc<dyn CheckpointStore>, Arc<dyn SummaryStore>) {
    if let Some(address) = config.storage.durable_address() {
        tracing::warn!(
            address,
            "Built without database support, using local storage"
        );
    }
    local_stores(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedClient;
    use tempfile::TempDir;

    fn config(workspace: &TempDir, cache: &TempDir) -> Config {
        let mut config = Config::default();
        config.orchestrator.workspace_root = workspace.path().to_path_buf();
        config.storage.summary_cache_dir = cache.path().to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_no_address_uses_local_stores() {
        let workspace = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let (checkpoints, summaries) = open_stores(&config(&workspace, &cache)).await;
        assert_eq!(checkpoints.backend(), "memory");
        assert_eq!(summaries.backend(), "file");
    }

    #[tokio::test]
    async fn test_unusable_address_falls_back() {
        let workspace = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let mut config = config(&workspace, &cache);
        config.storage.database_url = Some("postgres://nowhere/db".to_string());

        let (checkpoints, summaries) = open_stores(&config).await;
        assert_eq!(checkpoints.backend(), "memory");
        assert_eq!(summaries.backend(), "file");
    }

    #[tokio::test]
    async fn test_disabled_database_uses_local_stores() {
        let workspace = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let mut config = config(&workspace, &cache);
        config.storage.database_url = Some(
            workspace
                .path()
                .join("confer.db")
                .display()
                .to_string(),
        );
        config.storage.use_database = false;

        let (checkpoints, _) = open_stores(&config).await;
        assert_eq!(checkpoints.backend(), "memory");
    }

    #[cfg(feature = "database")]
    #[tokio::test]
    async fn test_sqlite_address_uses_durable_stores() {
        let workspace = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let mut config = config(&workspace, &cache);
        config.storage.database_url = Some(
            workspace
                .path()
                .join("confer.db")
                .display()
                .to_string(),
        );

        let (checkpoints, summaries) = open_stores(&config).await;
        assert_eq!(checkpoints.backend(), "sqlite");
        assert_eq!(summaries.backend(), "sqlite");
    }

    #[tokio::test]
    async fn test_orchestrator_uses_configured_strategy() {
        let workspace = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let mut config = config(&workspace, &cache);
        config.orchestrator.strategy = controller::Strategy::Router;

        let (checkpoints, summaries) = local_stores(&config);
        let context = AppContext::with_parts(
            config,
            Arc::new(ScriptedClient::new(Vec::new())),
            Arc::new(ArxivIndex::new().unwrap()),
            checkpoints,
            summaries,
        )
        .unwrap();

        assert_eq!(context.orchestrator().strategy(), controller::Strategy::Router);
    }

    #[test]
    fn test_missing_workspace_is_config_error() {
        let cache = TempDir::new().unwrap();
        let mut config = Config::default();
        config.orchestrator.workspace_root = cache.path().join("missing");

        let (checkpoints, summaries) = local_stores(&config);
        let result = AppContext::with_parts(
            config,
            Arc::new(ScriptedClient::new(Vec::new())),
            Arc::new(ArxivIndex::new().unwrap()),
            checkpoints,
            summaries,
        );
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }
}
