//! Runtime configuration and engine assembly.
//!
//! Reads `config/default.toml` section by section. Every key is optional;
//! a missing file, section or key keeps the built-in default. Secrets never
//! live here: they come from the environment (see
//! [`CollaboratorConfig::from_env`]).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tandem_agent::{CollaboratorConfig, RetryPolicy};
use tandem_intent::{AppRegistry, DispatchConfig, EngineConfig, IntentRouter, WorkflowEngine};
use tandem_store::{CheckpointStore, Database, MemoryCheckpointStore, SqliteCheckpointStore};
use tandem_web::WebConfig;

/// Store path that selects the in-memory checkpoint store.
pub const MEMORY_STORE: &str = ":memory:";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Settings loaded from the TOML configuration file.
#[derive(Debug, Clone)]
pub struct TandemConfig {
    /// `[server] bind, port`
    pub server: WebConfig,
    /// `[store] path`
    pub store_path: String,
    /// `[registry] path` to an `app_registry.json` override file.
    pub registry_path: Option<PathBuf>,
    /// `[dispatch]` and question-generation deadlines.
    pub engine: EngineConfig,
    /// `[llm] base_url`
    pub llm_base_url: Option<String>,
    /// `[llm] model`
    pub llm_model: Option<String>,
}

impl Default for TandemConfig {
    fn default() -> Self {
        Self {
            server: WebConfig::default(),
            store_path: "data/tandem.db".into(),
            registry_path: None,
            engine: EngineConfig::default(),
            llm_base_url: None,
            llm_model: None,
        }
    }
}

impl TandemConfig {
    /// Load from `path`, falling back to defaults if the file is missing or
    /// unreadable.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
        };

        match Self::parse(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// Parse a TOML document. Only syntax errors fail; unknown or mistyped
    /// keys are ignored.
    pub fn parse(content: &str) -> Result<Self> {
        let table: toml::Table = content.parse().context("failed to parse config TOML")?;
        let mut config = Self::default();

        if let Some(toml::Value::Table(server)) = table.get("server") {
            if let Some(bind) = server.get("bind").and_then(|v| v.as_str()) {
                config.server.bind_addr = bind.to_owned();
            }
            if let Some(port) = server
                .get("port")
                .and_then(|v| v.as_integer())
                .and_then(|v| u16::try_from(v).ok())
            {
                config.server.port = port;
            }
        }

        if let Some(toml::Value::Table(store)) = table.get("store") {
            if let Some(path) = store.get("path").and_then(|v| v.as_str()) {
                config.store_path = path.to_owned();
            }
        }

        if let Some(toml::Value::Table(registry)) = table.get("registry") {
            config.registry_path = registry
                .get("path")
                .and_then(|v| v.as_str())
                .map(PathBuf::from);
        }

        if let Some(toml::Value::Table(dispatch)) = table.get("dispatch") {
            let defaults = RetryPolicy::default();
            let timeout = dispatch
                .get("collaborator_timeout_secs")
                .and_then(|v| v.as_integer())
                .map(|v| Duration::from_secs(v.max(1) as u64))
                .unwrap_or(config.engine.dispatch.collaborator_timeout);

            config.engine = EngineConfig {
                generator_timeout: timeout,
                dispatch: DispatchConfig {
                    classifier: RetryPolicy {
                        attempts: dispatch
                            .get("classifier_attempts")
                            .and_then(|v| v.as_integer())
                            .map(|v| v.max(1) as u32)
                            .unwrap_or(defaults.attempts),
                        backoff: dispatch
                            .get("classifier_backoff_ms")
                            .and_then(|v| v.as_integer())
                            .map(|v| Duration::from_millis(v.max(0) as u64))
                            .unwrap_or(defaults.backoff),
                        timeout,
                    },
                    collaborator_timeout: timeout,
                },
            };
        }

        if let Some(toml::Value::Table(llm)) = table.get("llm") {
            config.llm_base_url = llm.get("base_url").and_then(|v| v.as_str()).map(str::to_owned);
            config.llm_model = llm.get("model").and_then(|v| v.as_str()).map(str::to_owned);
        }

        Ok(config)
    }

    /// Apply the `[llm]` overrides and the dispatch deadline to a
    /// collaborator configuration.
    pub fn apply_to(&self, mut collaborators: CollaboratorConfig) -> CollaboratorConfig {
        if let Some(url) = &self.llm_base_url {
            collaborators.llm_base_url = url.clone();
        }
        if let Some(model) = &self.llm_model {
            collaborators.llm_model = model.clone();
        }
        collaborators.http_timeout = self.engine.dispatch.collaborator_timeout;
        collaborators
    }

    pub fn uses_memory_store(&self) -> bool {
        self.store_path == MEMORY_STORE
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Open the configured checkpoint store, creating parent directories and
/// running migrations for SQLite.
pub async fn open_store(config: &TandemConfig) -> Result<Arc<dyn CheckpointStore>> {
    if config.uses_memory_store() {
        tracing::info!("using in-memory checkpoint store");
        return Ok(Arc::new(MemoryCheckpointStore::new()));
    }

    let path = PathBuf::from(&config.store_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let db = Database::open_and_migrate(path.clone())
        .await
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    tracing::info!(path = %path.display(), "checkpoint store initialized");
    Ok(Arc::new(SqliteCheckpointStore::new(db)))
}

/// Build the app registry, applying the override file when configured.
pub fn load_registry(config: &TandemConfig) -> Result<AppRegistry> {
    match &config.registry_path {
        Some(path) => AppRegistry::with_overrides(path)
            .with_context(|| format!("failed to load app registry from {}", path.display())),
        None => Ok(AppRegistry::builtin()),
    }
}

/// Wire store, collaborators, router and engine together.
pub async fn build_engine(config: &TandemConfig) -> Result<WorkflowEngine> {
    let store = open_store(config).await?;
    let collaborators = config
        .apply_to(CollaboratorConfig::from_env())
        .build()
        .context("failed to build collaborator clients")?;
    let router = IntentRouter::new(load_registry(config)?);

    WorkflowEngine::new(store, collaborators, router, config.engine)
        .context("failed to build workflow engine")
}
