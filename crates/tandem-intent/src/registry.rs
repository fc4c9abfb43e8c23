//! App registry.
//!
//! Maps an app name (e.g. `"Poster Generator"`) to the entrypoint that
//! serves it and the fields that app expects. Built-in entries cover the two
//! pipelines; an `app_registry.json` file can override or extend them.
//!
//! # Example
//!
//! ```rust
//! # use tandem_intent::registry::{AppRegistry, POSTER_APP};
//! let registry = AppRegistry::builtin();
//! let entry = registry.get(POSTER_APP).unwrap();
//! assert_eq!(entry.entrypoint, "pipelines/poster");
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IntentError, Result};

/// App name of the poster pipeline.
pub const POSTER_APP: &str = "Poster Generator";
/// App name of the sales pipeline.
pub const SALES_APP: &str = "Lead/Sales Intent Generator";
/// App name used for services with no pipeline.
pub const ORCHESTRATOR_APP: &str = "orchestrator";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Registry metadata for one app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEntry {
    pub entrypoint: String,
    #[serde(default)]
    pub required_fields: Vec<String>,
}

/// Lookup table from app name to [`AppEntry`].
#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    apps: HashMap<String, AppEntry>,
}

impl AppRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in entries for the poster and sales pipelines.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            POSTER_APP,
            AppEntry {
                entrypoint: "pipelines/poster".into(),
                required_fields: [
                    "hero_headline",
                    "hero_subline",
                    "description",
                    "cta",
                    "cta_link",
                    "testimonial",
                    "success_metrics",
                    "target_audience",
                ]
                .map(String::from)
                .to_vec(),
            },
        );
        registry.register(
            SALES_APP,
            AppEntry {
                entrypoint: "pipelines/sales".into(),
                required_fields: vec!["conversation".into(), "operation".into()],
            },
        );
        registry
    }

    /// Built-in entries overlaid with the contents of a JSON file shaped as
    /// `{ "<app name>": { "entrypoint": ..., "required_fields": [...] } }`.
    pub fn with_overrides(path: &Path) -> Result<Self> {
        let mut registry = Self::builtin();
        let loaded = Self::from_file(path)?;
        let count = loaded.apps.len();
        registry.apps.extend(loaded.apps);
        tracing::info!(path = %path.display(), apps = count, "loaded app registry overrides");
        Ok(registry)
    }

    /// Read a registry from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let load_err = |reason: String| IntentError::RegistryLoad {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let apps: HashMap<String, AppEntry> =
            serde_json::from_str(&raw).map_err(|e| load_err(e.to_string()))?;
        Ok(Self { apps })
    }

    /// Add or replace an entry.
    pub fn register(&mut self, app_name: impl Into<String>, entry: AppEntry) {
        self.apps.insert(app_name.into(), entry);
    }

    /// Look up an app by its exact name.
    pub fn get(&self, app_name: &str) -> Option<&AppEntry> {
        self.apps.get(app_name)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
