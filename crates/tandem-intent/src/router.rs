//! Intent router.
//!
//! Resolves a request's declared service to the pipeline that serves it.
//! Routing is a pure lookup: `poster` and `sales` (or their app names, in
//! any letter case) map to their pipelines, and everything else lands on the
//! orchestrator, which completes immediately with an empty result.
//!
//! # Example
//!
//! ```rust
//! # use tandem_intent::router::IntentRouter;
//! # use tandem_store::Pipeline;
//! let router = IntentRouter::default();
//! assert_eq!(router.route("Sales").pipeline, Pipeline::Sales);
//! assert_eq!(router.route("cluster").pipeline, Pipeline::Orchestrator);
//! ```

use serde::{Deserialize, Serialize};
use tandem_store::Pipeline;

use crate::registry::{AppRegistry, ORCHESTRATOR_APP, POSTER_APP, SALES_APP};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The outcome of routing a service identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub pipeline: Pipeline,
    /// Human-readable app name.
    pub app_name: String,
    /// What the pipeline will do with the collected answers.
    pub intent: String,
    /// Registry entrypoint, absent for the orchestrator.
    pub entrypoint: Option<String>,
    pub required_fields: Vec<String>,
}

/// Maps service identifiers to pipelines through an [`AppRegistry`].
#[derive(Debug, Clone)]
pub struct IntentRouter {
    registry: AppRegistry,
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new(AppRegistry::builtin())
    }
}

impl IntentRouter {
    pub fn new(registry: AppRegistry) -> Self {
        Self { registry }
    }

    /// Resolve `service` to a [`Route`]. Never fails.
    pub fn route(&self, service: &str) -> Route {
        let pipeline = pipeline_for(service);
        let (app_name, intent) = match pipeline {
            Pipeline::Poster => (
                POSTER_APP,
                "Generate poster content based on selected fields",
            ),
            Pipeline::Sales => (
                SALES_APP,
                "Analyze sales conversation and generate next best action",
            ),
            Pipeline::Orchestrator => (ORCHESTRATOR_APP, "No specific app selected"),
        };

        let entry = self.registry.get(app_name);
        let route = Route {
            pipeline,
            app_name: app_name.to_owned(),
            intent: intent.to_owned(),
            entrypoint: entry.map(|e| e.entrypoint.clone()),
            required_fields: entry.map(|e| e.required_fields.clone()).unwrap_or_default(),
        };

        tracing::debug!(service, pipeline = %route.pipeline, app = %route.app_name, "service routed");
        route
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.registry
    }
}

fn pipeline_for(service: &str) -> Pipeline {
    let service = service.trim();
    if service.eq_ignore_ascii_case("poster") || service.eq_ignore_ascii_case(POSTER_APP) {
        Pipeline::Poster
    } else if service.eq_ignore_ascii_case("sales") || service.eq_ignore_ascii_case(SALES_APP) {
        Pipeline::Sales
    } else {
        Pipeline::Orchestrator
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
