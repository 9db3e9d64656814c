//! Application state: REST clients for the store and identity endpoint, the
//! optional model client, and the prompt set.
//!
//! The store and identity collaborators are held as trait objects so tests can
//! substitute in-memory implementations; the model client stays optional the
//! whole way through.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::auth::{IdentityProvider, RestIdentity};
use crate::config::{AppConfig, Prompts};
use crate::model::ModelClient;
use crate::store::{RestStore, SnippetStore};

#[derive(Clone)]
pub struct AppState {
    pub model: Option<ModelClient>,
    pub store: Arc<dyn SnippetStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from an assembled config.
    #[instrument(level = "info", skip_all)]
    pub fn new(cfg: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = RestStore::new(&cfg.store)?;
        let identity = RestIdentity::new(&cfg.store)?;

        let model = cfg.model.as_ref().and_then(ModelClient::new);
        if let Some(m) = &model {
            info!(target: "codesplain_backend", base_url = %m.base_url, model = %m.model, "Model enabled.");
        } else {
            info!(target: "codesplain_backend", "Model disabled (no OPENAI_API_KEY). Serving mock bundles.");
        }

        Ok(Self {
            model,
            store: Arc::new(store),
            identity: Arc::new(identity),
            prompts: cfg.prompts.clone(),
        })
    }
}
