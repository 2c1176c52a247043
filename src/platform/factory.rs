//! Adapter construction and lookup

use super::adapter::PlatformAdapter;
use super::bearer_token::BearerTokenAdapter;
use super::session_cookie::SessionCookieAdapter;
use crate::config::{RefreshSettings, SessionSettings, Settings};
use crate::types::PlatformFamily;
use crate::{Error, Result};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;

/// Build the HTTP client shared by every adapter
pub fn build_http_client(settings: &RefreshSettings) -> Result<Client> {
    Client::builder()
        .timeout(settings.request_timeout())
        .user_agent(&settings.user_agent)
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
}

/// Create the adapter for `family`
///
/// The concrete adapter is chosen once here; callers only hold the trait object.
pub fn create_adapter(
    family: PlatformFamily,
    client: Client,
    settings: &SessionSettings,
) -> Arc<dyn PlatformAdapter> {
    let access_ttl = settings.access_token_ttl();
    let session_ttl = settings.session_token_ttl();
    match family {
        PlatformFamily::SessionCookie => {
            Arc::new(SessionCookieAdapter::new(client, access_ttl, session_ttl))
        }
        PlatformFamily::BearerToken => {
            Arc::new(BearerTokenAdapter::new(client, access_ttl, session_ttl))
        }
    }
}

/// Adapters keyed by platform family
#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<PlatformFamily, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in adapter of every family
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = build_http_client(&settings.refresh)?;
        let mut registry = Self::new();
        for family in PlatformFamily::ALL {
            registry.register(create_adapter(family, client.clone(), &settings.session));
        }
        Ok(registry)
    }

    /// Register an adapter under its own family, replacing any previous one
    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(adapter.family(), adapter);
    }

    /// Builder form of [`AdapterRegistry::register`]
    pub fn with_adapter(mut self, adapter: Arc<dyn PlatformAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Adapter for `family`
    pub fn get(&self, family: PlatformFamily) -> Result<Arc<dyn PlatformAdapter>> {
        self.adapters
            .get(&family)
            .cloned()
            .ok_or_else(|| Error::config(format!("No adapter registered for platform family {}", family)))
    }

    /// Whether `family` has an adapter
    pub fn contains(&self, family: PlatformFamily) -> bool {
        self.adapters.contains_key(&family)
    }
}
