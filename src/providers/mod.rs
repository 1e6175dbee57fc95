/*!
 * Translation providers and the registry that creates them by name.
 *
 * - `ollama`: local Ollama server
 * - `mock`: scripted in-process client
 *
 * Providers are registered explicitly with a factory closure; nothing is
 * discovered at runtime.
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::app_config::ProviderConfig;
use crate::errors::TranslationError;
use crate::translation::TranslationClient;

pub mod mock;
pub mod ollama;

/// Builds a client from provider settings
pub type ProviderFactory =
    Box<dyn Fn(&ProviderConfig) -> Result<Arc<dyn TranslationClient>, TranslationError> + Send + Sync>;

/// Map from provider name to factory
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in providers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("ollama", |settings| {
            Ok(Arc::new(ollama::OllamaClient::new(settings.clone())?) as Arc<dyn TranslationClient>)
        });
        registry.register("mock", |settings| {
            Ok(Arc::new(mock::MockClient::with_settings(mock::MockBehavior::Echo, settings.clone()))
                as Arc<dyn TranslationClient>)
        });
        registry
    }

    /// Add or replace a provider
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderConfig) -> Result<Arc<dyn TranslationClient>, TranslationError> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Registering provider '{}'", name);
        self.factories.insert(name, Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered provider names, sorted
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Create a client for `settings.provider_type`
    pub fn create(&self, settings: &ProviderConfig) -> Result<Arc<dyn TranslationClient>, TranslationError> {
        let factory = self.factories.get(&settings.provider_type).ok_or_else(|| {
            TranslationError::fatal(format!(
                "Unknown provider '{}'. Available: {}",
                settings.provider_type,
                self.names().join(", ")
            ))
        })?;
        factory(settings)
    }
}
