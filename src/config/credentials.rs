// src/config/credentials.rs
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{EngineConfig, ProviderKind};

/// API keys shared between the engine and the remote adapters.
///
/// Adapters read the key at call time, so `SentimentEngine::set_api_key` takes
/// effect for already-registered providers.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    inner: Arc<RwLock<HashMap<ProviderKind, String>>>,
}

impl Credentials {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        let creds = Self::default();
        for kind in ProviderKind::ALL {
            if let Some(key) = cfg.api_key(kind) {
                creds.set(kind, key);
            }
        }
        creds
    }

    pub fn get(&self, kind: ProviderKind) -> Option<String> {
        let guard = self.inner.read().unwrap_or_else(|p| p.into_inner());
        guard.get(&kind).cloned()
    }

    pub fn has(&self, kind: ProviderKind) -> bool {
        self.get(kind).is_some()
    }

    /// Empty/whitespace keys remove the entry.
    pub fn set(&self, kind: ProviderKind, key: &str) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        let key = key.trim();
        if key.is_empty() {
            guard.remove(&kind);
        } else {
            guard.insert(kind, key.to_string());
        }
    }
}
