use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use super::{screens, FetchEnv, FetchOutcome};
use crate::error::FetchError;
use crate::types::{ExtractedParams, Param, Screen, ScreenTarget};

/// Inputs of one fetch.
pub struct FetchRequest<'a> {
    pub target: &'a ScreenTarget,
    pub params: &'a ExtractedParams,
    pub env: &'a FetchEnv,
}

/// Produces the domain snapshot for one screen.
#[async_trait]
pub trait ScreenFetcher: Send + Sync {
    fn screen(&self) -> Screen;

    /// Params that must be present before any call is made.
    fn required(&self) -> &'static [Param] {
        &[]
    }

    async fn fetch(&self, request: FetchRequest<'_>) -> Result<Value, FetchError>;
}

/// Screen-keyed fetcher registry.
pub struct FetcherRegistry {
    fetchers: HashMap<Screen, Arc<dyn ScreenFetcher>>,
}

impl FetcherRegistry {
    /// Empty registry. Every dispatch yields `Unsupported` until fetchers
    /// are registered.
    pub fn new() -> Self {
        Self {
            fetchers: HashMap::new(),
        }
    }

    /// One fetcher for every screen.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for screen in Screen::ALL {
            registry.register(screens::fetcher_for(screen));
        }
        registry
    }

    /// Register a fetcher, replacing any previous one for the same screen.
    pub fn register(&mut self, fetcher: Arc<dyn ScreenFetcher>) {
        self.fetchers.insert(fetcher.screen(), fetcher);
    }

    pub fn get(&self, screen: Screen) -> Option<Arc<dyn ScreenFetcher>> {
        self.fetchers.get(&screen).cloned()
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }

    /// Run the target's fetcher. Never fails: permission and parameter
    /// gaps, and any fetch error, come back as outcome variants.
    pub async fn dispatch(
        &self,
        target: &ScreenTarget,
        params: &ExtractedParams,
        env: &FetchEnv,
    ) -> FetchOutcome {
        let Some(fetcher) = self.get(target.screen) else {
            tracing::warn!(screen = %target.key, "no fetcher registered");
            return FetchOutcome::Unsupported {
                target: target.clone(),
            };
        };

        if let Some(permission) = target.screen.permission() {
            if !env.profile.allows(permission) {
                tracing::info!(screen = %target.key, permission, "module not readable for this user");
                return FetchOutcome::Forbidden {
                    target: target.clone(),
                    permission,
                };
            }
        }

        let missing: Vec<&'static str> = fetcher
            .required()
            .iter()
            .filter(|p| !params.has(**p))
            .map(|p| p.wire_name())
            .collect();
        if !missing.is_empty() {
            tracing::info!(screen = %target.key, ?missing, "required params missing");
            return FetchOutcome::MissingParams {
                target: target.clone(),
                missing,
            };
        }

        let started = Instant::now();
        let request = FetchRequest { target, params, env };
        match fetcher.fetch(request).await {
            Ok(data) => {
                tracing::info!(
                    screen = %target.key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "domain snapshot fetched"
                );
                FetchOutcome::Ok {
                    target: target.clone(),
                    params: params.clone(),
                    data,
                }
            }
            Err(err) => {
                tracing::warn!(screen = %target.key, error = %err, "fetch failed");
                FetchOutcome::Failed {
                    target: target.clone(),
                }
            }
        }
    }
}

impl Default for FetcherRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
