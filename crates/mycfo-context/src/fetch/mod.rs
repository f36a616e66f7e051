//! Fetch dispatch: one fetcher per screen, a typed registry, and the
//! outcome type the merger consumes.

mod http;
mod registry;
mod screens;
mod shape;

pub use http::{BackendClient, HttpBackend};
pub use registry::{FetchRequest, FetcherRegistry, ScreenFetcher};
pub use shape::shape;

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::BackendUrls;
use crate::error::FetchError;
use crate::session::{AuthHeaders, SessionProfile};
use crate::types::{ExtractedParams, ScreenTarget};

pub type Query = Vec<(String, String)>;

/// Result of one dispatch. Every variant carries the target it was for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum FetchOutcome {
    Ok {
        target: ScreenTarget,
        params: ExtractedParams,
        data: Value,
    },
    MissingParams {
        target: ScreenTarget,
        missing: Vec<&'static str>,
    },
    Failed {
        target: ScreenTarget,
    },
    Unsupported {
        target: ScreenTarget,
    },
    Forbidden {
        target: ScreenTarget,
        permission: &'static str,
    },
}

impl FetchOutcome {
    pub fn target(&self) -> &ScreenTarget {
        match self {
            FetchOutcome::Ok { target, .. }
            | FetchOutcome::MissingParams { target, .. }
            | FetchOutcome::Failed { target }
            | FetchOutcome::Unsupported { target }
            | FetchOutcome::Forbidden { target, .. } => target,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            FetchOutcome::Ok { .. } => "ok",
            FetchOutcome::MissingParams { .. } => "missing-params",
            FetchOutcome::Failed { .. } => "failed",
            FetchOutcome::Unsupported { .. } => "unsupported",
            FetchOutcome::Forbidden { .. } => "forbidden",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, FetchOutcome::Ok { .. })
    }
}

/// Backend services a fetcher can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Registro,
    Reporte,
    Pronostico,
    Notificacion,
    Administracion,
    Base,
}

impl Service {
    pub fn name(self) -> &'static str {
        match self {
            Service::Registro => "registro",
            Service::Reporte => "reporte",
            Service::Pronostico => "pronostico",
            Service::Notificacion => "notificacion",
            Service::Administracion => "administracion",
            Service::Base => "base",
        }
    }
}

/// Everything a fetcher needs besides the target and params, captured once
/// per run.
#[derive(Clone)]
pub struct FetchEnv {
    pub client: Arc<dyn BackendClient>,
    pub urls: BackendUrls,
    pub auth: AuthHeaders,
    pub profile: SessionProfile,
    pub list_cap: usize,
}

impl FetchEnv {
    pub fn base(&self, service: Service) -> Result<&str, FetchError> {
        let url = match service {
            Service::Registro => &self.urls.registro,
            Service::Reporte => &self.urls.reporte,
            Service::Pronostico => &self.urls.pronostico,
            Service::Notificacion => &self.urls.notificacion,
            Service::Administracion => &self.urls.administracion,
            Service::Base => &self.urls.base,
        };
        url.as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .ok_or(FetchError::MissingBaseUrl(service.name()))
    }

    pub fn url(&self, service: Service, path: &str) -> Result<String, FetchError> {
        Ok(format!("{}{}", self.base(service)?, path))
    }

    /// User id for per-user endpoints.
    pub fn sub(&self) -> Result<&str, FetchError> {
        self.auth
            .sub
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(FetchError::MissingIdentity)
    }

    pub async fn get(&self, url: &str, query: &[(String, String)]) -> Result<Value, FetchError> {
        tracing::debug!(url, params = query.len(), "backend GET");
        self.client.get_json(url, query, &self.auth).await
    }
}
