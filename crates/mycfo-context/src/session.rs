//! Session-side collaborators: currency preference, auth headers and the
//! signed-in user's profile. Storage internals belong to the host app.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Headers every backend call carries when the session has them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthHeaders {
    pub sub: Option<String>,
    pub authorization: Option<String>,
}

impl AuthHeaders {
    pub fn bearer(sub: impl Into<String>, access_token: &str) -> Self {
        Self {
            sub: Some(sub.into()),
            authorization: Some(format!("Bearer {}", access_token)),
        }
    }

    /// Header name/value pairs, absent values skipped.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::with_capacity(2);
        if let Some(auth) = &self.authorization {
            out.push(("Authorization", auth.clone()));
        }
        if let Some(sub) = &self.sub {
            out.push(("X-Usuario-Sub", sub.clone()));
        }
        out
    }
}

/// Profile fields merged into every payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usuario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizacion_id: Option<Value>,
    /// `{module: {view, edit}}` as handed out by the administration backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permisos: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionProfile {
    pub fn is_admin(&self) -> bool {
        self.rol
            .as_deref()
            .map(|r| r.trim().to_uppercase().starts_with("ADMINISTRADOR"))
            .unwrap_or(false)
    }

    /// Whether the user may read `module`. Administrators and profiles
    /// without a permission map are never blocked; `edit` implies `view`.
    pub fn allows(&self, module: &str) -> bool {
        if self.is_admin() {
            return true;
        }
        let Some(permisos) = &self.permisos else {
            return true;
        };
        let Some(entry) = permisos.get(module) else {
            return false;
        };
        let flag = |name: &str| entry.get(name).and_then(Value::as_bool).unwrap_or(false);
        flag("view") || flag("edit")
    }

    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

pub trait SessionStore: Send + Sync {
    fn currency_preference(&self) -> Option<String>;
    fn auth_headers(&self) -> AuthHeaders;
    fn profile(&self) -> SessionProfile;
}

/// In-process session, settable at runtime.
#[derive(Default)]
pub struct MemorySession {
    currency: RwLock<Option<String>>,
    auth: RwLock<AuthHeaders>,
    profile: RwLock<SessionProfile>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_currency(self, currency: impl Into<String>) -> Self {
        self.set_currency(Some(currency.into()));
        self
    }

    pub fn with_auth(self, auth: AuthHeaders) -> Self {
        *self.auth.write() = auth;
        self
    }

    pub fn with_profile(self, profile: SessionProfile) -> Self {
        *self.profile.write() = profile;
        self
    }

    pub fn set_currency(&self, currency: Option<String>) {
        *self.currency.write() = currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());
    }
}

impl SessionStore for MemorySession {
    fn currency_preference(&self) -> Option<String> {
        self.currency.read().clone()
    }

    fn auth_headers(&self) -> AuthHeaders {
        self.auth.read().clone()
    }

    fn profile(&self) -> SessionProfile {
        self.profile.read().clone()
    }
}
