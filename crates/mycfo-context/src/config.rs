use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistConfig {
    pub backends: BackendUrls,
    pub assistant: AssistantConfig,
    pub limits: Limits,
    pub http: HttpConfig,
    /// Used when the session carries no currency preference.
    pub default_currency: String,
}

/// Base URL per backend service. `None` makes every fetcher of that service
/// fail with `FetchError::MissingBaseUrl`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendUrls {
    pub registro: Option<String>,
    pub reporte: Option<String>,
    pub pronostico: Option<String>,
    pub notificacion: Option<String>,
    pub administracion: Option<String>,
    /// Public proxy root, used by services mounted outside `/api/<service>`.
    pub base: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub url: Option<String>,
    /// Module reported when the current route has no first segment.
    pub module_default: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    /// Trailing conversation turns sent as history.
    pub history_window: usize,
    /// Maximum items kept in any list field of a domain snapshot.
    pub list_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AssistConfig {
    /// Build the per-service URLs the way the gateway lays them out:
    /// `{base}/api/<service>`.
    pub fn for_gateway(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let mut config = Self::default();
        config.backends = BackendUrls {
            registro: Some(format!("{}/api/registro", base)),
            reporte: Some(format!("{}/api/reporte", base)),
            pronostico: Some(format!("{}/api/pronostico", base)),
            notificacion: Some(format!("{}/api/notificacion", base)),
            administracion: Some(format!("{}/api/administracion", base)),
            base: Some(base.to_string()),
        };
        config.assistant.url = Some(format!("{}/api/ia/chat", base));
        config
    }

    /// Reject zero limits, a zero request timeout, an empty default
    /// currency, and any configured URL that is not http(s).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.history_window == 0 {
            return Err(ConfigError::Invalid("limits.history_window must be > 0".into()));
        }
        if self.limits.list_cap == 0 {
            return Err(ConfigError::Invalid("limits.list_cap must be > 0".into()));
        }
        if self.default_currency.trim().is_empty() {
            return Err(ConfigError::Invalid("default_currency must not be empty".into()));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.request_timeout_secs must be > 0".into()));
        }
        let urls = [
            ("backends.registro", &self.backends.registro),
            ("backends.reporte", &self.backends.reporte),
            ("backends.pronostico", &self.backends.pronostico),
            ("backends.notificacion", &self.backends.notificacion),
            ("backends.administracion", &self.backends.administracion),
            ("backends.base", &self.backends.base),
            ("assistant.url", &self.assistant.url),
        ];
        for (name, url) in urls {
            if let Some(url) = url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::Invalid(format!("{} must be an http(s) URL", name)));
                }
            }
        }
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `MYCFO_*` environment variables on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let slots: [(&str, &mut Option<String>); 7] = [
            ("MYCFO_REGISTRO_URL", &mut self.backends.registro),
            ("MYCFO_REPORTE_URL", &mut self.backends.reporte),
            ("MYCFO_PRONOSTICO_URL", &mut self.backends.pronostico),
            ("MYCFO_NOTIFICACION_URL", &mut self.backends.notificacion),
            ("MYCFO_ADMINISTRACION_URL", &mut self.backends.administracion),
            ("MYCFO_BASE_URL", &mut self.backends.base),
            ("MYCFO_ASSISTANT_URL", &mut self.assistant.url),
        ];
        for (key, slot) in slots {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = Some(value.trim_end_matches('/').to_string());
            }
        }
        if let Some(currency) = lookup("MYCFO_DEFAULT_CURRENCY").filter(|v| !v.trim().is_empty()) {
            self.default_currency = currency.trim().to_uppercase();
        }
    }

    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mycfo")
            .join("assist.json")
    }
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            backends: BackendUrls::default(),
            assistant: AssistantConfig {
                url: None,
                module_default: "dashboard".to_string(),
            },
            limits: Limits {
                history_window: 6,
                list_cap: 10,
            },
            http: HttpConfig {
                connect_timeout_secs: 10,
                request_timeout_secs: 60,
            },
            default_currency: "ARS".to_string(),
        }
    }
}
