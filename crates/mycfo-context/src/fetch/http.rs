use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::HttpConfig;
use crate::error::FetchError;
use crate::session::AuthHeaders;

/// Read-only JSON transport to the backend services.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn get_json(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &AuthHeaders,
    ) -> Result<Value, FetchError>;
}

pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new(http: &HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(http.connect_timeout())
            .timeout(http.request_timeout())
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn get_json(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &AuthHeaders,
    ) -> Result<Value, FetchError> {
        let mut request = self.client.get(url).query(query);
        for (name, value) in headers.pairs() {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        parse_json_body(&body, url)
    }
}

/// Decode a response body. Proxies answer outages with an HTML page and a
/// 200, so markup is rejected before JSON parsing.
pub(crate) fn parse_json_body(body: &str, url: &str) -> Result<Value, FetchError> {
    let trimmed = body.trim_start();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    if trimmed.starts_with('<') {
        let preview: String = trimmed.chars().take(120).collect();
        return Err(FetchError::Decode {
            url: url.to_string(),
            reason: format!("got HTML instead of JSON: {}", preview),
        });
    }
    serde_json::from_str(trimmed).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
