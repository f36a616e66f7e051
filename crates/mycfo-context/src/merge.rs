//! Builds the context object sent with each message.
//!
//! Precedence, later wins: ambient fields, fetched data, profile fields,
//! route. Non-ok outcomes leave a marker instead of data.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::fetch::FetchOutcome;
use crate::session::SessionProfile;
use crate::types::AmbientContext;

/// Per-message context. Serializes to `null` when empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextPayload(Map<String, Value>);

impl ContextPayload {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        if self.0.is_empty() {
            Value::Null
        } else {
            Value::Object(self.0)
        }
    }
}

impl Serialize for ContextPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_empty() {
            serializer.serialize_none()
        } else {
            self.0.serialize(serializer)
        }
    }
}

/// Keys only the fetch outcome may set.
const RESERVED_KEYS: [&str; 3] = ["externalData", "externalSource", "externalFetch"];

pub fn merge(
    ambient: Option<&AmbientContext>,
    outcome: Option<&FetchOutcome>,
    profile: &SessionProfile,
    route: Option<&str>,
) -> ContextPayload {
    let mut out = Map::new();

    if let Some(ambient) = ambient {
        out.extend(
            ambient
                .to_object()
                .into_iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str())),
        );
    }

    match outcome {
        Some(FetchOutcome::Ok { target, data, .. }) => {
            let mut external = Map::new();
            external.insert(target.screen.domain().to_string(), data.clone());
            out.insert("externalData".to_string(), Value::Object(external));
            out.insert(
                "externalSource".to_string(),
                json!({ "key": target.key, "label": target.label }),
            );
        }
        Some(other) => {
            out.insert("externalFetch".to_string(), fetch_marker(other));
        }
        None => {}
    }

    out.extend(profile.to_fields());

    if let Some(route) = route.filter(|r| !r.is_empty()) {
        out.insert("route".to_string(), Value::String(route.to_string()));
    }

    ContextPayload(out)
}

fn fetch_marker(outcome: &FetchOutcome) -> Value {
    let mut marker = json!({
        "status": outcome.status(),
        "target": outcome.target(),
    });
    match outcome {
        FetchOutcome::MissingParams { missing, .. } => {
            marker["missing"] = json!(missing);
        }
        FetchOutcome::Forbidden { permission, .. } => {
            marker["permission"] = json!(permission);
        }
        _ => {}
    }
    marker
}
