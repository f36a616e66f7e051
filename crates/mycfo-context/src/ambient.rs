//! Latest screen-pushed snapshot. Screens overwrite it as they mount and
//! clear it on unmount; the router only ever reads a clone.

use parking_lot::RwLock;
use serde_json::Value;

use crate::types::AmbientContext;

#[derive(Default)]
pub struct AmbientContextProvider {
    current: RwLock<Option<AmbientContext>>,
}

impl AmbientContextProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ctx: AmbientContext) {
        tracing::debug!(screen = %ctx.screen, fields = ctx.fields.len(), "ambient context updated");
        *self.current.write() = Some(ctx);
    }

    /// Accepts raw JSON from a screen. Non-objects are ignored.
    pub fn set_value(&self, value: Value) -> bool {
        match AmbientContext::from_value(value) {
            Some(ctx) => {
                self.set(ctx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        *self.current.write() = None;
    }

    pub fn current(&self) -> Option<AmbientContext> {
        self.current.read().clone()
    }
}
