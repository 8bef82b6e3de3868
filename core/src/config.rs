//! Construction options for a `Resource`.
//!
//! Options can be built in code or deserialized from JSON, e.g. from props a
//! server rendered into the page:
//!
//! ```
//! use resource_core::ResourceOptions;
//!
//! let options: ResourceOptions = serde_json::from_str(
//!     r#"{"route": "users", "autoload": true, "debounce_ms": 250}"#,
//! ).unwrap();
//! assert_eq!(options.debounce().as_millis(), 250);
//! ```

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::params::Params;

pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// A `{data, meta}` body as list and show endpoints return it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Envelope {
    pub data: Value,
    #[serde(default)]
    pub meta: Value,
}

impl Envelope {
    pub fn from_value(body: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(body)
    }

    /// The records carried in `data`: arrays as-is, a single object as one
    /// record, `null` as none.
    pub fn records(&self) -> Vec<Value> {
        match &self.data {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            single => vec![single.clone()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResourceOptions {
    /// Route name the endpoint suffixes are appended to, e.g. `users`.
    pub route: String,
    /// Data to seed the cache with instead of fetching it.
    pub initial: Option<Envelope>,
    pub params: Params,
    pub meta: Value,
    /// Fetch the collection as soon as the resource is built.
    pub autoload: bool,
    pub debounce_ms: u64,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            route: String::new(),
            initial: None,
            params: Params::new(),
            meta: Value::Null,
            autoload: false,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl ResourceOptions {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            ..Self::default()
        }
    }

    pub fn initial(mut self, initial: Envelope) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }

    pub fn autoload(mut self, autoload: bool) -> Self {
        self.autoload = autoload;
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX);
        self
    }
}
