//! The collaborators a `Resource` is built with.

use std::fmt;
use std::sync::Arc;

use crate::events::EventBus;
use crate::http::HttpClient;
use crate::routes::RouteResolver;

/// HTTP client, route resolver and event bus, shared by every resource of
/// an application. Cloning is cheap.
#[derive(Clone)]
pub struct Services {
    pub http: Arc<dyn HttpClient>,
    pub routes: Arc<dyn RouteResolver>,
    pub events: EventBus,
}

impl Services {
    pub fn new(http: impl HttpClient + 'static, routes: impl RouteResolver + 'static, events: EventBus) -> Self {
        Self {
            http: Arc::new(http),
            routes: Arc::new(routes),
            events,
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").field("events", &self.events).finish_non_exhaustive()
    }
}
