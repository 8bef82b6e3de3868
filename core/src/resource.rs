//! Client for one remote resource collection.
//!
//! # Design
//! A `Resource` is a cheap handle (`Arc` inside) around the cached state of a
//! collection: the merged request parameters, the last `data`/`meta` the
//! server returned, and the `loading`/`saving` flags. Every operation merges
//! its parameters synchronously, then schedules the HTTP call and returns a
//! [`Dispatch`] immediately.
//!
//! Reads (`fetch_all`, `fetch_one`) are debounced, each kind in its own
//! slot: the first read of a kind goes out on the next tick, every later one
//! waits the full debounce duration and replaces a read of the same kind that
//! is still waiting. Writes go out at once.
//!
//! Only a failed create is turned into a [`RequestError`] and published on the
//! event bus. A failed create or update leaves `saving` set.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::config::{Envelope, ResourceOptions};
use crate::debounce::Debouncer;
use crate::dispatch::Dispatch;
use crate::error::{ApiError, RequestError};
use crate::http::HttpRequest;
use crate::params::Params;
use crate::routes::Endpoint;
use crate::services::Services;

/// Invoked once with the response body of a successful call.
pub type Callback = Box<dyn FnOnce(&Value) + Send + 'static>;

/// Invoked with the response body of every successful create or update.
pub type SuccessCallback = Arc<dyn Fn(&Value) + Send + Sync + 'static>;

/// Box `f` as an optional per-call callback.
pub fn callback<F>(f: F) -> Option<Callback>
where
    F: FnOnce(&Value) + Send + 'static,
{
    Some(Box::new(f))
}

#[derive(Default)]
struct State {
    params: Params,
    meta: Value,
    data: Vec<Value>,
    raw: Option<Value>,
    loading: bool,
    saving: bool,
    on_success: Option<SuccessCallback>,
}

struct Inner {
    route: String,
    services: Services,
    debounce: Duration,
    index_timer: Arc<Debouncer>,
    show_timer: Arc<Debouncer>,
    state: Mutex<State>,
}

/// Handle to one remote collection.
///
/// Every request runs on a spawned tokio task, so each operation (and
/// [`Resource::new`] with `autoload`) panics when called outside a tokio
/// runtime. Accessors and setters work anywhere.
#[derive(Clone)]
pub struct Resource {
    inner: Arc<Inner>,
}

impl Resource {
    /// Build a resource for `options.route`.
    ///
    /// With `options.initial` the cache is seeded without a request. With
    /// `options.autoload` and a non-empty route the collection is fetched
    /// right away, which requires a tokio runtime.
    pub fn new(services: Services, options: ResourceOptions) -> Self {
        let debounce = options.debounce();
        let ResourceOptions {
            route,
            initial,
            params,
            meta,
            autoload,
            ..
        } = options;

        let mut state = State {
            params,
            meta,
            ..State::default()
        };
        if let Some(initial) = initial {
            state.data = initial.records();
            state.meta = initial.meta;
        }

        let resource = Self {
            inner: Arc::new(Inner {
                route,
                services,
                debounce,
                index_timer: Debouncer::new(),
                show_timer: Debouncer::new(),
                state: Mutex::new(state),
            }),
        };
        if autoload && !resource.inner.route.is_empty() {
            tracing::debug!(route = %resource.inner.route, "autoloading");
            drop(resource.fetch_all(Params::new(), None));
        }
        resource
    }

    pub fn route(&self) -> &str {
        &self.inner.route
    }

    /// List the collection (`<route>.index`), debounced.
    #[tracing::instrument(skip_all, fields(route = %self.inner.route))]
    pub fn fetch_all(&self, params: Params, callback: Option<Callback>) -> Dispatch {
        self.schedule_read(Endpoint::Index, params, callback)
    }

    /// Fetch a single item (`<route>.show`), debounced. The raw response body
    /// is kept and available through [`Resource::raw`].
    #[tracing::instrument(skip_all, fields(route = %self.inner.route))]
    pub fn fetch_one(&self, params: Params, callback: Option<Callback>) -> Dispatch {
        self.schedule_read(Endpoint::Show, params, callback)
    }

    /// POST `body` to `<route>.store`.
    #[tracing::instrument(skip_all, fields(route = %self.inner.route))]
    pub fn create(&self, params: Params, body: Value, callback: Option<Callback>) -> Dispatch {
        self.schedule_write(Endpoint::Store, params, body, callback)
    }

    /// PUT `body` to `<route>.update`.
    #[tracing::instrument(skip_all, fields(route = %self.inner.route))]
    pub fn update(&self, params: Params, body: Value, callback: Option<Callback>) -> Dispatch {
        self.schedule_write(Endpoint::Update, params, body, callback)
    }

    /// DELETE `<route>.destroy` for `id`. On success every cached record
    /// whose `id` matches is dropped; the rest keep their order.
    #[tracing::instrument(skip_all, fields(route = %self.inner.route))]
    pub fn delete(&self, id: impl Into<Value>, callback: Option<Callback>, params: Params) -> Dispatch {
        let id = id.into();
        {
            let mut state = self.inner.state.lock();
            state.params.merge(params);
            state.params.insert("id", id.clone());
        }
        let inner = Arc::clone(&self.inner);
        Dispatch::spawn(async move { inner.destroy(id, callback).await })
    }

    /// Replace the stored parameters wholesale.
    pub fn set_params(&self, params: Params) -> &Self {
        self.inner.state.lock().params = params;
        self
    }

    pub fn params(&self) -> Params {
        self.inner.state.lock().params.clone()
    }

    pub fn set_data(&self, data: Vec<Value>) -> &Self {
        self.inner.state.lock().data = data;
        self
    }

    pub fn data(&self) -> Vec<Value> {
        self.inner.state.lock().data.clone()
    }

    pub fn set_meta(&self, meta: Value) -> &Self {
        self.inner.state.lock().meta = meta;
        self
    }

    pub fn meta(&self) -> Value {
        self.inner.state.lock().meta.clone()
    }

    /// Body of the last successful `fetch_one`.
    pub fn raw(&self) -> Option<Value> {
        self.inner.state.lock().raw.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().loading
    }

    pub fn is_saving(&self) -> bool {
        self.inner.state.lock().saving
    }

    /// `fetch_all` filtered by a search keyword.
    pub fn query(&self, keyword: impl Into<String>, params: Params) -> Dispatch {
        self.fetch_all(params.with("query", keyword.into()), None)
    }

    /// Ask the server to leave out the given ids on the next list.
    pub fn exclude<I>(&self, ids: I) -> &Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        self.set_id_list("exclude", ids)
    }

    /// Ask the server to return only the given ids on the next list.
    pub fn only<I>(&self, ids: I) -> &Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        self.set_id_list("only", ids)
    }

    pub fn go_to(&self, page: u64) -> Dispatch {
        self.fetch_all(Params::new().with("page", page), None)
    }

    /// Update `id` when `is_update` is set, otherwise create.
    pub fn save(&self, body: Value, is_update: bool, id: Option<Value>, params: Params) -> Dispatch {
        if is_update {
            let mut params = params;
            if let Some(id) = id {
                params.insert("id", id);
            }
            self.update(params, body, None)
        } else {
            self.create(params, body, None)
        }
    }

    /// Register the callback run after every successful create or update,
    /// replacing any earlier one.
    pub fn on_success<F>(&self, f: F) -> &Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.state.lock().on_success = Some(Arc::new(f));
        self
    }

    fn set_id_list<I>(&self, key: &str, ids: I) -> &Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let joined = ids.into_iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
        self.inner.state.lock().params.insert(key, joined);
        self
    }

    fn schedule_read(&self, endpoint: Endpoint, params: Params, callback: Option<Callback>) -> Dispatch {
        {
            let mut state = self.inner.state.lock();
            state.params.merge(params);
            state.loading = true;
        }
        let timer = match endpoint {
            Endpoint::Show => &self.inner.show_timer,
            _ => &self.inner.index_timer,
        };

        let (sender, dispatch) = Dispatch::channel();
        let inner = Arc::clone(&self.inner);
        let delay = timer.schedule(self.inner.debounce, async move {
            let _ = sender.send(inner.read(endpoint, callback).await);
        });
        tracing::debug!(endpoint = endpoint.suffix(), ?delay, "read scheduled");
        dispatch
    }

    fn schedule_write(&self, endpoint: Endpoint, params: Params, body: Value, callback: Option<Callback>) -> Dispatch {
        {
            let mut state = self.inner.state.lock();
            state.saving = true;
            state.params.merge(params);
        }
        let inner = Arc::clone(&self.inner);
        Dispatch::spawn(async move { inner.write(endpoint, body, callback).await })
    }
}

impl Inner {
    /// Resolve `endpoint` with the current parameters and run the request.
    async fn send(&self, endpoint: Endpoint, body: Option<&Value>) -> Result<Value, ApiError> {
        let params = self.state.lock().params.clone();
        let url = self.services.routes.url(&endpoint.route_name(&self.route), &params)?;
        let request = HttpRequest::json(endpoint.method(), url, body)?;
        tracing::debug!(method = %request.method, url = %request.path, "sending request");
        self.services.http.execute(request).await?.into_json()
    }

    async fn read(&self, endpoint: Endpoint, callback: Option<Callback>) -> Result<Value, ApiError> {
        let outcome = self.send(endpoint, None).await.and_then(|body| {
            let envelope = Envelope::from_value(&body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
            Ok((body, envelope))
        });

        let (body, envelope) = {
            let mut state = self.state.lock();
            state.loading = false;
            match outcome {
                Ok(parsed) => parsed,
                Err(error) => {
                    drop(state);
                    tracing::warn!(%error, endpoint = endpoint.suffix(), "read failed");
                    return Err(error);
                }
            }
        };

        {
            let mut state = self.state.lock();
            state.data = envelope.records();
            state.meta = envelope.meta;
            if endpoint == Endpoint::Show {
                state.raw = Some(body.clone());
            }
        }
        if let Some(callback) = callback {
            callback(&body);
        }
        Ok(body)
    }

    async fn write(&self, endpoint: Endpoint, body: Value, callback: Option<Callback>) -> Result<Value, ApiError> {
        match self.send(endpoint, Some(&body)).await {
            Ok(response) => {
                let on_success = {
                    let mut state = self.state.lock();
                    state.saving = false;
                    state.on_success.clone()
                };
                if let Some(on_success) = on_success {
                    on_success(&response);
                }
                if let Some(callback) = callback {
                    callback(&response);
                }
                Ok(response)
            }
            Err(error) if endpoint == Endpoint::Store => Err(self.raise(error)),
            Err(error) => {
                tracing::warn!(%error, endpoint = endpoint.suffix(), "write failed");
                Err(error)
            }
        }
    }

    async fn destroy(&self, id: Value, callback: Option<Callback>) -> Result<Value, ApiError> {
        let response = match self.send(Endpoint::Destroy, None).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, %id, "delete failed");
                return Err(error);
            }
        };
        self.state.lock().data.retain(|record| !same_id(record, &id));
        if let Some(callback) = callback {
            callback(&response);
        }
        Ok(response)
    }

    fn raise(&self, error: ApiError) -> ApiError {
        match RequestError::new(error, &self.services.events) {
            Ok(request_error) => request_error.into(),
            Err(unrecognized) => unrecognized,
        }
    }
}

/// Ids match when equal as JSON, or when one is the decimal string of the
/// other (`7` and `"7"`).
fn same_id(record: &Value, id: &Value) -> bool {
    match (record.get("id"), id) {
        (Some(value), id) if value == id => true,
        (Some(Value::Number(n)), Value::String(s)) | (Some(Value::String(s)), Value::Number(n)) => n.to_string() == *s,
        _ => false,
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Resource")
            .field("route", &self.inner.route)
            .field("params", &state.params)
            .field("records", &state.data.len())
            .field("loading", &state.loading)
            .field("saving", &state.saving)
            .finish()
    }
}
