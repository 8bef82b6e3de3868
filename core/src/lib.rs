//! Client-side wrapper for REST resource collections.
//!
//! # Overview
//! A [`Resource`] stands for one remote collection that follows the
//! index/show/store/update/destroy convention. It keeps the last page of
//! records the server returned, the request parameters merged across calls,
//! and `loading`/`saving` flags a UI can bind to. Reads are debounced so a
//! burst of calls (a search box, a pager) turns into one request.
//!
//! # Design
//! - Collaborators are injected through [`Services`]: an [`HttpClient`]
//!   (real: [`UreqClient`], tests: [`mock::MockHttpClient`]), a
//!   [`RouteResolver`] (stock: [`RouteTable`]) and an [`EventBus`].
//! - Requests and responses are plain data ([`HttpRequest`] /
//!   [`HttpResponse`]); clients only move bytes.
//! - Operations return a [`Dispatch`] right away. Await it for the body, or
//!   drop it and rely on the cached state and callbacks.
//! - A failed create becomes a [`RequestError`], logged and published on the
//!   bus under [`events::REQUEST_ERROR`].

pub mod config;
pub mod debounce;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod http;
pub mod mock;
pub mod params;
pub mod resource;
pub mod routes;
pub mod services;
pub mod transport;

pub use config::{Envelope, ResourceOptions, DEFAULT_DEBOUNCE_MS};
pub use dispatch::Dispatch;
pub use error::{ApiError, RequestError};
pub use events::{BusEvent, EventBus};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use params::Params;
pub use resource::{callback, Callback, Resource, SuccessCallback};
pub use routes::{Endpoint, RouteResolver, RouteTable};
pub use services::Services;
pub use transport::UreqClient;
