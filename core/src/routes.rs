//! Named-route resolution.
//!
//! # Design
//! A resource never builds URLs itself. It asks the injected
//! `RouteResolver` for `<route>.<suffix>` and hands over its parameters.
//! `RouteTable` is the stock resolver: path templates such as
//! `/users/{id}` consume the parameters they name, and whatever is left
//! becomes the query string.
//!
//! Query encoding follows the bracket convention common to REST back ends:
//! `true`/`false` become `1`/`0`, `null` is dropped, arrays expand to
//! `key[0]=..`, and objects to `key[field]=..`.

use std::collections::HashMap;

use serde_json::Value;
use url::Url;

use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::params::Params;

/// The five conventional sub-endpoints of a resource collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Index,
    Show,
    Store,
    Update,
    Destroy,
}

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Endpoint::Index,
        Endpoint::Show,
        Endpoint::Store,
        Endpoint::Update,
        Endpoint::Destroy,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            Endpoint::Index => "index",
            Endpoint::Show => "show",
            Endpoint::Store => "store",
            Endpoint::Update => "update",
            Endpoint::Destroy => "destroy",
        }
    }

    pub fn method(self) -> HttpMethod {
        match self {
            Endpoint::Index | Endpoint::Show => HttpMethod::Get,
            Endpoint::Store => HttpMethod::Post,
            Endpoint::Update => HttpMethod::Put,
            Endpoint::Destroy => HttpMethod::Delete,
        }
    }

    /// `users` + `Show` is `users.show`.
    pub fn route_name(self, route: &str) -> String {
        format!("{route}.{}", self.suffix())
    }

    fn takes_id(self) -> bool {
        matches!(self, Endpoint::Show | Endpoint::Update | Endpoint::Destroy)
    }
}

/// Maps a route name plus parameters to a concrete URL.
pub trait RouteResolver: Send + Sync {
    fn url(&self, name: &str, params: &Params) -> Result<String, ApiError>;
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Param { name: String, optional: bool },
}

#[derive(Debug, Clone, PartialEq)]
struct Template {
    segments: Vec<Segment>,
}

impl Template {
    fn parse(template: &str) -> Self {
        let segments = template
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => match name.strip_suffix('?') {
                    Some(name) => Segment::Param {
                        name: name.to_string(),
                        optional: true,
                    },
                    None => Segment::Param {
                        name: name.to_string(),
                        optional: false,
                    },
                },
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        Self { segments }
    }
}

/// A table of named path templates under one base URL.
#[derive(Debug, Clone)]
pub struct RouteTable {
    base_url: Url,
    routes: HashMap<String, Template>,
}

impl RouteTable {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            routes: HashMap::new(),
        })
    }

    /// Register `name` with a path template like `/posts/{post}/comments/{id?}`.
    pub fn register(mut self, name: impl Into<String>, template: &str) -> Self {
        self.routes.insert(name.into(), Template::parse(template));
        self
    }

    /// Register the conventional endpoints for `route`. Dots in the route
    /// name nest the path: `admin.users` lives under `/admin/users`.
    pub fn resource(mut self, route: &str) -> Self {
        let collection = format!("/{}", route.replace('.', "/"));
        for endpoint in Endpoint::ALL {
            let template = if endpoint.takes_id() {
                format!("{collection}/{{id}}")
            } else {
                collection.clone()
            };
            self = self.register(endpoint.route_name(route), &template);
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }
}

impl RouteResolver for RouteTable {
    fn url(&self, name: &str, params: &Params) -> Result<String, ApiError> {
        let template = self
            .routes
            .get(name)
            .ok_or_else(|| ApiError::UnknownRoute(name.to_string()))?;

        let mut remaining = params.clone();
        let mut path = Vec::with_capacity(template.segments.len());
        for segment in &template.segments {
            match segment {
                Segment::Literal(literal) => path.push(literal.clone()),
                Segment::Param { name: param, optional } => {
                    match remaining.remove(param).as_ref().and_then(scalar) {
                        Some(value) => path.push(value),
                        None if *optional => {}
                        None => {
                            return Err(ApiError::MissingRouteParam {
                                route: name.to_string(),
                                param: param.clone(),
                            })
                        }
                    }
                }
            }
        }

        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty();
            segments.extend(path);
        }

        let mut pairs = Vec::new();
        for (key, value) in &remaining {
            flatten_query(key.clone(), value, &mut pairs);
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url.to_string())
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some("0".to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn flatten_query(key: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_query(format!("{key}[{i}]"), item, out);
            }
        }
        Value::Object(fields) => {
            for (field, item) in fields {
                flatten_query(format!("{key}[{field}]"), item, out);
            }
        }
        scalar_value => {
            if let Some(s) = scalar(scalar_value) {
                out.push((key, s));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> RouteTable {
        RouteTable::new("http://api.test").unwrap().resource("users")
    }

    #[test]
    fn resource_registers_all_five_endpoints() {
        let table = table();
        for endpoint in Endpoint::ALL {
            assert!(table.contains(&endpoint.route_name("users")), "{endpoint:?}");
        }
    }

    #[test]
    fn index_without_params_has_no_query() {
        assert_eq!(table().url("users.index", &Params::new()).unwrap(), "http://api.test/users");
    }

    #[test]
    fn id_fills_the_path_and_the_rest_is_query() {
        let params = Params::new().with("id", 7).with("include", "roles");
        assert_eq!(
            table().url("users.update", &params).unwrap(),
            "http://api.test/users/7?include=roles"
        );
    }

    #[test]
    fn missing_required_param_is_reported() {
        let err = table().url("users.show", &Params::new()).unwrap_err();
        assert_eq!(
            err,
            ApiError::MissingRouteParam {
                route: "users.show".to_string(),
                param: "id".to_string()
            }
        );
    }

    #[test]
    fn optional_param_may_be_absent() {
        let table = RouteTable::new("http://api.test")
            .unwrap()
            .register("reports", "/reports/{year?}");
        assert_eq!(table.url("reports", &Params::new()).unwrap(), "http://api.test/reports");
        let params = Params::new().with("year", 2024);
        assert_eq!(table.url("reports", &params).unwrap(), "http://api.test/reports/2024");
    }

    #[test]
    fn unknown_route_is_an_error() {
        let err = table().url("posts.index", &Params::new()).unwrap_err();
        assert_eq!(err, ApiError::UnknownRoute("posts.index".to_string()));
    }

    #[test]
    fn dotted_route_names_nest_paths_under_base_path() {
        let table = RouteTable::new("http://api.test/api/").unwrap().resource("admin.users");
        let params = Params::new().with("id", "u-1");
        assert_eq!(
            table.url("admin.users.destroy", &params).unwrap(),
            "http://api.test/api/admin/users/u-1"
        );
    }

    #[test]
    fn nested_values_use_bracket_keys() {
        let params = Params::new()
            .with("filter", json!({"active": true}))
            .with("ids", json!([3, 4]))
            .with("skip", Value::Null);
        assert_eq!(
            table().url("users.index", &params).unwrap(),
            "http://api.test/users?filter%5Bactive%5D=1&ids%5B0%5D=3&ids%5B1%5D=4"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(RouteTable::new("not a url"), Err(ApiError::InvalidUrl(_))));
        assert!(matches!(RouteTable::new("mailto:ops@example.com"), Err(ApiError::InvalidUrl(_))));
    }
}
