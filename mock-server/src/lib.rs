use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const PER_PAGE: usize = 15;

/// Every collection, keyed by resource name, each ordered by id.
#[derive(Debug, Default)]
pub struct Store {
    collections: HashMap<String, BTreeMap<u64, Value>>,
    next_id: u64,
}

impl Store {
    /// Seed `resource` with `records`, assigning ids in order.
    pub fn with_records(mut self, resource: &str, records: Vec<Value>) -> Self {
        for record in records {
            if let Value::Object(fields) = record {
                self.insert(resource, fields);
            }
        }
        self
    }

    fn insert(&mut self, resource: &str, mut fields: Map<String, Value>) -> Value {
        self.next_id += 1;
        let id = self.next_id;
        fields.insert("id".to_string(), json!(id));
        let record = Value::Object(fields);
        self.collections
            .entry(resource.to_string())
            .or_default()
            .insert(id, record.clone());
        record
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Debug, Serialize)]
pub struct Meta {
    pub current_page: usize,
    pub last_page: usize,
    pub per_page: usize,
    pub total: usize,
}

/// Error response in the `{message}` shape clients expect.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    message: String,
}

impl Failure {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Record not found.".to_string(),
        }
    }

    fn invalid(message: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

pub fn app() -> Router {
    app_with(Store::default())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/{resource}", get(index).post(store_record))
        .route("/{resource}/{id}", get(show).put(update).delete(destroy))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn id_list(filters: &HashMap<String, String>, key: &str) -> Option<Vec<u64>> {
    filters
        .get(key)
        .map(|list| list.split(',').filter_map(|id| id.trim().parse().ok()).collect())
}

fn matches_keyword(record: &Value, keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    match record {
        Value::Object(fields) => fields.values().any(|value| match value {
            Value::String(s) => s.to_lowercase().contains(&keyword),
            _ => false,
        }),
        _ => false,
    }
}

async fn index(
    State(db): State<Db>,
    Path(resource): Path<String>,
    Query(filters): Query<HashMap<String, String>>,
) -> Json<Value> {
    let store = db.read().await;
    let exclude = id_list(&filters, "exclude").unwrap_or_default();
    let only = id_list(&filters, "only");
    let keyword = filters.get("query").filter(|q| !q.is_empty());

    let matching: Vec<&Value> = store
        .collections
        .get(&resource)
        .into_iter()
        .flat_map(|records| records.iter())
        .filter(|(id, _)| !exclude.contains(id))
        .filter(|(id, _)| only.as_ref().is_none_or(|only| only.contains(id)))
        .filter(|(_, record)| keyword.is_none_or(|keyword| matches_keyword(record, keyword)))
        .map(|(_, record)| record)
        .collect();

    let total = matching.len();
    let last_page = total.div_ceil(PER_PAGE).max(1);
    let current_page = filters
        .get("page")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, last_page);
    let data: Vec<Value> = matching
        .into_iter()
        .skip((current_page - 1) * PER_PAGE)
        .take(PER_PAGE)
        .cloned()
        .collect();

    tracing::debug!(%resource, total, current_page, "index");
    Json(json!({
        "data": data,
        "meta": Meta { current_page, last_page, per_page: PER_PAGE, total },
    }))
}

async fn show(State(db): State<Db>, Path((resource, id)): Path<(String, u64)>) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    let record = store
        .collections
        .get(&resource)
        .and_then(|records| records.get(&id))
        .ok_or_else(Failure::not_found)?;
    Ok(Json(json!({ "data": record })))
}

async fn store_record(
    State(db): State<Db>,
    Path(resource): Path<String>,
    Json(input): Json<Value>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let fields = match input {
        Value::Object(fields) if !fields.is_empty() => fields,
        _ => return Err(Failure::invalid("The given data was invalid.")),
    };
    let record = db.write().await.insert(&resource, fields);
    tracing::info!(%resource, id = %record["id"], "stored");
    Ok((StatusCode::CREATED, Json(json!({ "data": record }))))
}

async fn update(
    State(db): State<Db>,
    Path((resource, id)): Path<(String, u64)>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, Failure> {
    let Value::Object(changes) = input else {
        return Err(Failure::invalid("The given data was invalid."));
    };
    let mut store = db.write().await;
    let record = store
        .collections
        .get_mut(&resource)
        .and_then(|records| records.get_mut(&id))
        .ok_or_else(Failure::not_found)?;
    if let Value::Object(fields) = record {
        for (key, value) in changes {
            if key != "id" {
                fields.insert(key, value);
            }
        }
    }
    tracing::info!(%resource, id, "updated");
    Ok(Json(json!({ "data": record })))
}

async fn destroy(State(db): State<Db>, Path((resource, id)): Path<(String, u64)>) -> Result<StatusCode, Failure> {
    let mut store = db.write().await;
    store
        .collections
        .get_mut(&resource)
        .and_then(|records| records.remove(&id))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(Failure::not_found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_records_get_sequential_ids() {
        let store = Store::default().with_records("users", vec![json!({"name": "a"}), json!({"name": "b"})]);
        let users = &store.collections["users"];
        assert_eq!(users[&1]["name"], "a");
        assert_eq!(users[&2]["id"], 2);
    }

    #[test]
    fn non_object_seeds_are_skipped() {
        let store = Store::default().with_records("users", vec![json!(1), json!({"name": "a"})]);
        assert_eq!(store.collections["users"].len(), 1);
    }

    #[test]
    fn keyword_matches_string_fields_case_insensitively() {
        let record = json!({"id": 1, "name": "Ada Lovelace"});
        assert!(matches_keyword(&record, "lovelace"));
        assert!(!matches_keyword(&record, "1"));
    }

    #[test]
    fn id_list_ignores_garbage() {
        let filters = HashMap::from([("only".to_string(), "1, 2,x".to_string())]);
        assert_eq!(id_list(&filters, "only"), Some(vec![1, 2]));
        assert_eq!(id_list(&filters, "exclude"), None);
    }

    #[test]
    fn meta_serializes_page_size() {
        let meta = serde_json::to_value(Meta {
            current_page: 1,
            last_page: 1,
            per_page: PER_PAGE,
            total: 0,
        })
        .unwrap();
        assert_eq!(meta["per_page"], PER_PAGE);
    }
}
