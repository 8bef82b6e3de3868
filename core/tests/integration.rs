//! Full resource lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives a `Resource` over
//! real HTTP through `UreqClient`. Validates that route resolution, query
//! encoding, envelope parsing and error surfacing agree with the server's
//! conventions end to end.

use std::time::Duration;

use resource_core::{
    ApiError, BusEvent, EventBus, Params, Resource, ResourceOptions, RouteTable, Services, UreqClient,
};
use serde_json::json;

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}")
}

const DEBOUNCE: Duration = Duration::from_millis(50);

fn users(base_url: &str, events: &EventBus, options: ResourceOptions) -> Resource {
    let routes = RouteTable::new(base_url).unwrap().resource("users");
    let http = UreqClient::with_timeout(Some(Duration::from_secs(5)));
    Resource::new(Services::new(http, routes, events.clone()), options.with_debounce(DEBOUNCE))
}

fn names(resource: &Resource) -> Vec<String> {
    resource
        .data()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn resource_lifecycle() {
    let base_url = start_server().await;
    let events = EventBus::default();
    let users = users(&base_url, &events, ResourceOptions::new("users"));

    // Step 1: list: empty collection, pagination meta passed through.
    users.fetch_all(Params::new(), None).await.unwrap();
    assert!(users.data().is_empty());
    assert_eq!(users.meta()["total"], 0);

    // Step 2: create three users.
    for name in ["Ada Lovelace", "Grace Hopper", "Alan Turing"] {
        let body = users.create(Params::new(), json!({ "name": name }), None).await.unwrap();
        assert_eq!(body["data"]["name"], name);
    }
    assert!(!users.is_saving());

    // Step 3: list all.
    users.fetch_all(Params::new(), None).await.unwrap();
    assert_eq!(names(&users), ["Ada Lovelace", "Grace Hopper", "Alan Turing"]);
    assert_eq!(users.meta()["total"], 3);

    // Step 4: exclude two ids.
    users.exclude([1, 2]);
    users.fetch_all(Params::new(), None).await.unwrap();
    assert_eq!(names(&users), ["Alan Turing"]);

    // Step 5: reset params and search.
    users.set_params(Params::new());
    users.query("ce", Params::new()).await.unwrap();
    assert_eq!(names(&users), ["Ada Lovelace", "Grace Hopper"]);

    // Step 6: fetch one.
    users.set_params(Params::new());
    users.fetch_one(Params::new().with("id", 2), None).await.unwrap();
    assert_eq!(users.raw().unwrap()["data"]["name"], "Grace Hopper");
    assert_eq!(names(&users), ["Grace Hopper"]);

    // Step 7: update through save.
    let body = users
        .save(json!({"name": "Grace Brewster Hopper"}), true, Some(json!(2)), Params::new())
        .await
        .unwrap();
    assert_eq!(body["data"], json!({"id": 2, "name": "Grace Brewster Hopper"}));

    // Step 8: list again, then delete one record locally and remotely.
    users.set_params(Params::new());
    users.fetch_all(Params::new(), None).await.unwrap();
    users.delete(3, None, Params::new()).await.unwrap();
    assert_eq!(names(&users), ["Ada Lovelace", "Grace Brewster Hopper"]);

    // Step 9: fetching the deleted record fails.
    users.set_params(Params::new());
    let err = users.fetch_one(Params::new().with("id", 3), None).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!users.is_loading());
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_create_is_published_on_the_bus() {
    let base_url = start_server().await;
    let events = EventBus::default();
    let mut received = events.subscribe();
    let users = users(&base_url, &events, ResourceOptions::new("users"));

    let err = users.create(Params::new(), json!({}), None).await.unwrap_err();
    assert_eq!(err.to_string(), "The given data was invalid.");
    assert_eq!(err.status(), Some(422));
    assert!(users.is_saving());

    match received.recv().await.unwrap() {
        BusEvent::RequestError(ApiError::Http { status, body }) => {
            assert_eq!(status, 422);
            let body: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(body["message"], "The given data was invalid.");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn autoload_fetches_seeded_collection() {
    let base_url = start_server().await;
    let events = EventBus::default();
    let seed = users(&base_url, &events, ResourceOptions::new("users"));
    seed.create(Params::new(), json!({"name": "Ada"}), None).await.unwrap();

    let loaded = users(&base_url, &events, ResourceOptions::new("users").autoload(true));
    for _ in 0..50 {
        if !loaded.is_loading() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!loaded.is_loading());
    assert_eq!(names(&loaded), ["Ada"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let routes = RouteTable::new(&format!("http://{addr}")).unwrap().resource("users");
    let services = Services::new(UreqClient::new(), routes, EventBus::default());
    let users = Resource::new(services, ResourceOptions::new("users"));
    let err = users.fetch_all(Params::new(), None).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
