use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;
use server::{ServerState, router};

const PASSWORD: &str = "Secret123";

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    router(ServerState {
        engine: Arc::new(engine),
    })
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        let secret = base64::prelude::BASE64_STANDARD.encode(format!("{user}:{PASSWORD}"));
        request = request.header(header::AUTHORIZATION, format!("Basic {secret}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

async fn register(app: &Router, username: &str) {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": PASSWORD,
            "password2": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

async fn create_ad(app: &Router, user: &str, title: &str, category: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/ads",
        Some(user),
        Some(json!({
            "title": title,
            "description": format!("{title} in good shape, pick up in town"),
            "category": category,
            "condition": "used",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn propose(app: &Router, user: &str, sender: &str, receiver: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/proposals",
        Some(user),
        Some(json!({ "ad_sender_id": sender, "ad_receiver_id": receiver })),
    )
    .await
}

#[tokio::test]
async fn health_is_public() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn protected_routes_require_credentials() {
    let app = app().await;
    register(&app, "alice").await;

    let (status, _) = send(&app, Method::GET, "/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/users/me", Some("mallory"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/ads", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::GET, "/users/me", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["ads_count"], 0);
}

#[tokio::test]
async fn register_validates_input() {
    let app = app().await;
    register(&app, "alice").await;

    let payload = |username: &str, password2: &str| {
        json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": PASSWORD,
            "password2": password2,
        })
    };

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(payload("bob", "Different1")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "passwords do not match");

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(payload("alice", PASSWORD)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn ads_crud_and_search() {
    let app = app().await;
    register(&app, "alice").await;
    register(&app, "bob").await;
    let kettle = create_ad(&app, "alice", "Electric kettle", "electronics").await;
    create_ad(&app, "bob", "Electronics for dummies", "books").await;

    let (status, body) = send(&app, Method::GET, "/ads?search=electr", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ads"].as_array().unwrap().len(), 2);

    let (_, body) = send(
        &app,
        Method::GET,
        "/ads?search=electr&category=electronics",
        None,
        None,
    )
    .await;
    let ads = body["ads"].as_array().unwrap();
    assert_eq!(ads.len(), 1);
    assert_eq!(ads[0]["id"], kettle.as_str());

    let (_, body) = send(&app, Method::GET, "/ads?exclude_user=alice", None, None).await;
    assert_eq!(body["ads"][0]["owner"], "bob");

    let (status, _) = send(&app, Method::GET, "/ads?category=weapons", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/ads/{kettle}");
    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some("bob"),
        Some(json!({ "title": "Mine now" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some("alice"),
        Some(json!({ "title": "ab" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title"));

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some("alice"),
        Some(json!({ "condition": "new" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["condition"], "new");

    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Electric kettle");
    assert_eq!(body["received_proposals"], 0);

    let (status, _) = send(&app, Method::DELETE, &uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn ads_filter_by_lists_and_sort_by_title() {
    let app = app().await;
    register(&app, "alice").await;
    create_ad(&app, "alice", "Lamp", "furniture").await;
    create_ad(&app, "alice", "Atlas", "books").await;
    create_ad(&app, "alice", "Kite", "toys").await;

    let titles = |body: &Value| -> Vec<String> {
        body["ads"]
            .as_array()
            .unwrap()
            .iter()
            .map(|ad| ad["title"].as_str().unwrap().to_string())
            .collect()
    };

    let (status, body) = send(
        &app,
        Method::GET,
        "/ads?category__in=books,toys&ordering=title",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(titles(&body), ["Atlas", "Kite"]);

    let (_, body) = send(&app, Method::GET, "/ads?ordering=-title", None, None).await;
    assert_eq!(titles(&body), ["Lamp", "Kite", "Atlas"]);

    let (_, body) = send(&app, Method::GET, "/ads?condition__in=new", None, None).await;
    assert!(titles(&body).is_empty());

    let (status, _) = send(&app, Method::GET, "/ads?category__in=books,weapons", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::GET, "/ads?ordering=price", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn proposal_lifecycle_over_http() {
    let app = app().await;
    for user in ["alice", "bob", "carol"] {
        register(&app, user).await;
    }
    let bike = create_ad(&app, "alice", "Bike", "electronics").await;
    let book = create_ad(&app, "bob", "Book", "books").await;
    let toy = create_ad(&app, "carol", "Toy train", "toys").await;

    let (status, from_bob) = propose(&app, "bob", &book, &bike).await;
    assert_eq!(status, StatusCode::CREATED, "{from_bob}");
    assert_eq!(from_bob["status"], "pending");
    assert_eq!(from_bob["ad_receiver"]["owner"], "alice");
    let (status, from_carol) = propose(&app, "carol", &toy, &bike).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = propose(&app, "bob", &book, &bike).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = propose(&app, "bob", &bike, &book).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let from_bob_uri = format!("/proposals/{}/status", from_bob["id"].as_str().unwrap());
    let (status, _) = send(
        &app,
        Method::PATCH,
        &from_bob_uri,
        Some("bob"),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &from_bob_uri,
        Some("alice"),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "accepted");

    let (status, _) = send(
        &app,
        Method::PATCH,
        &from_bob_uri,
        Some("alice"),
        Some(json!({ "status": "rejected" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let carol_uri = format!("/proposals/{}", from_carol["id"].as_str().unwrap());
    let (status, body) = send(&app, Method::GET, &carol_uri, Some("carol"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");
    let (status, _) = send(&app, Method::GET, &carol_uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(
        &app,
        Method::GET,
        "/proposals?kind=received&status=rejected",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(body["sent"].as_array().unwrap().len(), 0);
    assert_eq!(body["received"].as_array().unwrap().len(), 1);
    assert_eq!(body["received"][0]["id"], from_carol["id"]);

    let (_, body) = send(
        &app,
        Method::GET,
        "/proposals?ad_sender_category=books&ad_receiver_category=electronics",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(body["received"].as_array().unwrap().len(), 1);
    assert_eq!(body["received"][0]["id"], from_bob["id"]);

    let (_, body) = send(&app, Method::GET, "/proposals?ordering=status", Some("alice"), None).await;
    assert_eq!(body["received"][0]["status"], "accepted");
    assert_eq!(body["received"][1]["status"], "rejected");
    let (_, body) = send(&app, Method::GET, "/proposals?ordering=-status", Some("alice"), None).await;
    assert_eq!(body["received"][0]["status"], "rejected");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/ads/{bike}/proposals"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"].as_array().unwrap().len(), 2);
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/ads/{bike}/proposals"),
        Some("bob"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_account_removes_everything() {
    let app = app().await;
    register(&app, "alice").await;
    register(&app, "bob").await;
    let laptop = create_ad(&app, "alice", "Laptop", "electronics").await;
    let guitar = create_ad(&app, "bob", "Guitar", "other").await;
    let (status, _) = propose(&app, "bob", &guitar, &laptop).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, Method::DELETE, "/users/me", Some("alice"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/users/alice", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&app, Method::GET, "/proposals", Some("bob"), None).await;
    assert_eq!(body["sent"].as_array().unwrap().len(), 0);

    let (status, body) = send(&app, Method::GET, "/users/bob", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ads_count"], 1);
    assert!(body.get("email").is_none());
}
