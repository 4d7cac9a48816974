//! Integration tests for the HTTP API.
//!
//! The router runs against an in-memory user store and the in-memory
//! broker, so no database or RabbitMQ is needed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{NotificationRequest, User, UserDraft};
use messaging::{BrokerConfig, InMemoryBroker, MessageChannel, Subscription};
use user_service_lib::api::{create_router, AppState};
use user_service_lib::notifier::BrokerNotifier;
use user_service_lib::repository::UserRepository;
use user_service_lib::service::UserManager;
use user_service_lib::telemetry::WELCOME_PUBLISH_FAILURES;

// =============================================================================
// Test Fixtures
// =============================================================================

/// User store backed by a HashMap, keeping insertion order for listing.
#[derive(Default)]
struct InMemoryUserRepository {
    users: Mutex<(Vec<Uuid>, HashMap<Uuid, User>)>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, draft: UserDraft) -> AppResult<User> {
        let user = User::new(Uuid::new_v4(), draft.name, draft.email);
        let mut guard = self.users.lock().unwrap();
        guard.0.push(user.id);
        guard.1.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().1.get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let guard = self.users.lock().unwrap();
        let (order, users) = &*guard;
        let listed = order.iter().filter_map(|id| users.get(id).cloned()).collect();
        Ok(listed)
    }

    async fn update(&self, user: User) -> AppResult<User> {
        let mut guard = self.users.lock().unwrap();
        let slot = guard.1.get_mut(&user.id).ok_or(AppError::NotFound)?;
        *slot = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut guard = self.users.lock().unwrap();
        guard.1.remove(&id).ok_or(AppError::NotFound)?;
        guard.0.retain(|existing| *existing != id);
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.users.lock().unwrap().1.contains_key(&id))
    }
}

struct TestApp {
    router: Router,
    broker: InMemoryBroker,
    welcome: Subscription,
}

async fn test_app() -> TestApp {
    test_app_with(|state| state).await
}

async fn test_app_with(configure: impl FnOnce(AppState) -> AppState) -> TestApp {
    let config = BrokerConfig::default();
    let broker = InMemoryBroker::with_topology(&config);
    let welcome = broker.subscribe(&config.queue, "test").await.unwrap();

    let channel: Arc<dyn MessageChannel> = Arc::new(broker.clone());
    let notifier = Arc::new(BrokerNotifier::from_config(channel.clone(), &config));
    let repo = Arc::new(InMemoryUserRepository::default());
    let service = Arc::new(UserManager::new(repo, notifier));

    TestApp {
        router: create_router(configure(AppState::new(service, channel))),
        broker,
        welcome,
    }
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_create_user_returns_201_and_publishes_welcome() {
    let mut app = test_app().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/users",
        Some(json!({"name": "Ana", "email": "ana@example.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Ana");
    assert_eq!(body["email"], "ana@example.com");
    assert!(Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());

    let message = app.welcome.next().await.unwrap().unwrap();
    let notification: NotificationRequest = serde_json::from_slice(&message.payload).unwrap();
    assert_eq!(notification.to, "ana@example.com");
    assert_eq!(notification.subject, "Bem-vindo ao nosso sistema!");
    assert_eq!(
        notification.body,
        "Olá, Ana! Seu cadastro foi realizado com sucesso."
    );
}

#[tokio::test]
async fn test_create_user_missing_email_returns_400() {
    let app = test_app().await;

    let (status, body) = send(&app.router, "POST", "/users", Some(json!({"name": "Ana"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Nome e e-mail são obrigatórios.");

    let (_, list) = send(&app.router, "GET", "/users", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_create_user_succeeds_during_broker_outage() {
    let app = test_app().await;
    app.broker.set_unavailable(true);

    let (status, body) = send(
        &app.router,
        "POST",
        "/users",
        Some(json!({"name": "Bia", "email": "bia@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = body["id"].as_str().unwrap();
    let (status, fetched) = send(&app.router, "GET", &format!("/users/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Bia");
}

#[tokio::test]
async fn test_malformed_json_returns_400() {
    let app = test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/users")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_user_returns_404() {
    let app = test_app().await;

    let (status, body) = send(
        &app.router,
        "GET",
        &format!("/users/{}", Uuid::new_v4()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_uuid_returns_400() {
    let app = test_app().await;

    let (status, _) = send(&app.router, "GET", "/users/not-a-uuid", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_users_in_creation_order() {
    let app = test_app().await;

    for (name, email) in [("Ana", "ana@example.com"), ("Bia", "bia@example.com")] {
        send(&app.router, "POST", "/users", Some(json!({"name": name, "email": email}))).await;
    }

    let (status, body) = send(&app.router, "GET", "/users", None).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Ana", "Bia"]);
}

#[tokio::test]
async fn test_update_user_and_delete() {
    let app = test_app().await;

    let (_, created) = send(
        &app.router,
        "POST",
        "/users",
        Some(json!({"name": "Ana", "email": "ana@example.com"})),
    )
    .await;
    let uri = format!("/users/{}", created["id"].as_str().unwrap());

    let (status, updated) = send(
        &app.router,
        "POST",
        &uri,
        Some(json!({"name": "Ana Maria", "email": "ana.maria@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["name"], "Ana Maria");

    let (status, fetched) = send(&app.router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(fetched["name"], "Ana Maria");
    assert_eq!(fetched["email"], "ana.maria@example.com");

    let (status, body) = send(&app.router, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app.router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.router, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_unknown_user_returns_404() {
    let app = test_app().await;

    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/users/{}", Uuid::new_v4()),
        Some(json!({"name": "X", "email": "x@example.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_broker_state() {
    let app = test_app().await;

    let (status, body) = send(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    app.broker.set_unavailable(true);
    let (status, body) = send(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["broker"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_created_users_get_distinct_ids() {
    let app = test_app().await;
    let body = json!({"name": "Ana", "email": "ana@example.com"});

    let (_, first) = send(&app.router, "POST", "/users", Some(body.clone())).await;
    let (_, second) = send(&app.router, "POST", "/users", Some(body)).await;

    assert_ne!(first["id"], second["id"]);

    let (_, fetched) = send(
        &app.router,
        "GET",
        &format!("/users/{}", first["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(fetched, first);
}

#[tokio::test]
async fn test_metrics_endpoint_renders_recorded_counters() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::with_local_recorder(&recorder, || {
        metrics::counter!(WELCOME_PUBLISH_FAILURES).increment(3);
    });

    let app = test_app_with(|state| state.with_metrics(handle)).await;
    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("user_service_welcome_publish_failures_total 3"));
}

#[tokio::test]
async fn test_metrics_endpoint_without_recorder() {
    let app = test_app().await;
    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"# Metrics not initialized\n");
}
