//! Bus API and gateway wiring tests
//!
//! The router is exercised in-process; vehicle sessions run against a
//! scripted transport.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use telebridge_core::{Credentials, FactPublisher, MessageSink, ProtocolMessage};
use telebridge_exchange::{CorrelatedExchange, ExchangeConfig, JsonCodec, MockTransport};
use telebridge_vehicle::{SessionError, VehicleConfig, VehicleSession};
use telebridged::handlers::{CommandResponse, VehicleListResponse};
use telebridged::{build_sessions, create_router, watch, with_auth, AppState, GatewayConfig, RetainedBus};
use tower::ServiceExt;
use url::Url;

const ACCOUNT: &str = "acct";

fn session(bus: Arc<RetainedBus>, transport: Arc<MockTransport>, vin: &str) -> VehicleSession {
    let exchange = CorrelatedExchange::new(
        transport,
        Arc::new(JsonCodec),
        Url::parse("https://backend.test").unwrap(),
    )
    .with_config(ExchangeConfig {
        max_attempts: 3,
        deadline: Duration::from_secs(30),
        retry_delay: Duration::from_millis(1),
    });
    VehicleSession::new(
        VehicleConfig {
            vin: vin.to_string(),
            ..Default::default()
        },
        Credentials::new("uid", "token"),
        exchange,
        FactPublisher::new(bus, format!("{}/vehicles/{}", ACCOUNT, vin)),
    )
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn vehicle_message(vin: &str, id: i64, time: &str) -> String {
    serde_json::json!({
        "messageId": id,
        "messageType": "323",
        "title": "Charging",
        "messageTime": time,
        "sender": "backend",
        "content": "Charging complete",
        "vin": vin,
    })
    .to_string()
}

fn router(bus: Arc<RetainedBus>) -> Router {
    create_router(AppState::new(bus, ACCOUNT))
}

#[tokio::test]
async fn test_health() {
    let app = router(Arc::new(RetainedBus::new()));
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");
}

#[tokio::test]
async fn test_topics_snapshot_and_single_topic() {
    let bus = Arc::new(RetainedBus::new());
    bus.publish("acct/vehicles/VIN1/drivetrain/soc", b"80.5".to_vec(), true, 0)
        .await
        .unwrap();
    bus.publish("acct/vehicles/VIN2/drivetrain/soc", b"12".to_vec(), true, 0)
        .await
        .unwrap();
    let app = router(bus);

    let response = app.clone().oneshot(get("/topics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(snapshot["acct/vehicles/VIN1/drivetrain/soc"], "80.5");
    assert_eq!(snapshot["acct/vehicles/VIN2/drivetrain/soc"], "12");

    let response = app
        .clone()
        .oneshot(get("/topics?prefix=acct/vehicles/VIN2/"))
        .await
        .unwrap();
    let snapshot: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(snapshot.as_object().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(get("/topics/acct/vehicles/VIN1/drivetrain/soc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "80.5");

    let response = app
        .oneshot(get("/topics/acct/vehicles/VIN1/drivetrain/range"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_auth_required_except_health() {
    let app = with_auth(router(Arc::new(RetainedBus::new())), Some("secret".to_string()));

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/topics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/topics")
        .header("authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/topics")
        .header("authorization", "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rejected_token_answers_json_error() {
    let app = with_auth(router(Arc::new(RetainedBus::new())), Some("secret".to_string()));
    let request = Request::builder()
        .uri("/vehicles")
        .header("authorization", "Bearer secre")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_local_command_acknowledged() {
    let bus = Arc::new(RetainedBus::new());
    let transport = Arc::new(MockTransport::new());
    let (handle, _task) = session(bus.clone(), transport, "VIN1").spawn();
    let app = create_router(AppState::new(bus.clone(), ACCOUNT).with_vehicles([handle]));

    let response = app
        .clone()
        .oneshot(post(
            "/commands/acct/vehicles/VIN1/drivetrain/hvBatteryActive",
            "false",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: CommandResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body.topic, "acct/vehicles/VIN1/drivetrain/hvBatteryActive");
    assert_eq!(body.result.as_deref(), Some("Success"));
    assert_eq!(
        bus.retained("acct/vehicles/VIN1/drivetrain/hvBatteryActive"),
        Some(b"false".to_vec())
    );

    let response = app.oneshot(get("/vehicles")).await.unwrap();
    let vehicles: VehicleListResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(vehicles.items.len(), 1);
    assert_eq!(vehicles.items[0].prefix, "acct/vehicles/VIN1");
}

#[tokio::test]
async fn test_retained_command_rejected_by_session() {
    let bus = Arc::new(RetainedBus::new());
    let transport = Arc::new(MockTransport::new());
    let (handle, _task) = session(bus.clone(), transport.clone(), "VIN1").spawn();
    let app = create_router(AppState::new(bus, ACCOUNT).with_vehicles([handle]));

    let response = app
        .oneshot(post(
            "/commands/acct/vehicles/VIN1/doors/locked?retained=true",
            "true",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: CommandResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(
        body.result.as_deref(),
        Some("Command failed. Message may not be retained")
    );
}

#[tokio::test]
async fn test_command_topic_validation() {
    let bus = Arc::new(RetainedBus::new());
    let transport = Arc::new(MockTransport::new());
    let (handle, _task) = session(bus.clone(), transport, "VIN1").spawn();
    let app = create_router(AppState::new(bus, ACCOUNT).with_vehicles([handle]));

    let response = app
        .clone()
        .oneshot(post("/commands/other/vehicles/VIN1/doors/locked", "true"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post("/commands/acct/vehicles/VIN9/doors/locked", "true"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_slow_command_answers_accepted() {
    let bus = Arc::new(RetainedBus::new());
    let transport = Arc::new(MockTransport::new());
    transport.set_latency(Duration::from_secs(5));
    let (handle, _task) = session(bus.clone(), transport, "VIN1").spawn();
    let app = create_router(
        AppState::new(bus, ACCOUNT)
            .with_vehicles([handle])
            .with_command_timeout(Duration::from_millis(50)),
    );

    let response = app
        .oneshot(post("/commands/acct/vehicles/VIN1/doors/locked", "true"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body: CommandResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body.result, None);
}

#[tokio::test]
async fn test_stopped_session_is_unavailable() {
    let bus = Arc::new(RetainedBus::new());
    bus.close();
    let transport = Arc::new(MockTransport::new());
    let (handle, task) = session(bus.clone(), transport, "VIN1").spawn();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(SessionError::Sink(_))));

    let app = create_router(AppState::new(bus, ACCOUNT).with_vehicles([handle]));
    let response = app
        .oneshot(post("/commands/acct/vehicles/VIN1/doors/locked", "true"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

const GATEWAY_CONFIG: &str = r#"
[backend]
base_url = "https://backend.test"

[refresh]
tick_ms = 10

[bus]
account_prefix = "acct/"

[credentials]
uid = "uid"
token = "token"

[[vehicles]]
vin = "VIN1"

[[vehicles]]
vin = "VIN2"
abrp_user_token = "user-token"
"#;

#[tokio::test]
async fn test_build_sessions_from_config() {
    let config: GatewayConfig = toml::from_str(GATEWAY_CONFIG).unwrap();
    config.validate().unwrap();
    let bus = Arc::new(RetainedBus::new());

    let sessions = build_sessions(&config, Arc::new(MockTransport::new()), bus).unwrap();

    let vins: Vec<&str> = sessions.iter().map(|s| s.vin()).collect();
    assert_eq!(vins, vec!["VIN1", "VIN2"]);
}

#[tokio::test]
async fn test_expired_session_reported_by_watch() {
    let config: GatewayConfig = toml::from_str(GATEWAY_CONFIG).unwrap();
    let bus = Arc::new(RetainedBus::new());
    let transport = Arc::new(MockTransport::new());
    transport.push_json(&ProtocolMessage {
        application_id: "511".to_string(),
        protocol_version: 25857,
        correlation_id: 0,
        error_present: true,
        result_code: 2,
        error_text: b"token expired".to_vec(),
        payload: None,
    });

    let mut sessions = build_sessions(&config, transport, bus.clone()).unwrap();
    let session = sessions.remove(0);
    let (handle, task) = session.spawn();
    let mut exits = watch(vec![("VIN1".to_string(), task)]);

    let exit = tokio::time::timeout(Duration::from_secs(5), exits.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit.vin, "VIN1");
    assert!(exit.requires_authentication());
    assert!(bus.retained("acct/vehicles/VIN1/refresh/mode").is_some());
    drop(handle);
}

#[tokio::test]
async fn test_vehicle_message_published() {
    let bus = Arc::new(RetainedBus::new());
    let transport = Arc::new(MockTransport::new());
    let (handle, _task) = session(bus.clone(), transport, "VIN1").spawn();
    let app = create_router(AppState::new(bus.clone(), ACCOUNT).with_vehicles([handle]));
    let mut events = bus.subscribe();

    let response = app
        .oneshot(post_json(
            "/vehicles/VIN1/messages",
            &vehicle_message("VIN1", 7, "2024-03-01T10:00:00Z"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let published = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let message = events.recv().await.unwrap();
            if message.topic == "acct/vehicles/VIN1/info/lastMessage" {
                return message;
            }
        }
    })
    .await
    .unwrap();

    let json: serde_json::Value = serde_json::from_slice(&published.payload).unwrap();
    assert_eq!(json["messageId"], 7);
    assert_eq!(json["content"], "Charging complete");
    assert!(bus.retained("acct/vehicles/VIN1/info/lastMessage").is_some());
}

#[tokio::test]
async fn test_vehicle_message_with_same_time_published_once() {
    let bus = Arc::new(RetainedBus::new());
    let transport = Arc::new(MockTransport::new());
    let (handle, _task) = session(bus.clone(), transport, "VIN1").spawn();
    let app = create_router(AppState::new(bus.clone(), ACCOUNT).with_vehicles([handle]));
    let mut events = bus.subscribe();

    for id in [1, 2] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/vehicles/VIN1/messages",
                &vehicle_message("VIN1", id, "2024-03-01T10:00:00Z"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    // The session handles inputs in order, so once this command is
    // acknowledged both messages have been processed.
    let response = app
        .oneshot(post(
            "/commands/acct/vehicles/VIN1/drivetrain/hvBatteryActive",
            "false",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut last_messages = Vec::new();
    while let Ok(message) = events.try_recv() {
        if message.topic == "acct/vehicles/VIN1/info/lastMessage" {
            last_messages.push(message);
        }
    }
    assert_eq!(last_messages.len(), 1);
    let json: serde_json::Value = serde_json::from_slice(&last_messages[0].payload).unwrap();
    assert_eq!(json["messageId"], 1);
}

#[tokio::test]
async fn test_vehicle_message_routing_errors() {
    let bus = Arc::new(RetainedBus::new());
    let transport = Arc::new(MockTransport::new());
    let (handle, _task) = session(bus.clone(), transport, "VIN1").spawn();
    let app = create_router(AppState::new(bus, ACCOUNT).with_vehicles([handle]));

    let response = app
        .clone()
        .oneshot(post_json(
            "/vehicles/VIN9/messages",
            &vehicle_message("VIN9", 1, "2024-03-01T10:00:00Z"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"], "not_found");

    let response = app
        .oneshot(post_json(
            "/vehicles/VIN1/messages",
            &vehicle_message("VIN2", 1, "2024-03-01T10:00:00Z"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
