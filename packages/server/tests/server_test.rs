use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use werewolf_server::app;
use werewolf_server::models::config::ServerConfig;
use werewolf_server::services::config_store::JsonConfigStore;
use werewolf_server::state::AppState;
use werewolf_server::utils::test_setup::setup_test_env;

fn test_app() -> (Router, AppState, tempfile::TempDir) {
    setup_test_env();
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        config_dir: dir.path().to_path_buf(),
        start_delay: Duration::from_secs(3600),
        ..ServerConfig::default()
    };
    let store = Arc::new(JsonConfigStore::new(dir.path()));
    let state = AppState::with_store(config, store);
    (app::create_app(state.clone()), state, dir)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_lobby_round_trip() {
    let (app, _state, _dir) = test_app();

    let (status, created) = send(
        &app,
        "POST",
        "/api/game/create",
        Some(json!({"community_id": 1, "channel_id": 2, "host": {"id": 10, "name": "Host"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let game_id = created["game_id"].as_str().unwrap().to_string();

    for (id, name) in [(11, "Ann"), (12, "Bob")] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/game/{}/join", game_id),
            Some(json!({"id": id, "name": name})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, lobby) = send(&app, "GET", &format!("/api/game/{}/state", game_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lobby["phase"], "Lobby");
    assert_eq!(lobby["players"].as_array().unwrap().len(), 3);

    let (status, _) = send(&app, "POST", &format!("/api/game/{}/start", game_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, late) = send(
        &app,
        "POST",
        &format!("/api/game/{}/join", game_id),
        Some(json!({"id": 13, "name": "Late"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(late["error"], "Game has already started");

    let (status, _) = send(&app, "POST", &format!("/api/game/{}/end", game_id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    let (app, _state, _dir) = test_app();
    let missing = uuid::Uuid::new_v4();

    let (status, body) = send(&app, "POST", &format!("/api/game/{}/start", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("Could not find game {}", missing));
}

#[tokio::test]
async fn test_config_is_persisted_per_community() {
    let (app, _state, dir) = test_app();

    let (status, _) = send(
        &app,
        "PUT",
        "/api/config/77/Werewolf/count",
        Some(json!({"value": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(dir.path().join("77.json").exists());

    let (status, config) = send(&app, "GET", "/api/config/77", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["Werewolf"]["count"], 2);
    assert_eq!(config["Villager"]["dead_see_roles"], 1);

    let (_, other) = send(&app, "GET", "/api/config/78/Werewolf/count", None).await;
    assert_eq!(other["value"], 1);
}

#[tokio::test]
async fn test_vote_input_without_session() {
    let (app, _state, _dir) = test_app();
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/vote/{}/select", uuid::Uuid::new_v4()),
        Some(json!({"voter_id": 1, "choice": "skip"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "This vote is no longer open");
}
