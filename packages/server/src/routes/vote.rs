use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{vote_rejection, ApiError, MessageBody};
use crate::models::{
    player::PlayerId,
    vote::{BallotInput, Choice, SessionId},
};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectRequest {
    pub voter_id: u64,
    pub choice: Choice,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub voter_id: u64,
}

/// HTTP entry for the same inputs a websocket client sends.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest(
            "/:session_id",
            Router::new()
                .route("/select", post(select))
                .route("/confirm", post(confirm)),
        )
        .with_state(state)
}

async fn select(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<MessageBody>, ApiError> {
    state
        .hub
        .route(
            session_id,
            PlayerId(request.voter_id),
            BallotInput::Select {
                choice: request.choice,
            },
        )
        .map_err(vote_rejection)?;
    Ok(MessageBody::new("Selection received"))
}

async fn confirm(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<MessageBody>, ApiError> {
    state
        .hub
        .route(session_id, PlayerId(request.voter_id), BallotInput::Confirm)
        .map_err(vote_rejection)?;
    Ok(MessageBody::new("Confirmation received"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        player::Player,
        vote::VoteOutcome,
    };
    use crate::services::voting::{VoteSettings, VotingSession};
    use crate::utils::test_setup::setup_test_env;
    use crate::utils::websocket::ServerMessage;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        setup_test_env();
        let state = AppState::in_memory();
        let uri = format!("/{}/confirm", SessionId::new());

        let response = routes(state)
            .oneshot(post_json(&uri, serde_json::json!({"voter_id": 1})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_http_inputs_resolve_a_vote() {
        setup_test_env();
        let state = AppState::in_memory();
        let roster: Vec<Player> = (1..=3)
            .map(|i| Player::new(PlayerId(i), format!("P{}", i)))
            .collect();
        let mut rx = state.hub.subscribe_player(PlayerId(1)).await;

        let hub = state.hub.clone();
        let vote = tokio::spawn(async move {
            VotingSession::new("Exile", &roster[..1], &roster[1..], VoteSettings::new())
                .run(&hub)
                .await
        });

        let session = loop {
            if let ServerMessage::Choice(request) = rx.recv().await.unwrap() {
                break request.session;
            }
        };

        let response = routes(state.clone())
            .oneshot(post_json(
                &format!("/{}/select", session),
                serde_json::json!({"voter_id": 1, "choice": {"player": 3}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = routes(state.clone())
            .oneshot(post_json(
                &format!("/{}/confirm", session),
                serde_json::json!({"voter_id": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let result = vote.await.unwrap();
        assert_eq!(result.outcome, VoteOutcome::Winner(PlayerId(3)));
        assert_eq!(state.hub.open_routes(), 0);
    }
}
