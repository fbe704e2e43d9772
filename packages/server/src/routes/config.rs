use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{config_rejection, ApiError, MessageBody};
use crate::models::{config::GameConfig, game::CommunityId};
use crate::services::config_store::{get_parameter, list_parameters, set_parameter};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ParameterValue {
    pub role: String,
    pub parameter: String,
    pub value: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleParameters {
    pub role: String,
    pub parameters: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetParameterRequest {
    pub value: i64,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/:community_id", get(get_config))
        .route("/:community_id/:role", get(read_parameters))
        .route(
            "/:community_id/:role/:parameter",
            get(read_parameter).put(write_parameter),
        )
        .with_state(state)
}

async fn get_config(
    State(state): State<AppState>,
    Path(community_id): Path<CommunityId>,
) -> Json<GameConfig> {
    Json(state.config_store.load(community_id).await)
}

async fn read_parameters(
    State(state): State<AppState>,
    Path((community_id, role)): Path<(CommunityId, String)>,
) -> Result<Json<RoleParameters>, ApiError> {
    let parameters = list_parameters(state.config_store.as_ref(), community_id, &role)
        .await
        .map_err(config_rejection)?;
    Ok(Json(RoleParameters { role, parameters }))
}

async fn read_parameter(
    State(state): State<AppState>,
    Path((community_id, role, parameter)): Path<(CommunityId, String, String)>,
) -> Result<Json<ParameterValue>, ApiError> {
    let value = get_parameter(state.config_store.as_ref(), community_id, &role, &parameter)
        .await
        .map_err(config_rejection)?;
    Ok(Json(ParameterValue {
        role,
        parameter,
        value,
    }))
}

async fn write_parameter(
    State(state): State<AppState>,
    Path((community_id, role, parameter)): Path<(CommunityId, String, String)>,
    Json(request): Json<SetParameterRequest>,
) -> Result<Json<MessageBody>, ApiError> {
    set_parameter(
        state.config_store.as_ref(),
        community_id,
        &role,
        &parameter,
        request.value,
    )
    .await
    .map_err(config_rejection)?;
    Ok(MessageBody::new(format!(
        "Changed {}: {} to {}",
        role, parameter, request.value
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_setup::setup_test_env;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_default_config_is_served() {
        setup_test_env();
        let response = routes(AppState::in_memory())
            .oneshot(request("GET", "/9", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let config: GameConfig = body_json(response).await;
        assert_eq!(config, GameConfig::defaults());
    }

    #[tokio::test]
    async fn test_set_then_get_parameter() {
        setup_test_env();
        let state = AppState::in_memory();

        let response = routes(state.clone())
            .oneshot(request(
                "PUT",
                "/9/Seer/chance",
                Some(serde_json::json!({"value": 75})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let changed: MessageBody = body_json(response).await;
        assert_eq!(changed.message, "Changed Seer: chance to 75");

        let response = routes(state)
            .oneshot(request("GET", "/9/Seer/chance", None))
            .await
            .unwrap();
        let value: ParameterValue = body_json(response).await;
        assert_eq!(value.value, 75);
    }

    #[tokio::test]
    async fn test_list_role_parameters() {
        setup_test_env();
        let state = AppState::in_memory();

        let response = routes(state.clone())
            .oneshot(request("GET", "/9/Villager", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed: RoleParameters = body_json(response).await;
        assert_eq!(
            listed.parameters,
            vec!["chance", "count", "can_skip_vote", "dead_see_roles"]
        );

        let response = routes(state)
            .oneshot(request("GET", "/9/Lich", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_count_is_rejected() {
        setup_test_env();
        let state = AppState::in_memory();

        let response = routes(state.clone())
            .oneshot(request(
                "PUT",
                "/9/Seer/count",
                Some(serde_json::json!({"value": 4294967295u64})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = routes(state)
            .oneshot(request("GET", "/9/Seer/count", None))
            .await
            .unwrap();
        let value: ParameterValue = body_json(response).await;
        assert_eq!(value.value, 1);
    }

    #[tokio::test]
    async fn test_rejections() {
        setup_test_env();
        let state = AppState::in_memory();

        let response = routes(state.clone())
            .oneshot(request("GET", "/9/Lich/chance", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: super::super::ErrorBody = body_json(response).await;
        assert_eq!(error.error, "Unknown role Lich");

        let response = routes(state.clone())
            .oneshot(request("GET", "/9/Seer/charisma", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = routes(state)
            .oneshot(request(
                "PUT",
                "/9/Medic/chance",
                Some(serde_json::json!({"value": 250})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
