use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::{ChatTurnEvent, ChatTurnResponse};
use shared::pipeline::run_chat_turn;

use super::AppState;
use super::errors::{bad_request_response, pipeline_error_response};

pub(super) async fn chat_turn(
    State(state): State<AppState>,
    payload: Result<Json<ChatTurnEvent>, JsonRejection>,
) -> Response {
    let Ok(Json(event)) = payload else {
        return bad_request_response(
            "invalid_body",
            "Request body must be a JSON chat turn event",
        );
    };

    let outcome = match run_chat_turn(
        &state.document_index,
        &state.model_client,
        &state.model_client,
        &state.config.index,
        state.config.guardrail_name.as_deref(),
        &event,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => return pipeline_error_response(err),
    };

    let history_json = serde_json::json!(outcome.history).to_string();
    let response = ChatTurnResponse::fulfilled(&event, outcome.reply, history_json);

    (StatusCode::OK, Json(response)).into_response()
}
