use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::generate::InvocationError;
use shared::models::AnswerRequest;
use shared::pipeline::{PipelineError, resolve_index_id, run_answer};
use tracing::error;

use super::AppState;

/// Plain-text question answering over the document index. Replies are plain
/// strings rather than JSON envelopes, including the error cases, matching
/// what the upstream chat widget expects.
pub(super) async fn answer_query(
    State(state): State<AppState>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return plain_response(StatusCode::BAD_REQUEST, "Invalid request body".to_string());
    };

    let Some(query) = request
        .query
        .as_deref()
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .map(ToString::to_string)
    else {
        return plain_response(StatusCode::BAD_REQUEST, "No query provided".to_string());
    };

    // A key in the request body wins over the configured one; with neither,
    // the caller has no way to reach the model.
    let model_api_key = request
        .model_api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty());
    let chat_client = match model_api_key {
        Some(key) => state.chat_client.with_api_key(key),
        None if state.chat_client.has_api_key() => state.chat_client.clone(),
        None => {
            return plain_response(
                StatusCode::BAD_REQUEST,
                "Model API key not provided".to_string(),
            );
        }
    };

    let search_api_key = request
        .search_api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty());
    let document_index = match search_api_key {
        Some(key) => state.document_index.with_api_key(key),
        None => state.document_index.clone(),
    };

    let index_id = match resolve_index_id(&document_index, &state.config.index).await {
        Ok(index_id) => index_id,
        Err(err) => return answer_error_response(err),
    };

    let answer = match run_answer(&document_index, &chat_client, &index_id, &query).await {
        Ok(answer) => answer,
        Err(err) => return answer_error_response(err),
    };

    let answer = match &state.redactor {
        Some(redactor) => match redactor.redact(&answer).await {
            Ok(redacted) => redacted,
            Err(err) => {
                error!("answer redaction failed: {err}");
                return plain_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("An error occurred while processing your request: {err}"),
                );
            }
        },
        None => answer,
    };

    plain_response(
        StatusCode::OK,
        format!("Query: {query}\n\nResponse: {answer}"),
    )
}

fn answer_error_response(err: PipelineError) -> Response {
    match err {
        PipelineError::Validation(message) => plain_response(StatusCode::BAD_REQUEST, message),
        PipelineError::Retrieval(err) => {
            error!("answer context search failed: {err}");
            plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error occurred while searching: {err}"),
            )
        }
        PipelineError::Invocation(InvocationError::Unauthorized) => {
            error!("answer model call rejected the api key");
            plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An authentication error occurred while calling the model API. Please check \
                 your API key and endpoint."
                    .to_string(),
            )
        }
        PipelineError::Invocation(err) => {
            error!("answer model call failed: {err}");
            plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error occurred while calling the model API: {err}"),
            )
        }
        PipelineError::Delivery(err) => {
            error!("answer delivery failed: {err}");
            plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error occurred while processing your request: {err}"),
            )
        }
    }
}

fn plain_response(status: StatusCode, body: String) -> Response {
    (status, body).into_response()
}
