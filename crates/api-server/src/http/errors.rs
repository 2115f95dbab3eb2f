use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::{ErrorBody, ErrorResponse};
use shared::pipeline::PipelineError;
use tracing::error;

pub(super) fn bad_request_response(code: &str, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            },
        }),
    )
        .into_response()
}

pub(super) fn internal_error_response(code: &str, message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            },
        }),
    )
        .into_response()
}

/// Validation problems are the caller's fault and carry their message through.
/// Upstream failures are logged in full and answered with a stable code only.
pub(super) fn pipeline_error_response(err: PipelineError) -> Response {
    match err {
        PipelineError::Validation(message) => bad_request_response("invalid_request", &message),
        PipelineError::Retrieval(err) => {
            error!("context retrieval failed: {err}");
            internal_error_response("retrieval_failed", "Context retrieval failed")
        }
        PipelineError::Invocation(err) => {
            error!("model invocation failed: {err}");
            internal_error_response("model_invocation_failed", "Model invocation failed")
        }
        PipelineError::Delivery(err) => {
            error!("result delivery failed: {err}");
            internal_error_response("delivery_failed", "Result delivery failed")
        }
    }
}
