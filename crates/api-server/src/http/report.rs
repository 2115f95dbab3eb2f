use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::dispatch::{MailTransport, OutboundMail};
use shared::models::{FindingReportResponse, MailDeliveryStatus, SecurityFinding};
use shared::pipeline::{analyze_finding, resolve_index_id};
use shared::prompt::ReportMode;
use tracing::warn;

use super::AppState;
use super::errors::{bad_request_response, pipeline_error_response};
use super::observability::RequestContext;

/// Turns one security finding into a reviewer-ready report and mails it out.
/// Mail delivery is best effort: a failed send is reported in the response
/// body instead of failing the request, so the report itself is never lost.
pub(super) async fn report_finding(
    State(state): State<AppState>,
    Extension(request_context): Extension<RequestContext>,
    payload: Result<Json<SecurityFinding>, JsonRejection>,
) -> Response {
    let Ok(Json(finding)) = payload else {
        return bad_request_response(
            "invalid_body",
            "Request body must be a JSON security finding",
        );
    };

    let index_id = match resolve_index_id(&state.document_index, &state.config.index).await {
        Ok(index_id) => index_id,
        Err(err) => return pipeline_error_response(err),
    };

    let analysis = match analyze_finding(
        &state.document_index,
        &state.model_client,
        &index_id,
        &finding,
        ReportMode::Email,
    )
    .await
    {
        Ok(analysis) => analysis,
        Err(err) => return pipeline_error_response(err),
    };

    let mail = OutboundMail {
        subject: state.config.mail.subject.clone(),
        body: analysis.report.clone(),
        sender: state.config.mail.sender.clone(),
        recipient: state.config.mail.recipient.clone(),
    };
    let delivery = match state.mailer.send(mail).await {
        Ok(receipt) => MailDeliveryStatus::sent(receipt),
        Err(err) => {
            warn!(
                request_id = %request_context.request_id,
                finding_id = %finding.id,
                "report mail delivery failed: {err}"
            );
            MailDeliveryStatus::failed(&err)
        }
    };

    (
        StatusCode::OK,
        Json(FindingReportResponse {
            finding_id: finding.id.clone(),
            response: analysis.report,
            search_query: analysis.search_query,
            documents: analysis.documents,
            delivery,
        }),
    )
        .into_response()
}
