use thiserror::Error;
use tracing::{info, warn};

use crate::config::IndexSelection;
use crate::dispatch::DeliveryError;
use crate::generate::{GuardrailCatalog, InvocationError, PromptEnvelope, TextGenerator};
use crate::history::{ConversationTurn, build_updated_history, parse_chat_history, render_history};
use crate::models::{ChatTurnEvent, SecurityFinding};
use crate::prompt::{self, ReportMode};
use crate::retrieval::{DocumentIndex, RetrievalError, RetrievedDocument};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("context retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("model invocation failed: {0}")]
    Invocation(#[from] InvocationError),
    #[error("result delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Everything the finding pipeline produced for one finding: the generated
/// search query, the documents it pulled back, and the report text.
#[derive(Debug, Clone)]
pub struct FindingAnalysis {
    pub search_query: String,
    pub documents: Vec<RetrievedDocument>,
    pub report: String,
}

#[derive(Debug, Clone)]
pub struct ChatTurnOutcome {
    pub reply: String,
    pub history: Vec<ConversationTurn>,
}

/// Resolves the selection to a concrete index id, going to the index service
/// only when no explicit id is configured.
pub async fn resolve_index_id(
    index: &dyn DocumentIndex,
    selection: &IndexSelection,
) -> Result<String, PipelineError> {
    if let Some(id) = &selection.id {
        return Ok(id.clone());
    }

    let Some(name) = &selection.name else {
        return Err(PipelineError::Validation(
            "no document index configured".to_string(),
        ));
    };
    match index.resolve_index_id(name.clone()).await? {
        Some(id) => Ok(id),
        None => Err(PipelineError::Retrieval(RetrievalError::IndexNotFound(
            name.clone(),
        ))),
    }
}

/// Two-stage finding analysis: generate a search query from the finding, pull
/// related documents, then generate the report. The documents ride along in
/// the result for the caller's record; the report prompt sees only the
/// finding itself.
pub async fn analyze_finding(
    index: &dyn DocumentIndex,
    generator: &dyn TextGenerator,
    index_id: &str,
    finding: &SecurityFinding,
    mode: ReportMode,
) -> Result<FindingAnalysis, PipelineError> {
    if finding.id.trim().is_empty() {
        return Err(PipelineError::Validation(
            "finding id must not be empty".to_string(),
        ));
    }

    let finding_json = serde_json::json!(finding).to_string();

    let search_query = generator
        .generate(prompt::search_query_envelope(&finding_json))
        .await?
        .text;

    let documents = index
        .query(index_id.to_string(), search_query.clone())
        .await?;
    info!(
        finding_id = %finding.id,
        document_count = documents.len(),
        "retrieved context documents for finding"
    );

    let report = generator
        .generate(prompt::incident_report_envelope(mode, &finding_json))
        .await?
        .text;

    Ok(FindingAnalysis {
        search_query,
        documents,
        report,
    })
}

/// One conversational turn: condense the follow-up into a standalone
/// question, retrieve documents for it, answer strictly from those documents,
/// then phrase the final reply against the chat history. The grounded answer,
/// not the raw documents, is the context for the final reply.
pub async fn run_chat_turn(
    index: &dyn DocumentIndex,
    generator: &dyn TextGenerator,
    guardrails: &dyn GuardrailCatalog,
    selection: &IndexSelection,
    guardrail_name: Option<&str>,
    event: &ChatTurnEvent,
) -> Result<ChatTurnOutcome, PipelineError> {
    let user_input = event.input_transcript.trim();
    if user_input.is_empty() {
        return Err(PipelineError::Validation(
            "input transcript must not be empty".to_string(),
        ));
    }

    let history = match event
        .session_state
        .session_attributes
        .get(crate::history::CHAT_HISTORY_ATTRIBUTE)
    {
        Some(raw) => parse_chat_history(raw).map_err(|_| {
            PipelineError::Validation(
                "chat_history session attribute is not a valid turn list".to_string(),
            )
        })?,
        None => Vec::new(),
    };

    let guardrail = match guardrail_name {
        Some(name) => match guardrails.resolve_guardrail(name.to_string()).await {
            Ok(Some(identifier)) => Some(identifier),
            Ok(None) => {
                warn!(guardrail = %name, "configured guardrail not found, continuing without it");
                None
            }
            Err(err) => {
                warn!(guardrail = %name, "guardrail lookup failed, continuing without it: {err}");
                None
            }
        },
        None => None,
    };

    let rendered_history = render_history(&history);

    let standalone_question = generator
        .generate(apply_guardrail(
            prompt::condense_question_envelope(&rendered_history, user_input),
            guardrail.as_deref(),
        ))
        .await?
        .text;

    let index_id = resolve_index_id(index, selection).await?;
    let documents = index
        .retrieve(index_id, standalone_question.clone())
        .await?;
    info!(
        session_id = %event.session_id,
        document_count = documents.len(),
        "retrieved documents for chat turn"
    );
    let document_context = prompt::document_context_block(&documents);

    let grounded_answer = generator
        .generate(apply_guardrail(
            prompt::grounded_answer_envelope(&document_context, &standalone_question),
            guardrail.as_deref(),
        ))
        .await?
        .text;

    let reply = generator
        .generate(apply_guardrail(
            prompt::final_reply_envelope(&rendered_history, &grounded_answer, user_input),
            guardrail.as_deref(),
        ))
        .await?
        .text;

    let history = build_updated_history(history, user_input, &reply);

    Ok(ChatTurnOutcome { reply, history })
}

/// Single-shot grounded answer: retrieve documents for the query, join their
/// contents into one context block and generate against it.
pub async fn run_answer(
    index: &dyn DocumentIndex,
    generator: &dyn TextGenerator,
    index_id: &str,
    query: &str,
) -> Result<String, PipelineError> {
    let documents = index.query(index_id.to_string(), query.to_string()).await?;
    info!(
        document_count = documents.len(),
        "retrieved context for answer query"
    );
    let context = prompt::joined_document_contents(&documents);

    let generated = generator
        .generate(prompt::answer_envelope(query, &context))
        .await?
        .text;
    Ok(generated)
}

fn apply_guardrail(envelope: PromptEnvelope, guardrail: Option<&str>) -> PromptEnvelope {
    match guardrail {
        Some(identifier) => envelope.with_guardrail(identifier),
        None => envelope,
    }
}
