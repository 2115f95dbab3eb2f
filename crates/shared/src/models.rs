use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dispatch::{DeliveryError, DeliveryReceipt};
use crate::history::CHAT_HISTORY_ATTRIBUTE;
use crate::retrieval::RetrievedDocument;

pub const PLAIN_TEXT_CONTENT_TYPE: &str = "PlainText";
pub const DIALOG_ACTION_CLOSE: &str = "Close";
pub const INTENT_STATE_FULFILLED: &str = "Fulfilled";

/// A security finding as delivered by the findings feed. Wire fields are
/// PascalCase; fields this service does not model ride along in `extra` so the
/// finding can be embedded in a prompt without losing detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityFinding {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SecurityFinding {
    /// Trailing segment of the finding id, used to key stored reports.
    pub fn short_id(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(self.id.as_str())
    }

    pub fn report_object_key(&self) -> String {
        format!("incident_report_{}.md", self.short_id())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingReportResponse {
    pub finding_id: String,
    pub response: String,
    pub search_query: String,
    pub documents: Vec<RetrievedDocument>,
    pub delivery: MailDeliveryStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailDeliveryStatus {
    pub delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MailDeliveryStatus {
    pub fn sent(receipt: DeliveryReceipt) -> Self {
        Self {
            delivered: true,
            message_id: Some(receipt.message_id),
            error: None,
        }
    }

    pub fn failed(err: &DeliveryError) -> Self {
        Self {
            delivered: false,
            message_id: None,
            error: Some(err.to_string()),
        }
    }
}

/// One turn of a conversational session, shaped like a bot-platform fulfillment
/// event: camelCase wire fields, free-form session attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnEvent {
    pub session_id: String,
    pub input_transcript: String,
    #[serde(default)]
    pub session_state: SessionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_attributes: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub session_attributes: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Intent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnResponse {
    pub session_state: ResponseSessionState,
    pub messages: Vec<ChatMessage>,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_attributes: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSessionState {
    pub session_attributes: HashMap<String, String>,
    pub dialog_action: DialogAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogAction {
    #[serde(rename = "type")]
    pub action_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub content_type: String,
    pub content: String,
}

impl ChatTurnResponse {
    /// Closes the dialog and marks the inbound intent fulfilled. The session
    /// attributes carry only the refreshed chat history; attributes sent by
    /// the caller are not echoed back.
    pub fn fulfilled(event: &ChatTurnEvent, reply: String, chat_history_json: String) -> Self {
        let mut session_attributes = HashMap::new();
        session_attributes.insert(CHAT_HISTORY_ATTRIBUTE.to_string(), chat_history_json);

        let intent = event.session_state.intent.clone().map(|mut intent| {
            intent.state = Some(INTENT_STATE_FULFILLED.to_string());
            intent
        });

        Self {
            session_state: ResponseSessionState {
                session_attributes,
                dialog_action: DialogAction {
                    action_type: DIALOG_ACTION_CLOSE.to_string(),
                },
                intent,
            },
            messages: vec![ChatMessage {
                content_type: PLAIN_TEXT_CONTENT_TYPE.to_string(),
                content: reply,
            }],
            session_id: event.session_id.clone(),
            request_attributes: event.request_attributes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub model_api_key: Option<String>,
    #[serde(default)]
    pub search_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
