use crate::generate::PromptEnvelope;
use crate::retrieval::RetrievedDocument;

pub const ANSWER_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Use the provided context to answer the user's query.";

const RUNBOOK_REPORT_SYSTEM: &str = "You are a security engineer looking to improve the security posture of your organization.

Generate an incident report in the format below.
==========================================

Incident Response Runbook Template
This playbook is a template for the security team to build out its incident response capability. It is customized to suit the team's particular needs, risks, available tools and work processes.

This runbook outlines response steps for security incidents. This runbook is used to:
- Gather evidence
- Contain and then eradicate the incident
- Recover from the incident
- Conduct post-incident activities, including post-mortem and feedback processes

Incident Summary

Incident Type:

Incident Description:

Incident Response Process:

1. Acquire, preserve, document evidence
2. Determine the sensitivity, dependency of the resources
3. Identify the remediation steps
4. Verify and validate the changes in lower environment
5. Confirm with respective application teams
6. Make changes to resolve the incident
7. Record history and actions
8. Post activity - perform a root cause analysis, update policies if needed

The report is stored as a document, so the output must be in markdown format.
Create a detailed report.";

const EMAIL_REPORT_SYSTEM: &str = "You are a security engineer reviewing a non-compliant configuration finding.

Generate an email for the incident.
==========================================

Incident Summary

Incident Type:

Incident Description:

Incident Response Process:

1. Acquire, preserve, document evidence
2. Determine the sensitivity, dependency of the resources
3. Identify the remediation steps
4. Verify and validate the changes in lower environment
5. Confirm with respective application teams
6. Make changes to resolve the incident
7. Record history and actions
8. Post activity - perform a root cause analysis, update policies if needed

This report will be sent as an email.
Create a detailed report.";

/// Which framing an incident report is generated under. Runbook reports are
/// stored as documents; email reports are sent to the configured recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Runbook,
    Email,
}

impl ReportMode {
    fn system_prompt(self) -> &'static str {
        match self {
            ReportMode::Runbook => RUNBOOK_REPORT_SYSTEM,
            ReportMode::Email => EMAIL_REPORT_SYSTEM,
        }
    }
}

/// First stage of the finding pipeline: turn the raw finding into a natural
/// language search query for the document index.
pub fn search_query_envelope(finding_json: &str) -> PromptEnvelope {
    let user = format!(
        "I want to search the document index for related documents.
Review the security finding, extract the important keywords and create a search summary.
<finding>
{finding_json}
</finding>

Only return the final query in text format, don't mention anything else.
Create a query in natural language extracting important terms.

The final search query should be less than 500 words."
    );
    PromptEnvelope::new("", user)
}

pub fn incident_report_envelope(mode: ReportMode, finding_json: &str) -> PromptEnvelope {
    let user = format!(
        "Review the finding and summarize actionable next steps.
<finding>
{finding_json}
</finding>

Create a detailed and in-depth report.
Provide the output in proper markdown format with headings and bullet points."
    );
    PromptEnvelope::new(mode.system_prompt(), user)
}

/// Rewrites a follow-up question into a standalone one using the prior turns.
pub fn condense_question_envelope(rendered_history: &str, input: &str) -> PromptEnvelope {
    let user = format!(
        "Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question.

Chat History:
{rendered_history}
Follow Up Input: {input}
Standalone question:"
    );
    PromptEnvelope::new("", user)
}

/// Answers the condensed question strictly from the retrieved documents.
pub fn grounded_answer_envelope(document_context: &str, question: &str) -> PromptEnvelope {
    let user = format!(
        "The following is a friendly conversation between a human and an AI.
The AI is talkative and provides lots of specific details from its context.
If the AI does not know the answer to a question, it truthfully says it does not know.
<context>
{document_context}
</context>
Instruction: Based on the above documents, provide a detailed answer for, {question}
Answer \"don't know\" if the answer is not present in the documents.
Also provide the document title and page number if any document from the context is used to answer the question.
Solution:"
    );
    PromptEnvelope::new("", user)
}

/// Shapes the grounded answer into the reply sent back to the user, with the
/// conversation so far as framing.
pub fn final_reply_envelope(rendered_history: &str, context: &str, input: &str) -> PromptEnvelope {
    let user = format!(
        "The following is a friendly conversation between a human and an AI.

Chat History:
{rendered_history}

Context: {context}

Follow Up Input: {input}

Generate a final response for the user based on the chat history, the context and the follow up input the user has asked.

Response:"
    );
    PromptEnvelope::new("", user)
}

pub fn answer_envelope(query: &str, context: &str) -> PromptEnvelope {
    let user =
        format!("Based on the following context, answer the query: '{query}'\n\nContext:\n{context}");
    PromptEnvelope::new(ANSWER_SYSTEM_PROMPT, user)
}

/// Serializes each document into a `<document>` block for grounding prompts.
pub fn document_context_block(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(|document| format!("<document>\n{}\n</document>", serde_json::json!(document)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bare document bodies joined line by line, for prompts that want prose
/// context rather than structured blocks.
pub fn joined_document_contents(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(|document| document.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
