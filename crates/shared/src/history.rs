use serde::{Deserialize, Serialize};

/// Session attribute key the chat history travels under between turns.
pub const CHAT_HISTORY_ATTRIBUTE: &str = "chat_history";

pub const HISTORY_MAX_TURNS: usize = 3;

/// One completed exchange. The stored assistant text is the reply that was
/// actually returned for the turn, so later prompts condense against what the
/// user really saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationTurn {
    pub user: String,
    pub assistant: String,
}

pub fn parse_chat_history(raw: &str) -> Result<Vec<ConversationTurn>, serde_json::Error> {
    serde_json::from_str(raw)
}

pub fn build_updated_history(
    mut turns: Vec<ConversationTurn>,
    user: &str,
    assistant: &str,
) -> Vec<ConversationTurn> {
    turns.push(ConversationTurn {
        user: user.to_string(),
        assistant: assistant.to_string(),
    });
    if turns.len() > HISTORY_MAX_TURNS {
        turns = turns.split_off(turns.len() - HISTORY_MAX_TURNS);
    }
    turns
}

pub fn render_history(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.user, turn.assistant))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(user: &str, assistant: &str) -> ConversationTurn {
        ConversationTurn {
            user: user.to_string(),
            assistant: assistant.to_string(),
        }
    }

    #[test]
    fn appends_to_short_history_without_truncation() {
        let updated = build_updated_history(vec![turn("a", "1")], "b", "2");
        assert_eq!(updated, vec![turn("a", "1"), turn("b", "2")]);
    }

    #[test]
    fn keeps_only_most_recent_turns() {
        let initial = vec![turn("a", "1"), turn("b", "2"), turn("c", "3")];
        let updated = build_updated_history(initial, "d", "4");
        assert_eq!(updated.len(), HISTORY_MAX_TURNS);
        assert_eq!(updated, vec![turn("b", "2"), turn("c", "3"), turn("d", "4")]);
    }

    #[test]
    fn truncates_oversized_history_to_cap() {
        let initial = (0..10)
            .map(|i| turn(&format!("u{i}"), &format!("a{i}")))
            .collect::<Vec<_>>();
        let updated = build_updated_history(initial, "latest", "reply");
        assert_eq!(updated.len(), HISTORY_MAX_TURNS);
        assert_eq!(updated.last(), Some(&turn("latest", "reply")));
        assert_eq!(updated.first(), Some(&turn("u9", "a9")));
    }

    #[test]
    fn starts_history_from_empty() {
        let updated = build_updated_history(Vec::new(), "hello", "hi");
        assert_eq!(updated, vec![turn("hello", "hi")]);
    }

    #[test]
    fn renders_turns_one_per_line() {
        let rendered = render_history(&[turn("alice", "hello"), turn("assistant", "hi there")]);
        assert_eq!(rendered, "alice: hello\nassistant: hi there");
        assert_eq!(render_history(&[]), "");
    }

    #[test]
    fn parses_serialized_history() {
        let turns = vec![turn("a", "1"), turn("b", "2")];
        let raw = serde_json::json!(turns).to_string();
        let parsed = parse_chat_history(&raw).expect("history should parse");
        assert_eq!(parsed, turns);
    }

    #[test]
    fn rejects_history_that_is_not_a_turn_list() {
        assert!(parse_chat_history("{\"user\":\"a\"}").is_err());
        assert!(parse_chat_history("not json").is_err());
        assert!(parse_chat_history("[{\"user\":\"a\"}]").is_err());
    }
}
