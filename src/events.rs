use serde_json::Value;
use tracing::{debug, trace};

use crate::types::{AgentTurnEvent, FieldKind, SseField, TurnData, DONE_SENTINEL};

/// A recognized SSE line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Turn(AgentTurnEvent),
    /// `event:`, `id:` or `retry:`. Recognized but not forwarded.
    Field(SseField),
}

const METADATA_FIELDS: [FieldKind; 3] = [FieldKind::Event, FieldKind::Id, FieldKind::Retry];

/// Classify one logical line. Blank lines, comments and unknown fields yield
/// `None`; nothing here can fail.
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(rest) = strip_field(line, FieldKind::Data) {
        return Some(ParsedLine::Turn(parse_data(rest)));
    }

    for kind in METADATA_FIELDS {
        if let Some(rest) = strip_field(line, kind) {
            return Some(ParsedLine::Field(SseField {
                kind,
                value: rest.to_string(),
            }));
        }
    }

    trace!(line, "ignoring unrecognized sse line");
    None
}

/// Classify the text after `data:`.
pub fn parse_data(payload: &str) -> AgentTurnEvent {
    if payload == DONE_SENTINEL {
        return AgentTurnEvent::Done;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => AgentTurnEvent::Data(TurnData::Json(value)),
        Err(e) => {
            debug!(error = %e, "data payload is not json, passing through as text");
            AgentTurnEvent::Data(TurnData::Text(payload.to_string()))
        }
    }
}

/// `name:value` or `name: value` → `value`.
fn strip_field(line: &str, kind: FieldKind) -> Option<&str> {
    let rest = line.strip_prefix(kind.name())?.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn turn(line: &str) -> AgentTurnEvent {
        match parse_line(line) {
            Some(ParsedLine::Turn(event)) => event,
            other => panic!("expected a turn event for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn done_sentinel() {
        assert_eq!(turn("data: [DONE]"), AgentTurnEvent::Done);
        assert_eq!(turn("  data: [DONE]\r"), AgentTurnEvent::Done);
        assert_eq!(turn("data:[DONE]"), AgentTurnEvent::Done);
    }

    #[test]
    fn json_payload() {
        let event = turn(r#"data: {"text": "hi", "partial": true}"#);
        assert_eq!(
            event,
            AgentTurnEvent::Data(TurnData::Json(json!({"text": "hi", "partial": true})))
        );
    }

    #[test]
    fn json_payload_is_reserialized() {
        let AgentTurnEvent::Data(data) = turn(r#"data: { "text" :  "hi" }"#) else {
            panic!("expected data");
        };
        assert_eq!(data.payload(), r#"{"text":"hi"}"#);
    }

    #[test]
    fn non_json_payload_passes_through_as_text() {
        assert_eq!(
            turn("data: plain words {not json"),
            AgentTurnEvent::Data(TurnData::Text("plain words {not json".into()))
        );
    }

    #[test]
    fn done_must_match_exactly() {
        assert_eq!(
            turn("data: [DONE] extra"),
            AgentTurnEvent::Data(TurnData::Text("[DONE] extra".into()))
        );
    }

    #[test]
    fn metadata_fields_are_not_data() {
        assert_eq!(
            parse_line("event: message"),
            Some(ParsedLine::Field(SseField {
                kind: FieldKind::Event,
                value: "message".into()
            }))
        );
        assert_eq!(
            parse_line("id: 42"),
            Some(ParsedLine::Field(SseField {
                kind: FieldKind::Id,
                value: "42".into()
            }))
        );
        assert_eq!(
            parse_line("retry: 3000"),
            Some(ParsedLine::Field(SseField {
                kind: FieldKind::Retry,
                value: "3000".into()
            }))
        );
    }

    #[test]
    fn blank_comment_and_unknown_lines_are_ignored() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   \r"), None);
        assert_eq!(parse_line(": keepalive"), None);
        assert_eq!(parse_line("hello there"), None);
        assert_eq!(parse_line("database: 1"), None);
        assert_eq!(parse_line("identity: x"), None);
    }
}
