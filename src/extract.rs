use serde_json::Value;
use tracing::debug;

use crate::encoder::DownstreamFrame;
use crate::types::{AgentTurnEvent, Delta, TurnData, TurnPayload};

/// Flat fields checked after the nested form, in order.
const FLAT_TEXT_KEYS: [&str; 2] = ["response", "text"];

impl TurnPayload {
    /// Classify a data payload. Total: every input maps to exactly one shape.
    pub fn classify(data: &TurnData) -> Self {
        let value = match data {
            TurnData::Text(text) if text.is_empty() => return TurnPayload::Empty { partial: None },
            TurnData::Text(text) => return TurnPayload::Raw(text.clone()),
            TurnData::Json(value) => value,
        };

        let partial = value.get("partial").and_then(Value::as_bool);

        if let Some(text) = nested_text(value) {
            return TurnPayload::Nested {
                text: text.to_string(),
                partial,
            };
        }
        if let Some(text) = flat_text(value) {
            return TurnPayload::Flat {
                text: text.to_string(),
                partial,
            };
        }
        TurnPayload::Empty { partial }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            TurnPayload::Nested { text, .. } | TurnPayload::Flat { text, .. } => Some(text),
            TurnPayload::Raw(text) => Some(text),
            TurnPayload::Empty { .. } => None,
        }
    }

    /// The explicit `partial` flag, when the payload carried one.
    pub fn partial(&self) -> Option<bool> {
        match self {
            TurnPayload::Nested { partial, .. }
            | TurnPayload::Flat { partial, .. }
            | TurnPayload::Empty { partial } => *partial,
            TurnPayload::Raw(_) => None,
        }
    }
}

fn nested_text(value: &Value) -> Option<&str> {
    value
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .filter(|text| !text.is_empty())
}

fn flat_text(value: &Value) -> Option<&str> {
    FLAT_TEXT_KEYS.iter().find_map(|key| {
        value
            .get(*key)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
    })
}

/// Work out what one event contributes downstream.
///
/// The agent's final non-partial event repeats the whole turn; it is
/// forwarded as-is, so consumers see that text twice.
pub fn extract(event: &AgentTurnEvent) -> Delta {
    match event {
        AgentTurnEvent::Done => Delta {
            text: None,
            complete: true,
        },
        AgentTurnEvent::Data(data) => {
            let payload = TurnPayload::classify(data);
            if let TurnPayload::Empty { partial } = &payload {
                debug!(?partial, "agent event carried no text");
            }
            Delta {
                text: payload.text().map(str::to_string),
                complete: payload.partial() == Some(false),
            }
        }
    }
}

impl Delta {
    /// Text delta first, then the completion sentinel.
    pub fn into_frames(self) -> Vec<DownstreamFrame> {
        let mut frames = Vec::with_capacity(2);
        if let Some(text) = self.text.filter(|t| !t.is_empty()) {
            frames.push(DownstreamFrame::TextDelta(text));
        }
        if self.complete {
            frames.push(DownstreamFrame::Done);
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> AgentTurnEvent {
        AgentTurnEvent::Data(TurnData::Json(value))
    }

    #[test]
    fn nested_shape() {
        let payload = TurnPayload::classify(&TurnData::Json(json!({
            "content": {"parts": [{"text": "Hello"}], "role": "model"},
            "partial": true,
        })));
        assert_eq!(
            payload,
            TurnPayload::Nested {
                text: "Hello".into(),
                partial: Some(true)
            }
        );
    }

    #[test]
    fn nested_wins_over_flat() {
        let delta = extract(&data(json!({
            "content": {"parts": [{"text": "nested"}]},
            "response": "flat",
            "text": "flatter",
        })));
        assert_eq!(delta.text.as_deref(), Some("nested"));
    }

    #[test]
    fn empty_nested_falls_back_to_response_then_text() {
        let delta = extract(&data(json!({
            "content": {"parts": [{"text": ""}]},
            "response": "from response",
        })));
        assert_eq!(delta.text.as_deref(), Some("from response"));

        let delta = extract(&data(json!({"response": "", "text": "from text"})));
        assert_eq!(delta.text.as_deref(), Some("from text"));
    }

    #[test]
    fn only_first_part_is_considered() {
        let delta = extract(&data(json!({
            "content": {"parts": [{"functionCall": {"name": "lookup"}}, {"text": "later"}]},
        })));
        assert_eq!(delta, Delta::default());
    }

    #[test]
    fn partial_false_completes_turn() {
        let delta = extract(&data(json!({
            "content": {"parts": [{"text": "All of it."}]},
            "partial": false,
        })));
        assert_eq!(
            delta.into_frames(),
            vec![
                DownstreamFrame::TextDelta("All of it.".into()),
                DownstreamFrame::Done
            ]
        );
    }

    #[test]
    fn missing_partial_flag_does_not_complete() {
        let delta = extract(&data(json!({"response": "hi"})));
        assert!(!delta.complete);
    }

    #[test]
    fn non_boolean_partial_is_ignored() {
        let delta = extract(&data(json!({"text": "hi", "partial": "false"})));
        assert!(!delta.complete);
    }

    #[test]
    fn partial_false_without_text_only_completes() {
        let delta = extract(&data(json!({"content": {"parts": []}, "partial": false})));
        assert_eq!(delta.into_frames(), vec![DownstreamFrame::Done]);
    }

    #[test]
    fn done_event_completes_without_text() {
        assert_eq!(extract(&AgentTurnEvent::Done).into_frames(), vec![DownstreamFrame::Done]);
    }

    #[test]
    fn raw_text_passes_through() {
        let delta = extract(&AgentTurnEvent::Data(TurnData::Text("not json".into())));
        assert_eq!(delta.text.as_deref(), Some("not json"));
        assert!(!delta.complete);
    }

    #[test]
    fn shape_mismatches_yield_nothing() {
        for value in [
            json!({}),
            json!(null),
            json!(42),
            json!("a bare string"),
            json!([1, 2, 3]),
            json!({"content": "not an object"}),
            json!({"content": {"parts": [{"text": 7}]}}),
            json!({"response": {"nested": true}}),
        ] {
            let delta = extract(&data(value.clone()));
            assert_eq!(delta, Delta::default(), "for {value}");
            assert!(delta.into_frames().is_empty());
        }
    }
}
