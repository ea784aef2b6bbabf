use serde_json::Value;

/// Literal payload that ends an SSE stream, in both dialects.
pub const DONE_SENTINEL: &str = "[DONE]";

/// The SSE fields the parser recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Data,
    Event,
    Id,
    Retry,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Data => "data",
            FieldKind::Event => "event",
            FieldKind::Id => "id",
            FieldKind::Retry => "retry",
        }
    }
}

/// One decoded SSE field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseField {
    pub kind: FieldKind,
    pub value: String,
}

/// Body of a `data:` line that was not the done sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnData {
    Json(Value),
    /// Not valid JSON. Passed through as plain text.
    Text(String),
}

impl TurnData {
    /// Textual payload: re-serialized JSON, or the raw text.
    pub fn payload(&self) -> String {
        match self {
            TurnData::Json(value) => value.to_string(),
            TurnData::Text(text) => text.clone(),
        }
    }
}

/// What the agent said on one `data:` line.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentTurnEvent {
    Done,
    Data(TurnData),
}

/// Shape of an agent turn payload, classified once with a fixed precedence:
/// nested `content.parts[0].text`, then flat `response`, then flat `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPayload {
    Nested { text: String, partial: Option<bool> },
    Flat { text: String, partial: Option<bool> },
    Raw(String),
    Empty { partial: Option<bool> },
}

/// Result of extracting one event: text to forward, and whether the turn ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub text: Option<String>,
    pub complete: bool,
}
