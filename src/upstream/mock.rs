use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use serde_json::{json, Value};
use tracing::debug;

use super::{AgentUpstream, UpstreamStream};
use crate::error::BridgeError;

/// Streaming fragments of the canned turn, in order.
pub const FIXTURE_FRAGMENTS: [&str; 3] = ["Hello", "! I'm ZenGPT", ", your AI assistant."];

/// Text of the final non-partial event, which repeats the whole turn.
pub const FIXTURE_FULL_TEXT: &str = "Hello! I'm ZenGPT, your AI assistant.";

/// The canned turn as upstream event payloads: three partial fragments, then
/// the non-partial echo of the full text.
pub fn fixture_events_at(invocation_id: &str, timestamp: f64) -> Vec<Value> {
    let turns = FIXTURE_FRAGMENTS
        .iter()
        .map(|text| (*text, true))
        .chain(std::iter::once((FIXTURE_FULL_TEXT, false)));

    turns
        .enumerate()
        .map(|(i, (text, partial))| {
            json!({
                "content": {"parts": [{"text": text}], "role": "model"},
                "partial": partial,
                "invocationId": invocation_id,
                "author": "zengpt",
                "actions": {"stateDelta": {}, "artifactDelta": {}, "requestedAuthConfigs": {}},
                "id": format!("evt-{i}"),
                "timestamp": timestamp + i as f64 * 0.05,
            })
        })
        .collect()
}

/// Fixture events with stable ids and timestamps.
pub fn fixture_events() -> Vec<Value> {
    fixture_events_at("e-fixture", 1_750_000_000.0)
}

/// Frame events the way the agent service does on the wire.
pub fn encode_upstream(events: &[Value]) -> Vec<u8> {
    events
        .iter()
        .flat_map(|event| format!("data: {event}\n\n").into_bytes())
        .collect()
}

pub fn fixture_bytes() -> Vec<u8> {
    encode_upstream(&fixture_events())
}

/// Stands in for the agent service. Every turn replays the fixture,
/// cut into `chunk_size`-byte pieces so the line reader has work to do.
pub struct MockUpstream {
    chunk_size: usize,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self { chunk_size: 64 }
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }
}

impl Default for MockUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentUpstream for MockUpstream {
    async fn create_session(&self, session_id: &str) -> Result<(), BridgeError> {
        debug!(session_id, "mock session ready");
        Ok(())
    }

    async fn open_turn(&self, session_id: &str, message: &str) -> Result<UpstreamStream, BridgeError> {
        debug!(session_id, chars = message.len(), "replaying fixture turn");

        let invocation_id = format!("e-{}", uuid::Uuid::new_v4());
        let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        let body = encode_upstream(&fixture_events_at(&invocation_id, now));

        let chunks: Vec<Result<Bytes, BridgeError>> = body
            .chunks(self.chunk_size)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();

        Ok(stream::iter(chunks).boxed())
    }
}
