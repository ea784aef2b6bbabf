use bytes::Bytes;
use serde::Serialize;

use crate::error::TransformError;

/// One unit of the downstream dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownstreamFrame {
    TextDelta(String),
    Done,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextDeltaEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text_delta: &'a str,
}

const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

impl DownstreamFrame {
    /// Serialize as a complete SSE frame, blank-line terminated.
    pub fn encode(&self) -> Result<Bytes, TransformError> {
        match self {
            DownstreamFrame::TextDelta(text) => {
                let envelope = TextDeltaEnvelope {
                    kind: "text-delta",
                    text_delta: text,
                };
                let json = serde_json::to_string(&envelope)
                    .map_err(|e| TransformError::Encode(e.to_string()))?;
                Ok(Bytes::from(format!("data: {json}\n\n")))
            }
            DownstreamFrame::Done => Ok(Bytes::from_static(DONE_FRAME)),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, DownstreamFrame::Done)
    }
}
