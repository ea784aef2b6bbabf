//! Bridge between a browser chat UI and a hosted LLM agent.
//!
//! The agent answers over SSE with JSON "agent turn" events. The chat client
//! expects a different SSE dialect: `text-delta` frames closed by `[DONE]`.
//! [`ResponseTransformer`] converts one into the other as bytes arrive; the
//! rest of the crate is the thin HTTP plumbing around it.

pub mod config;
pub mod encoder;
pub mod error;
pub mod events;
pub mod extract;
pub mod server;
pub mod sse;
pub mod transform;
pub mod types;
pub mod upstream;

pub use config::BridgeConfig;
pub use encoder::DownstreamFrame;
pub use error::{BridgeError, TransformError};
pub use events::{parse_line, ParsedLine};
pub use extract::extract;
pub use server::{router, serve, AppState};
pub use sse::LineReader;
pub use transform::{process_line, transcode, LineOutcome, ResponseTransformer};
pub use types::{AgentTurnEvent, Delta, FieldKind, SseField, TurnData, TurnPayload};
pub use upstream::{AgentClient, AgentUpstream, MockUpstream, UpstreamStream};
