pub mod http;
pub mod mock;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::BridgeError;

/// Raw upstream SSE body, chunked however the transport delivers it.
pub type UpstreamStream = BoxStream<'static, Result<Bytes, BridgeError>>;

/// Opens agent turns. The bridge does not care whether the bytes come from
/// the real agent service or a canned fixture.
#[async_trait]
pub trait AgentUpstream: Send + Sync {
    /// Make sure the session exists upstream. Idempotent.
    async fn create_session(&self, session_id: &str) -> Result<(), BridgeError>;

    /// Send one user message and return the agent's SSE response body.
    async fn open_turn(&self, session_id: &str, message: &str) -> Result<UpstreamStream, BridgeError>;
}

pub use http::AgentClient;
pub use mock::MockUpstream;
