use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::debug;

use super::{AgentUpstream, UpstreamStream};
use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// Client for the hosted agent's `/run_sse` API. One request per turn, no
/// retries; the configured timeout covers the whole response.
pub struct AgentClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    app_name: String,
    user_id: String,
}

impl AgentClient {
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BridgeError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.agent_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            app_name: config.app_name.clone(),
            user_id: config.user_id.clone(),
        })
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn session_url(&self, session_id: &str) -> String {
        format!(
            "{}/apps/{}/users/{}/sessions/{}",
            self.base_url, self.app_name, self.user_id, session_id
        )
    }

    fn run_request<'a>(&'a self, session_id: &'a str, message: &'a str) -> RunRequest<'a> {
        RunRequest {
            app_name: &self.app_name,
            user_id: &self.user_id,
            session_id,
            new_message: NewMessage {
                role: "user",
                parts: vec![TextPart { text: message }],
            },
            streaming: true,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => request.header("authorization", format!("Bearer {key}")),
            None => request,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest<'a> {
    app_name: &'a str,
    user_id: &'a str,
    session_id: &'a str,
    new_message: NewMessage<'a>,
    streaming: bool,
}

#[derive(Serialize)]
struct NewMessage<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[async_trait]
impl AgentUpstream for AgentClient {
    async fn create_session(&self, session_id: &str) -> Result<(), BridgeError> {
        let resp = self
            .authorize(self.client.post(self.session_url(session_id)))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| BridgeError::Request(e.to_string()))?;

        let status = resp.status();
        // 409: the session is already there.
        if status.is_success() || status.as_u16() == 409 {
            debug!(session_id, status = status.as_u16(), "agent session ready");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(BridgeError::ApiError {
            status: status.as_u16(),
            body,
        })
    }

    async fn open_turn(&self, session_id: &str, message: &str) -> Result<UpstreamStream, BridgeError> {
        debug!(session_id, chars = message.len(), "opening agent turn");

        let resp = self
            .authorize(self.client.post(format!("{}/run_sse", self.base_url)))
            .header("accept", "text/event-stream")
            .json(&self.run_request(session_id, message))
            .send()
            .await
            .map_err(|e| BridgeError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BridgeError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp
            .bytes_stream()
            .map_err(|e| BridgeError::Request(e.to_string()))
            .boxed())
    }
}
