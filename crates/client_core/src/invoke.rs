//! Agent Invocation Client: one round trip to the remote analysis service per
//! call, folded into an [`AgentResponseEnvelope`].

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use shared::{
    domain::{AgentId, KnowledgeBaseId, SessionId},
    protocol::{AgentRequest, AgentResponseEnvelope},
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::Settings;

pub const AGENT_ENDPOINT_PATH: &str = "api/agent";

/// Caller mistakes. Service and network failures are never reported here;
/// they come back as an envelope with `success: false`.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("agent id must not be empty")]
    EmptyAgentId,
    #[error("cannot build agent endpoint from '{base}': {source}")]
    Endpoint {
        base: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(
        &self,
        query: &str,
        agent_id: &AgentId,
    ) -> Result<AgentResponseEnvelope, InvokeError>;
}

pub struct HttpAgentClient {
    http: Client,
    endpoint: Url,
    knowledge_base_id: KnowledgeBaseId,
    session_id: SessionId,
}

impl HttpAgentClient {
    pub fn new(
        service_url: &str,
        knowledge_base_id: KnowledgeBaseId,
    ) -> Result<Self, InvokeError> {
        Self::with_http(service_url, knowledge_base_id, Client::new())
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, InvokeError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Self::with_http(
            &settings.service_url,
            settings.knowledge_base_id.clone(),
            builder.build()?,
        )
    }

    fn with_http(
        service_url: &str,
        knowledge_base_id: KnowledgeBaseId,
        http: Client,
    ) -> Result<Self, InvokeError> {
        Ok(Self {
            http,
            endpoint: agent_endpoint(service_url)?,
            knowledge_base_id,
            session_id: SessionId::generate(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

#[async_trait]
impl AgentInvoker for HttpAgentClient {
    async fn invoke(
        &self,
        query: &str,
        agent_id: &AgentId,
    ) -> Result<AgentResponseEnvelope, InvokeError> {
        if query.trim().is_empty() {
            return Err(InvokeError::EmptyQuery);
        }
        if agent_id.is_blank() {
            return Err(InvokeError::EmptyAgentId);
        }

        let request = AgentRequest {
            message: query.to_string(),
            agent_id: agent_id.clone(),
            knowledge_base_id: self.knowledge_base_id.clone(),
            session_id: self.session_id,
        };
        debug!(agent_id = %agent_id, endpoint = %self.endpoint, "invoking agent");

        let response = match self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(agent_id = %agent_id, "agent request failed: {err}");
                return Ok(AgentResponseEnvelope::failed(describe_transport_error(&err)));
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                warn!(agent_id = %agent_id, "reading agent response failed: {err}");
                return Ok(AgentResponseEnvelope::failed(describe_transport_error(&err)));
            }
        };

        let envelope = decode_envelope(status, &body);
        if !envelope.success {
            warn!(
                agent_id = %agent_id,
                status = status.as_u16(),
                error = envelope.error.as_deref().unwrap_or_default(),
                "agent reported failure"
            );
        }
        Ok(envelope)
    }
}

fn agent_endpoint(service_url: &str) -> Result<Url, InvokeError> {
    let endpoint_error = |source| InvokeError::Endpoint {
        base: service_url.to_string(),
        source,
    };
    let mut base = Url::parse(service_url.trim()).map_err(endpoint_error)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(AGENT_ENDPOINT_PATH).map_err(endpoint_error)
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "agent service timed out".to_string()
    } else if err.is_connect() {
        format!("agent service unreachable: {err}")
    } else {
        err.to_string()
    }
}

/// Builds the envelope from a raw HTTP answer. Non-2xx answers are always
/// failures, keeping the service's own error text when it sent one.
fn decode_envelope(status: StatusCode, body: &[u8]) -> AgentResponseEnvelope {
    if status.is_success() {
        return match serde_json::from_slice::<AgentResponseEnvelope>(body) {
            Ok(envelope) => envelope,
            Err(err) => {
                AgentResponseEnvelope::failed(format!("invalid response from agent service: {err}"))
            }
        };
    }

    let service_message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "message"].iter().find_map(|key| {
                value
                    .get(*key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        });
    AgentResponseEnvelope::failed(
        service_message
            .unwrap_or_else(|| format!("agent service returned HTTP {}", status.as_u16())),
    )
}

#[cfg(test)]
#[path = "tests/invoke_tests.rs"]
mod tests;
