use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{build_prompt, parse_draft, StoryDraft, StoryPrompt, StoryWriter, WriterError};

#[derive(Debug, Serialize)]
struct AgentMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    messages: Vec<AgentMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: String,
}

/// Client for a hosted agent exposing `POST /api/agents/{agent}/generate`.
#[derive(Debug, Clone)]
pub struct AgentStoryWriter {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl AgentStoryWriter {
    pub fn new(
        base_url: &str,
        agent_id: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, WriterError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("novelbug/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WriterError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: generate_endpoint(base_url, agent_id),
            api_key,
        })
    }

    async fn send(&self, prompt: &str) -> Result<String, WriterError> {
        let body = GenerateRequest {
            messages: vec![AgentMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(map_reqwest_error)?;
        match res.status() {
            s if s.is_success() => res
                .json::<GenerateResponse>()
                .await
                .map(|r| r.text)
                .map_err(|e| WriterError::Serde(e.to_string())),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Err(WriterError::Timeout),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(WriterError::Http { status, body })
            }
        }
    }
}

#[async_trait]
impl StoryWriter for AgentStoryWriter {
    async fn write(&self, prompt: &StoryPrompt) -> Result<StoryDraft, WriterError> {
        let text = self.send(&build_prompt(prompt)).await?;
        parse_draft(&text).ok_or_else(|| {
            tracing::warn!("Agent reply could not be split into a story: {:?}", text);
            WriterError::Empty
        })
    }
}

fn generate_endpoint(base_url: &str, agent_id: &str) -> String {
    format!(
        "{}/api/agents/{}/generate",
        base_url.trim_end_matches('/'),
        agent_id
    )
}

fn map_reqwest_error(e: reqwest::Error) -> WriterError {
    if e.is_timeout() {
        WriterError::Timeout
    } else {
        WriterError::Transport(e.to_string())
    }
}
