use std::time::Duration;

use async_trait::async_trait;
use common::{JudgeOutcome, JudgeRequest, JudgeResponse};

use super::{JudgeClient, JudgeError};
use crate::config::JudgeConfig;

/// Judge0-compatible HTTP adapter. Posts one synchronous submission per
/// test case (`wait=true`) and normalizes the response.
pub struct HttpJudgeClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpJudgeClient {
    pub fn new(config: &JudgeConfig) -> Result<Self, JudgeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| JudgeError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl JudgeClient for HttpJudgeClient {
    async fn judge(&self, request: JudgeRequest) -> Result<JudgeOutcome, JudgeError> {
        let url = format!(
            "{}/submissions?base64_encoded=false&wait=true",
            self.base_url
        );

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| JudgeError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JudgeError::Transport(format!(
                "judge engine responded {}",
                response.status()
            )));
        }

        let body: JudgeResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::InvalidResponse(e.to_string()))?;

        let verdict = body
            .verdict()
            .ok_or_else(|| JudgeError::InvalidResponse("missing or unknown status".into()))?;

        if !verdict.is_final() {
            return Err(JudgeError::InvalidResponse(format!(
                "engine returned non-final verdict {verdict} despite wait=true"
            )));
        }

        let detail = if verdict.is_accepted() {
            None
        } else {
            Some(body.failure_detail())
        };

        Ok(JudgeOutcome {
            verdict,
            time_ms: body.time_ms(),
            memory_kb: body.memory.unwrap_or(0),
            detail,
        })
    }
}
