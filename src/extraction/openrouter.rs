use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ExperienceExtractor, ExperienceFields};
use crate::config::{ApiConfig, ExtractionConfig};
use crate::episode::{EpisodeSummary, FailureSummary, SuccessSummary};
use crate::error::{HindsightError, Result};

/// Extraction via an OpenRouter chat model. One prompt, one reply, parsed as
/// JSON after stripping any markdown fences.
pub struct OpenRouterExtractor {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenRouterExtractor {
    pub fn new(
        api: &ApiConfig,
        extraction: &ExtractionConfig,
        api_key: Option<String>,
    ) -> Result<Self> {
        let api_key = api_key.ok_or_else(|| {
            HindsightError::Configuration(format!(
                "{} not set; experience extraction unavailable",
                api.key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| HindsightError::Configuration(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api.base_url.trim_end_matches('/')),
            api_key,
            model: extraction.model.clone(),
            temperature: extraction.temperature,
            max_tokens: extraction.max_tokens,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[async_trait]
impl ExperienceExtractor for OpenRouterExtractor {
    async fn extract(&self, summary: &EpisodeSummary) -> Result<ExperienceFields> {
        let prompt = build_prompt(summary);
        debug!(prompt_len = prompt.len(), "Built extraction prompt");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| HindsightError::Extraction(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HindsightError::Extraction(format!(
                "chat API returned {status}"
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| HindsightError::Extraction(format!("malformed response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| HindsightError::Extraction("empty reply from model".to_string()))?;

        parse_fields(&content)
    }
}

/// Minimal contrast prompt. Kept terse to hold token cost down.
fn build_prompt(summary: &EpisodeSummary) -> String {
    format!(
        "Extract pattern from this problem-solving session:\n\n\
         Task: {}\n\n\
         Failed attempts:\n{}\n\n\
         Successful attempt:\n{}\n\n\
         Return JSON only:\n\
         {{\n  \
           \"pattern\": \"what worked that was missing from failures (5-10 words)\",\n  \
           \"keywords\": [\"relevant\", \"search\", \"terms\"],\n  \
           \"insight\": \"brief actionable insight (10-15 words)\"\n\
         }}",
        summary.task,
        failures_text(&summary.failures),
        success_text(summary.success.as_ref()),
    )
}

fn failures_text(failures: &[FailureSummary]) -> String {
    if failures.is_empty() {
        return "- none".to_string();
    }
    failures
        .iter()
        .map(|f| format!("- {} → {}", f.desc, f.error))
        .collect::<Vec<_>>()
        .join("\n")
}

fn success_text(success: Option<&SuccessSummary>) -> String {
    match success {
        Some(s) => format!("- {}: {}", s.desc, s.result),
        None => "- none".to_string(),
    }
}

fn parse_fields(content: &str) -> Result<ExperienceFields> {
    let json = strip_code_fences(content);
    serde_json::from_str(json).map_err(|e| {
        let snippet: String = content.chars().take(200).collect();
        HindsightError::Extraction(format!(
            "reply is not the expected JSON: {e}; reply was: {snippet}"
        ))
    })
}

/// Models often wrap the JSON in ``` or ```json fences.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    match rest.find("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}
