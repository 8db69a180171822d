use crate::context::{PromptBundle, TokenBudget};
use crate::{AssistError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::adapter::promptbundle_to_messages_and_text;
use super::port::CompletionPort;

const DEFAULT_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";
const DEFAULT_MODEL: &str = "qwen/qwen3-coder-480b-a35b-instruct";

/// Configuration for LlmClient loaded from environment variables
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub base_url: String, // e.g., https://integrate.api.nvidia.com/v1
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    /// Used by `generate`; pipeline stages pass their own temperature through the port
    pub temperature: f32,
    pub budget: TokenBudget,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("LLM_BASE_URL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: std::env::var("LLM_MODEL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: std::env::var("LLM_API_TOKEN")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            request_timeout_ms: std::env::var("LLM_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60_000),
            temperature: std::env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(0.0),
            budget: TokenBudget::default(),
        }
    }
}

/// Minimal response containing the assistant text
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub provider: Option<String>, // "responses" or "chat.completions"
    pub usage: Option<serde_json::Value>,
}

/// HTTP client for OpenAI-compatible backends.
///
/// Prefers Chat Completions (what hosted inference gateways expose) and falls
/// back to the Responses API when the chat endpoint is missing.
#[derive(Clone)]
pub struct LlmClient {
    pub(crate) http: Client,
    pub(crate) cfg: LlmClientConfig,
}

impl LlmClient {
    pub fn new(cfg: LlmClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| AssistError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, cfg })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(LlmClientConfig::default())
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.cfg
    }

    /// Generate a completion for the given prompt bundle
    /// Contract:
    /// - Input: PromptBundle + temperature
    /// - Output: LlmResponse with assistant text
    /// - Error: network/parse, after the Responses fallback was attempted
    pub async fn generate(&self, bundle: &PromptBundle, temperature: f32) -> Result<LlmResponse> {
        let budget = self.cfg.budget;
        let (messages, input_text) = promptbundle_to_messages_and_text(bundle, budget);

        let chat_url = format!(
            "{}/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        );
        debug!(target = "llm_client", temperature, "POST {} via Chat Completions", chat_url);

        let body = json!({
            "model": self.cfg.model,
            "messages": messages,
            "max_tokens": budget.max_output_tokens as u32,
            "temperature": temperature,
        });

        match self.post(&chat_url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                let val: serde_json::Value = resp.json().await.map_err(|e| {
                    AssistError::Completion(format!("Failed to parse Chat Completions JSON: {e}"))
                })?;
                if let Some(text) = extract_text_from_chat_completions(&val) {
                    return Ok(to_response(text, &val, "chat.completions"));
                }
                warn!(target = "llm_client", "Chat Completions returned no content; trying Responses API");
            }
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => {
                // Endpoint missing; try Responses
            }
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                error!(target = "llm_client", %status, body = %text, "Chat Completions error");
                return Err(AssistError::Completion(format!(
                    "Chat Completions error: status={} body={}",
                    status, text
                )));
            }
            Err(err) => {
                warn!(target = "llm_client", error = %err, "Chat Completions request failed; trying Responses API");
            }
        }

        let responses_url = format!("{}/responses", self.cfg.base_url.trim_end_matches('/'));
        debug!(target = "llm_client", "POST {} via Responses API", responses_url);

        let body = json!({
            "model": self.cfg.model,
            "input": input_text,
            "max_output_tokens": budget.max_output_tokens as u32,
            "temperature": temperature,
        });

        let resp = self
            .post(&responses_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistError::Completion(format!("Responses HTTP error: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(target = "llm_client", %status, body = %text, "Responses API error");
            return Err(AssistError::Completion(format!(
                "Responses error: status={} body={}",
                status, text
            )));
        }

        let val: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AssistError::Completion(format!("Failed to parse Responses JSON: {e}")))?;
        let text = extract_text_from_responses(&val)
            .ok_or_else(|| AssistError::Completion("Missing output text in Responses".into()))?;
        Ok(to_response(text, &val, "responses"))
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.post(url).header("content-type", "application/json");
        if let Some(key) = &self.cfg.api_key {
            req = req.bearer_auth(key);
        }
        req
    }
}

#[async_trait]
impl CompletionPort for LlmClient {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        let bundle = PromptBundle {
            instructions: prompt.to_string(),
            ..Default::default()
        };
        let resp = self.generate(&bundle, temperature).await?;
        debug!(
            target = "llm_client",
            provider = resp.provider.as_deref().unwrap_or("-"),
            chars = resp.text.len(),
            "completion received"
        );
        Ok(resp.text)
    }
}

fn to_response(text: String, val: &serde_json::Value, provider: &str) -> LlmResponse {
    LlmResponse {
        text,
        model: val
            .get("model")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        provider: Some(provider.to_string()),
        usage: val.get("usage").cloned(),
    }
}

fn extract_text_from_chat_completions(v: &serde_json::Value) -> Option<String> {
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

fn extract_text_from_responses(v: &serde_json::Value) -> Option<String> {
    if let Some(s) = v.get("output_text").and_then(|x| x.as_str()) {
        if !s.is_empty() {
            return Some(s.to_string());
        }
    }
    let arr = v.get("output").and_then(|x| x.as_array())?;
    let mut acc = String::new();
    for item in arr {
        let Some(contents) = item.get("content").and_then(|c| c.as_array()) else {
            continue;
        };
        for c in contents {
            if let Some(t) = c
                .get("text")
                .and_then(|t| t.get("value"))
                .and_then(|v| v.as_str())
            {
                acc.push_str(t);
            } else if let Some(t) = c.get("text").and_then(|v| v.as_str()) {
                acc.push_str(t);
            }
        }
    }
    (!acc.is_empty()).then_some(acc)
}
