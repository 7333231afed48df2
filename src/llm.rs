//! llm.rs — Chat-completions client behind a small capability trait.
//!
//! OpenRouter is the default endpoint; any OpenAI-compatible server
//! (Ollama, llama.cpp, LM Studio) works by changing `llm.base_url`.
//! Calls are blocking: the pipeline runs on a blocking worker.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::logging::{backend_error, backend_info};

/// Opaque text-in/text-out model call: a fixed system prompt plus one
/// user turn, returning the completion text untouched.
pub trait TextCompletion: Send + Sync {
    fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, LlmError>;
}

// ─── Request types (OpenAI-compatible) ───────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model:       &'a str,
    messages:    [Message<'a>; 2],
    max_tokens:  u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message<'a> {
    role:    &'a str,
    content: &'a str,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// One model on one endpoint. The query and narrative stages each get their
/// own instance so they can use different models.
pub struct ChatClient {
    http:        Client,
    url:         String,
    api_key:     String,
    model:       String,
    max_tokens:  u32,
    temperature: f32,
}

impl ChatClient {
    pub fn new(cfg: &LlmConfig, model: &str) -> Result<Self, LlmError> {
        let api_key = cfg.api_key.clone().unwrap_or_default();
        if api_key.is_empty() && is_openrouter(&cfg.base_url) {
            return Err(LlmError::MissingApiKey);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(concat!("depot-recap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        backend_info(format!("LLM client ready: {} @ {}", model, cfg.base_url));

        Ok(Self {
            http,
            url: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn is_openrouter(base_url: &str) -> bool {
    base_url.contains("openrouter.ai")
}

impl TextCompletion for ChatClient {
    fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, LlmError> {
        let payload = ChatRequest {
            model: &self.model,
            messages: [
                Message { role: "system", content: system_prompt },
                Message { role: "user", content: user_text },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut req = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://depot-recap.local")
            .header("X-Title", "depot-recap")
            .json(&payload);
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = req.send().map_err(|e| {
            backend_error(format!("LLM HTTP request failed: {}", e));
            LlmError::Transport(e)
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().unwrap_or_default();
            let truncated: String = body.chars().take(300).collect();
            backend_error(format!("LLM HTTP error {}: {}", status, truncated));
            return Err(LlmError::Http { status, body: truncated });
        }

        let data: Value = resp.json().map_err(|e| {
            backend_error(format!("Failed to parse LLM JSON response: {}", e));
            LlmError::Transport(e)
        })?;

        let text = extract_content(&data).ok_or(LlmError::EmptyChoice)?;

        backend_info(format!(
            "LLM response extracted (model='{}', text_len={})",
            data["model"].as_str().unwrap_or(&self.model),
            text.len()
        ));

        Ok(text)
    }
}

fn extract_content(data: &Value) -> Option<String> {
    data["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
}

/// Language tags accepted right after an opening fence.
const FENCE_TAGS: [&str; 4] = ["sql", "sqlite", "postgresql", "mysql"];

/// Remove a markdown code fence (```` ```sql ```` … ```` ``` ````) the model
/// may wrap its answer in.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => drop_fence_tag(rest),
        None => trimmed,
    };
    body.trim_end().trim_end_matches("```").trim().to_string()
}

/// Only a known tag is dropped; an untagged fence keeps its first keyword.
fn drop_fence_tag(rest: &str) -> &str {
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '`')
        .unwrap_or(rest.len());
    if FENCE_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(&rest[..end])) {
        &rest[end..]
    } else {
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_tagged_fence() {
        let raw = "```sql\nSELECT * FROM data_all WHERE LOKASI = 'AMBON';\n```";
        assert_eq!(strip_code_fences(raw), "SELECT * FROM data_all WHERE LOKASI = 'AMBON';");
    }

    #[test]
    fn test_strip_untagged_fence() {
        assert_eq!(strip_code_fences("```\nSELECT 1\n```\n"), "SELECT 1");
    }

    #[test]
    fn test_strip_single_line_fence() {
        assert_eq!(strip_code_fences("```sql SELECT 1```"), "SELECT 1");
    }

    #[test]
    fn test_strip_untagged_single_line_fence_keeps_keyword() {
        assert_eq!(strip_code_fences("```SELECT * FROM data_all```"), "SELECT * FROM data_all");
        assert_eq!(
            strip_code_fences("```SELECT COUNT(CONTAINER) FROM data_all;```"),
            "SELECT COUNT(CONTAINER) FROM data_all;"
        );
        assert_eq!(strip_code_fences("```\nSELECT\n* FROM data_all\n```"), "SELECT\n* FROM data_all");
    }

    #[test]
    fn test_strip_tag_is_case_insensitive() {
        assert_eq!(strip_code_fences("```SQL\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```sql\n```"), "");
        assert_eq!(strip_code_fences("```sql```"), "");
    }

    #[test]
    fn test_strip_leaves_plain_text() {
        assert_eq!(strip_code_fences("  SELECT 1  "), "SELECT 1");
        assert_eq!(strip_code_fences("```\n```"), "");
    }

    #[test]
    fn test_extract_content() {
        let data = json!({"choices": [{"message": {"content": "SELECT 1"}}], "model": "m"});
        assert_eq!(extract_content(&data).as_deref(), Some("SELECT 1"));
        assert_eq!(extract_content(&json!({"choices": []})), None);
    }

    #[test]
    fn test_openrouter_requires_key() {
        let cfg = LlmConfig { api_key: None, ..LlmConfig::default() };
        assert!(matches!(ChatClient::new(&cfg, "m"), Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn test_local_endpoint_needs_no_key() {
        let cfg = LlmConfig {
            api_key: None,
            base_url: "http://localhost:11434/v1/".into(),
            ..LlmConfig::default()
        };
        let client = ChatClient::new(&cfg, "llama3").unwrap();
        assert_eq!(client.url, "http://localhost:11434/v1/chat/completions");
        assert_eq!(client.model(), "llama3");
    }
}
