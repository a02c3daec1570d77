use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::utils::timing::log_llm_timing;

#[derive(Debug, Default, Deserialize)]
pub struct GeminiResponse {
    pub candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiContent {
    pub parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiInlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

impl GeminiResponse {
    fn first_candidate_parts(&self) -> &[GeminiPart] {
        self.candidates
            .as_deref()
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| content.parts.as_deref())
            .unwrap_or(&[])
    }

    /// Concatenated text of the first candidate, `None` when it carries no text.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_candidate_parts()
            .iter()
            .filter_map(|part| match part {
                GeminiPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// First part of the first candidate that carries inline data.
    pub fn first_inline_data(&self) -> Option<&GeminiInlineData> {
        self.first_candidate_parts().iter().find_map(|part| match part {
            GeminiPart::InlineData { inline_data } if !inline_data.data.is_empty() => {
                Some(inline_data)
            }
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub base_url: String,
    pub safety_profile: String,
    pub request_timeout: Duration,
    pub max_attempts: usize,
}

impl GeminiSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_api_base_url.clone(),
            safety_profile: config.gemini_safety_settings.clone(),
            request_timeout: Duration::from_secs(config.gemini_request_timeout_seconds),
            max_attempts: config.gemini_max_attempts.max(1),
        }
    }
}

const GEMINI_RETRY_BASE_DELAY_MS: u64 = 900;

/// Thin `generateContent` transport. One instance is built at startup and
/// shared by every stylist operation.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    settings: GeminiSettings,
}

fn gemini_should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn gemini_should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn gemini_retry_delay(attempt: usize) -> Duration {
    let attempt = attempt.max(1) as u64;
    Duration::from_millis(GEMINI_RETRY_BASE_DELAY_MS.saturating_mul(attempt))
}

pub fn build_safety_settings(profile: &str) -> Vec<Value> {
    let threshold = match profile {
        "standard" => "BLOCK_MEDIUM_AND_ABOVE",
        "permissive" => "OFF",
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}', using standard defaults.",
                profile
            );
            "BLOCK_MEDIUM_AND_ABOVE"
        }
    };

    vec![
        json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": threshold }),
    ]
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_gemini_parts(parts: &[Value]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| {
            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                json!({ "text": truncate_for_log(text, 200) })
            } else if let Some(inline_data) = part.get("inlineData") {
                let mime_type = inline_data
                    .get("mimeType")
                    .and_then(|value| value.as_str())
                    .unwrap_or("unknown");
                let data_len = inline_data
                    .get("data")
                    .and_then(|value| value.as_str())
                    .map(|value| value.len())
                    .unwrap_or(0);
                json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
            } else {
                json!({ "unknownPart": true })
            }
        })
        .collect()
}

fn summarize_gemini_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let mut summarized_contents = Vec::new();
        for content in contents {
            let role = content
                .get("role")
                .and_then(|value| value.as_str())
                .unwrap_or("user");
            let parts = content
                .get("parts")
                .and_then(|value| value.as_array())
                .map(|parts| summarize_gemini_parts(parts))
                .unwrap_or_default();
            summarized_contents.push(json!({ "role": role, "parts": parts }));
        }
        summary.insert("contents".to_string(), Value::Array(summarized_contents));
    }

    if let Some(config) = payload.get("generationConfig") {
        let mut config = config.clone();
        if let Some(object) = config.as_object_mut() {
            if object.remove("responseSchema").is_some() {
                object.insert("responseSchema".to_string(), json!("<schema>"));
            }
        }
        summary.insert("generationConfig".to_string(), config);
    }

    if let Some(safety) = payload
        .get("safetySettings")
        .and_then(|value| value.as_array())
    {
        summary.insert("safetySettingsCount".to_string(), json!(safety.len()));
    }

    Value::Object(summary)
}

fn summarize_gemini_response(response: &GeminiResponse) -> Value {
    let mut text_parts = 0usize;
    let mut inline_parts = 0usize;
    let mut text_preview = None;

    let candidates = response.candidates.as_deref().unwrap_or(&[]);
    for candidate in candidates {
        let parts = candidate
            .content
            .as_ref()
            .and_then(|content| content.parts.as_deref())
            .unwrap_or(&[]);
        for part in parts {
            match part {
                GeminiPart::Text { text } => {
                    text_parts += 1;
                    if text_preview.is_none() && !text.trim().is_empty() {
                        text_preview = Some(truncate_for_log(text, 200));
                    }
                }
                GeminiPart::InlineData { .. } => inline_parts += 1,
                GeminiPart::Other(_) => {}
            }
        }
    }

    json!({
        "candidates": candidates.len(),
        "textParts": text_parts,
        "inlineParts": inline_parts,
        "textPreview": text_preview
    })
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

impl GeminiClient {
    pub fn new(http: Client, settings: GeminiSettings) -> Self {
        Self { http, settings }
    }

    fn redact_api_key(&self, text: &str) -> String {
        let key = self.settings.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Sends `contents` and `generationConfig` to `model`, adding the configured
    /// safety settings. `operation` only labels the timing log.
    pub async fn generate_content(
        &self,
        model: &str,
        operation: &str,
        contents: Value,
        generation_config: Option<Value>,
    ) -> Result<GeminiResponse> {
        let mut payload = json!({
            "contents": contents,
            "safetySettings": build_safety_settings(&self.settings.safety_profile),
        });
        if let (Some(config), Some(object)) = (generation_config, payload.as_object_mut()) {
            object.insert("generationConfig".to_string(), config);
        }

        log_llm_timing("gemini", model, operation, None, || async {
            self.call_gemini_api(model, &payload).await
        })
        .await
    }

    async fn call_gemini_api(&self, model: &str, payload: &Value) -> Result<GeminiResponse> {
        let url = self.endpoint(model);

        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload_summary = summarize_gemini_payload(payload);
            debug!(target: "llm.gemini", model = model, payload = %payload_summary);
        }

        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = match self
                .http
                .post(&url)
                .header("x-goog-api-key", &self.settings.api_key)
                .timeout(self.settings.request_timeout)
                .json(payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    let err_text = self.redact_api_key(&err.to_string());
                    let should_retry = gemini_should_retry_error(&err) && attempt < max_attempts;
                    warn!(
                        "Gemini request failed to send: {} (timeout={}, connect={}, status={:?}, retrying={})",
                        err_text,
                        err.is_timeout(),
                        err.is_connect(),
                        err.status(),
                        should_retry
                    );
                    if should_retry {
                        tokio::time::sleep(gemini_retry_delay(attempt)).await;
                        continue;
                    }
                    return Err(anyhow!("Gemini request failed: {}", err_text));
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let body = self.redact_api_key(&body);
                let (message, body_summary) = summarize_error_body(&body);
                let should_retry = gemini_should_retry_status(status) && attempt < max_attempts;
                warn!(
                    "Gemini API error: status={}, body={}, retrying={}",
                    status, body_summary, should_retry
                );
                if should_retry {
                    tokio::time::sleep(gemini_retry_delay(attempt)).await;
                    continue;
                }
                let detail = message.unwrap_or(body_summary);
                return Err(anyhow!(
                    "Gemini request failed with status {}: {}",
                    status,
                    detail
                ));
            }

            let value = response.json::<GeminiResponse>().await.map_err(|err| {
                anyhow!(
                    "Gemini response could not be decoded: {}",
                    self.redact_api_key(&err.to_string())
                )
            })?;
            if tracing::enabled!(tracing::Level::DEBUG) {
                let response_summary = summarize_gemini_response(&value);
                debug!(target: "llm.gemini", model = model, response = %response_summary);
            }
            return Ok(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: Value) -> GeminiResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn text_joins_first_candidate_parts_only() {
        let parsed = response(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }));
        assert_eq!(parsed.text().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn blank_text_counts_as_missing() {
        let parsed = response(json!({
            "candidates": [{ "content": { "parts": [{ "text": "  " }] } }]
        }));
        assert_eq!(parsed.text(), None);
        assert_eq!(response(json!({})).text(), None);
    }

    #[test]
    fn unknown_parts_do_not_break_decoding() {
        let parsed = response(json!({
            "candidates": [{ "content": { "parts": [
                { "thought": true, "thoughtSignature": "abc" },
                { "inlineData": { "data": "QUJD" } }
            ] } }]
        }));
        let inline = parsed.first_inline_data().unwrap();
        assert_eq!(inline.data, "QUJD");
        assert_eq!(inline.mime_type, None);
    }

    #[test]
    fn inline_parts_without_data_are_skipped() {
        let parsed = response(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "" } },
                { "inlineData": { "mimeType": "image/webp", "data": "WFla" } }
            ] } }]
        }));
        let inline = parsed.first_inline_data().unwrap();
        assert_eq!(inline.mime_type.as_deref(), Some("image/webp"));
    }

    #[test]
    fn payload_summary_hides_image_bytes_and_schema() {
        let payload = json!({
            "contents": [{ "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "AAAAAAAA" } },
                { "text": "hello" }
            ] }],
            "generationConfig": { "responseMimeType": "application/json", "responseSchema": { "type": "OBJECT" } },
            "safetySettings": build_safety_settings("standard")
        });
        let summary = summarize_gemini_payload(&payload);
        assert_eq!(summary.pointer("/contents/0/parts/0/inlineData/dataLen"), Some(&json!(8)));
        assert_eq!(summary.pointer("/generationConfig/responseSchema"), Some(&json!("<schema>")));
        assert_eq!(summary.get("safetySettingsCount"), Some(&json!(4)));
    }

    #[test]
    fn error_body_summary_prefers_api_message() {
        let (message, _) = summarize_error_body(r#"{"error":{"message":"quota exceeded"}}"#);
        assert_eq!(message.as_deref(), Some("quota exceeded"));
        let (message, summary) = summarize_error_body("   ");
        assert!(message.is_none());
        assert_eq!(summary, "empty response body");
    }

    #[test]
    fn redacts_api_key_from_errors() {
        let client = GeminiClient::new(
            Client::new(),
            GeminiSettings {
                api_key: "secret-key".to_string(),
                base_url: "https://example.test/v1beta/".to_string(),
                safety_profile: "standard".to_string(),
                request_timeout: Duration::from_secs(5),
                max_attempts: 1,
            },
        );
        assert_eq!(
            client.redact_api_key("url?key=secret-key failed"),
            "url?key=[redacted] failed"
        );
        assert_eq!(
            client.endpoint("gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
