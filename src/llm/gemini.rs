use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::{Config, SafetyProfile};
use crate::llm::model::{
    GenerateContentRequest, GenerateContentResponse, ImageModel, ModelError, ResponsePart,
};
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

pub struct GeminiClient {
    client: &'static Client,
    api_key: String,
    api_base: String,
    model: String,
    timeout: Duration,
    safety: SafetyProfile,
}

impl GeminiClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: get_http_client(),
            api_key: config.gemini_api_key.clone(),
            api_base: config.gemini_api_base.clone(),
            model: config.gemini_image_model.clone(),
            timeout: config.gemini_request_timeout,
            safety: config.gemini_safety_settings,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn redact_api_key(&self, text: &str) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }

    fn build_payload(&self, request: &GenerateContentRequest) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": request.parts }],
            "generationConfig": { "responseModalities": request.response_modalities },
            "safetySettings": build_safety_settings(self.safety),
        })
    }

    async fn call_api(&self, payload: Value) -> Result<GenerateContentResponse, ModelError> {
        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload_summary = summarize_payload(&payload);
            debug!(target: "llm.gemini", model = %self.model, payload = %payload_summary);
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                let err_text = self.redact_api_key(&err.to_string());
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={}, status={:?})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect(),
                    err.status()
                );
                ModelError::Transport(err_text)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            return Err(ModelError::Status {
                status: status.as_u16(),
                message: self.redact_api_key(&message.unwrap_or(body_summary)),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| ModelError::Transport(self.redact_api_key(&err.to_string())))?;
        let value = serde_json::from_str::<GenerateContentResponse>(&body).map_err(|err| {
            warn!(
                "Gemini response decode failed: {} (body={})",
                err,
                truncate_for_log(&body, 2000)
            );
            ModelError::Decode(err.to_string())
        })?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            let response_summary = summarize_response(&value);
            debug!(target: "llm.gemini", model = %self.model, response = %response_summary);
        }
        Ok(value)
    }
}

impl ImageModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ModelError> {
        let payload = self.build_payload(&request);
        let metadata = json!({
            "parts": request.parts.len(),
            "images": request.parts.iter().filter(|part| part.as_inline_data().is_some()).count(),
        });
        log_llm_timing("gemini", &self.model, "generate_content", Some(metadata), || {
            self.call_api(payload)
        })
        .await
    }
}

fn build_safety_settings(profile: SafetyProfile) -> Vec<Value> {
    let threshold = profile.threshold();
    vec![
        json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_CIVIC_INTEGRITY", "threshold": threshold }),
    ]
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_parts(parts: &[Value]) -> Vec<Value> {
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

fn summarize_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let summarized_contents: Vec<Value> = contents
            .iter()
            .map(|content| {
                let parts = content
                    .get("parts")
                    .and_then(|value| value.as_array())
                    .map(|parts| summarize_parts(parts))
                    .unwrap_or_default();
                json!({ "parts": parts })
            })
            .collect();
        summary.insert("contents".to_string(), Value::Array(summarized_contents));
    }

    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }

    if let Some(safety) = payload
        .get("safetySettings")
        .and_then(|value| value.as_array())
    {
        summary.insert("safetySettingsCount".to_string(), json!(safety.len()));
    }

    Value::Object(summary)
}

fn summarize_response(response: &GenerateContentResponse) -> Value {
    let mut text_parts = 0usize;
    let mut image_parts = 0usize;
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
                ResponsePart::Text { text } => {
                    text_parts += 1;
                    if text_preview.is_none() && !text.trim().is_empty() {
                        text_preview = Some(truncate_for_log(text, 200));
                    }
                }
                ResponsePart::InlineData { inline_data } => {
                    if inline_data.mime_type.starts_with("image/") {
                        image_parts += 1;
                    }
                }
                ResponsePart::Other(_) => {}
            }
        }
    }

    json!({
        "candidates": candidates.len(),
        "textParts": text_parts,
        "imageParts": image_parts,
        "textPreview": text_preview,
        "refusal": response.refusal_reason(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::model::ContentPart;

    fn test_client() -> GeminiClient {
        GeminiClient {
            client: get_http_client(),
            api_key: "secret-key".to_string(),
            api_base: "https://example.invalid/v1beta".to_string(),
            model: "gemini-2.5-flash-image".to_string(),
            timeout: Duration::from_secs(5),
            safety: SafetyProfile::Standard,
        }
    }

    #[test]
    fn payload_keeps_part_order_and_requests_image_output() {
        let client = test_client();
        let request = GenerateContentRequest::image_output(vec![
            ContentPart::inline_image("image/jpeg", "Y2hhcg=="),
            ContentPart::inline_image("image/png", "c3R5bGU="),
            ContentPart::text("Apply the following styles: hairstyle."),
        ]);
        let payload = client.build_payload(&request);

        let parts = payload.pointer("/contents/0/parts").unwrap().as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(
            parts[0].pointer("/inlineData/data").and_then(Value::as_str),
            Some("Y2hhcg==")
        );
        assert_eq!(
            parts[1].pointer("/inlineData/mimeType").and_then(Value::as_str),
            Some("image/png")
        );
        assert!(parts[2].get("text").is_some());
        assert_eq!(
            payload.pointer("/generationConfig/responseModalities").unwrap(),
            &json!(["IMAGE"])
        );
        assert_eq!(
            payload.pointer("/safetySettings/0/threshold").and_then(Value::as_str),
            Some("BLOCK_MEDIUM_AND_ABOVE")
        );
        assert_eq!(
            client.endpoint(),
            "https://example.invalid/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn payload_summary_hides_inline_data() {
        let client = test_client();
        let request = GenerateContentRequest::image_output(vec![
            ContentPart::inline_image("image/png", "QUJDRA=="),
            ContentPart::text("Modify the person in this image."),
        ]);
        let summary = summarize_payload(&client.build_payload(&request));
        let rendered = summary.to_string();
        assert!(!rendered.contains("QUJDRA=="));
        assert_eq!(summary.pointer("/contents/0/parts/0/inlineData/dataLen").unwrap(), 8);
        assert_eq!(summary["safetySettingsCount"], 5);
    }

    #[test]
    fn api_key_is_redacted() {
        let client = test_client();
        assert_eq!(
            client.redact_api_key("error sending request for url (...?key=secret-key)"),
            "error sending request for url (...?key=[redacted])"
        );
    }

    #[test]
    fn error_body_prefers_api_message() {
        let (message, _) =
            summarize_error_body(r#"{"error":{"code":400,"message":"Image input is invalid"}}"#);
        assert_eq!(message.as_deref(), Some("Image input is invalid"));

        let (message, summary) = summarize_error_body("   ");
        assert!(message.is_none());
        assert_eq!(summary, "empty response body");
    }
}
