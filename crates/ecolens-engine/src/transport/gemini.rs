use std::time::Duration;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ecolens_contracts::AnalysisPayload;
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};

use super::{truncate_text, Transport};
use crate::config::trim_base_url;
use crate::selection::ImageUpload;

pub const WASTE_ANALYSIS_PROMPT: &str = "You are an expert in sustainable waste management. \
Look at the uploaded image and classify the waste it shows (food peel, paper, plastic, and so on). \
If it is organic waste such as fruit peels, vegetable scraps or eggshells:\n\
1. State clearly that it is organic waste.\n\
2. Name exactly what it is, for example banana peel or orange peel.\n\
3. Give a short paragraph on its environmental impact when reused.\n\
4. Give an HTML list of 3 to 5 steps a person can follow at home to reuse or compost it, \
including where (garden, kitchen, community bin) and how (bury it, blend it into compost, dry and crush it).\n\
5. Explain how those steps help the planet: less landfill, better soil, less methane.\n\n\
Format the answer as HTML with:\n\
- an <h2> title saying whether it is organic or not\n\
- a <p> summary\n\
- a <ul> with the steps\n\
- an optional closing <p> about the environmental benefit";

const PARSE_FAILURE_MESSAGE: &str = "Gemini response parsing failed";

/// Sends the image straight to Gemini `generateContent` with the waste-analysis
/// prompt, bypassing the backend service.
pub struct GeminiTransport {
    endpoint: String,
    api_key: String,
    http: HttpClient,
}

impl GeminiTransport {
    pub fn new(api_base: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            endpoint: endpoint_for_model(api_base, model),
            api_key: api_key.to_string(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(upload: &ImageUpload) -> Value {
        json!({
            "contents": [
                {
                    "parts": [
                        { "text": WASTE_ANALYSIS_PROMPT },
                        {
                            "inlineData": {
                                "mimeType": upload.media_type,
                                "data": BASE64.encode(&upload.bytes),
                            }
                        }
                    ]
                }
            ]
        })
    }
}

fn endpoint_for_model(api_base: &str, model: &str) -> String {
    let trimmed = model.trim();
    let model_path = if trimmed.starts_with("models/") {
        trimmed.to_string()
    } else {
        format!("models/{trimmed}")
    };
    format!("{}/{}:generateContent", trim_base_url(api_base), model_path)
}

fn first_candidate_text(payload: &Value) -> Option<&str> {
    payload
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()
}

fn upstream_error_message(payload: &Value) -> Option<String> {
    payload
        .get("error")
        .and_then(|error| error.get("message").or(Some(error)))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| truncate_text(value, 512))
}

impl Transport for GeminiTransport {
    fn name(&self) -> &str {
        "gemini"
    }

    fn describe(&self, upload: &ImageUpload) -> Result<AnalysisPayload> {
        let url = reqwest::Url::parse_with_params(&self.endpoint, &[("key", self.api_key.as_str())])
            .with_context(|| format!("invalid Gemini endpoint {}", self.endpoint))?;
        let response = self
            .http
            .post(url)
            .json(&Self::request_body(upload))
            .send()
            .with_context(|| format!("Gemini request failed ({})", self.endpoint))?;
        let status = response.status();
        let body = response.text().context("Gemini response body read failed")?;
        let parsed = serde_json::from_str::<Value>(&body).ok();

        if !status.is_success() {
            let message = parsed
                .as_ref()
                .and_then(upstream_error_message)
                .unwrap_or_else(|| format!("Gemini request failed ({})", status.as_u16()));
            return Ok(AnalysisPayload::Error(message));
        }

        let payload = parsed
            .as_ref()
            .and_then(first_candidate_text)
            .map(|text| AnalysisPayload::Content(text.to_string()))
            .unwrap_or_else(|| AnalysisPayload::Error(PARSE_FAILURE_MESSAGE.to_string()));
        Ok(payload)
    }
}
