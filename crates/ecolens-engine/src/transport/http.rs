use std::time::Duration;

use anyhow::{Context, Result};
use ecolens_contracts::AnalysisPayload;
use reqwest::blocking::multipart::{Form as MultipartForm, Part as MultipartPart};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::Value;

use super::Transport;
use crate::config::trim_base_url;
use crate::selection::ImageUpload;

const DESCRIBE_PATH: &str = "describe-image";
const UPLOAD_FIELD: &str = "file";

/// Uploads the image as a single-file multipart form to the analysis backend.
pub struct HttpTransport {
    endpoint: String,
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            endpoint: format!("{}/{DESCRIBE_PATH}", trim_base_url(api_url)),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn payload_from_response(response: HttpResponse) -> Result<AnalysisPayload> {
        let status = response.status();
        let code = status.as_u16();
        let body = response
            .text()
            .context("analysis response body read failed")?;
        let parsed = serde_json::from_str::<Value>(&body).ok();
        let payload = match (status.is_success(), parsed) {
            (true, Some(value)) => AnalysisPayload::from_value(&value),
            (true, None) => {
                AnalysisPayload::Error("service returned invalid JSON payload".to_string())
            }
            (false, parsed) => parsed
                .as_ref()
                .and_then(AnalysisPayload::recognize)
                .unwrap_or_else(|| {
                    AnalysisPayload::Error(format!("service request failed ({code})"))
                }),
        };
        Ok(payload)
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn describe(&self, upload: &ImageUpload) -> Result<AnalysisPayload> {
        let part = match MultipartPart::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.media_type)
        {
            Ok(part) => part,
            Err(err) => {
                log::warn!("not uploading {}: {err}", upload.file_name);
                return Ok(AnalysisPayload::Error(format!(
                    "unsupported media type {}",
                    upload.media_type
                )));
            }
        };
        let form = MultipartForm::new().part(UPLOAD_FIELD, part);

        log::debug!(
            "uploading {} ({} bytes) to {}",
            upload.file_name,
            upload.bytes.len(),
            self.endpoint
        );
        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .with_context(|| format!("analysis request failed ({})", self.endpoint))?;
        Self::payload_from_response(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use ecolens_contracts::AnalysisPayload;
    use mockito::Matcher;

    use super::HttpTransport;
    use crate::selection::ImageUpload;
    use crate::transport::Transport;

    fn upload() -> ImageUpload {
        ImageUpload {
            file_name: "peel.png".to_string(),
            media_type: "image/png".to_string(),
            bytes: Arc::from(b"fake-png-bytes".to_vec()),
        }
    }

    fn transport(server: &mockito::Server) -> anyhow::Result<HttpTransport> {
        HttpTransport::new(&format!("{}/", server.url()), Duration::from_secs(5))
    }

    #[test]
    fn endpoint_joins_base_without_double_slash() -> anyhow::Result<()> {
        let transport = HttpTransport::new("http://127.0.0.1:8000/", Duration::from_secs(1))?;
        assert_eq!(transport.endpoint(), "http://127.0.0.1:8000/describe-image");
        Ok(())
    }

    #[test]
    fn uploads_single_file_form_and_reads_content() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/describe-image")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="file"; filename="peel.png""#.to_string()),
                Matcher::Regex("fake-png-bytes".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"html": "```html\n<p>x</p>\n```"}"#)
            .create();

        let payload = transport(&server)?.describe(&upload())?;
        mock.assert();
        assert_eq!(
            payload,
            AnalysisPayload::Content("```html\n<p>x</p>\n```".to_string())
        );
        Ok(())
    }

    #[test]
    fn error_shape_is_application_error() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/describe-image")
            .with_status(200)
            .with_body(r#"{"error": "Gemini response parsing failed", "raw": {}}"#)
            .create();

        let payload = transport(&server)?.describe(&upload())?;
        assert_eq!(
            payload,
            AnalysisPayload::Error("Gemini response parsing failed".to_string())
        );
        Ok(())
    }

    #[test]
    fn unrecognized_success_body_is_unknown_error() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/describe-image")
            .with_status(200)
            .with_body("{}")
            .create();

        assert_eq!(transport(&server)?.describe(&upload())?, AnalysisPayload::unknown());
        Ok(())
    }

    #[test]
    fn non_json_body_is_application_error() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/describe-image")
            .with_status(200)
            .with_body("<html>proxy error</html>")
            .create();

        assert_eq!(
            transport(&server)?.describe(&upload())?,
            AnalysisPayload::Error("service returned invalid JSON payload".to_string())
        );
        Ok(())
    }

    #[test]
    fn failed_status_without_known_shape_reports_status() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/describe-image")
            .with_status(422)
            .with_body(r#"{"detail": [{"msg": "field required"}]}"#)
            .create();

        assert_eq!(
            transport(&server)?.describe(&upload())?,
            AnalysisPayload::Error("service request failed (422)".to_string())
        );
        Ok(())
    }

    #[test]
    fn failed_status_with_error_shape_keeps_message() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/describe-image")
            .with_status(500)
            .with_body(r#"{"error": "quota exceeded"}"#)
            .create();

        assert_eq!(
            transport(&server)?.describe(&upload())?,
            AnalysisPayload::Error("quota exceeded".to_string())
        );
        Ok(())
    }

    #[test]
    fn unparseable_media_type_fails_without_a_request() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/describe-image")
            .expect(0)
            .create();
        let mut bad = upload();
        bad.media_type = "image png".to_string();

        assert_eq!(
            transport(&server)?.describe(&bad)?,
            AnalysisPayload::Error("unsupported media type image png".to_string())
        );
        mock.assert();
        Ok(())
    }
}
