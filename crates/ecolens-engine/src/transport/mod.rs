use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use ecolens_contracts::{AnalysisPayload, TransportError};

use crate::config::EngineConfig;
use crate::selection::ImageUpload;

mod dryrun;
mod gemini;
mod http;

pub use dryrun::DryrunTransport;
pub use gemini::{GeminiTransport, WASTE_ANALYSIS_PROMPT};
pub use http::HttpTransport;

const ERROR_MESSAGE_MAX_CHARS: usize = 512;

/// Performs one upload for one selected image.
///
/// `Ok` carries one of the recognized response shapes, including service-side
/// failures. `Err` means the exchange itself did not complete and is reported
/// as a network error.
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;
    fn describe(&self, upload: &ImageUpload) -> Result<AnalysisPayload>;
}

#[derive(Default)]
pub struct TransportRegistry {
    transports: BTreeMap<String, Arc<dyn Transport>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Transport + 'static>(&mut self, transport: T) {
        self.transports
            .insert(transport.name().to_string(), Arc::new(transport));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Transport>> {
        self.transports.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.transports.keys().cloned().collect()
    }
}

/// `gemini` is only registered when an API key is configured.
pub fn default_transport_registry(config: &EngineConfig) -> Result<TransportRegistry> {
    let mut transports = TransportRegistry::new();
    transports.register(DryrunTransport::new());
    transports.register(HttpTransport::new(&config.api_url, config.timeout)?);
    if let Some(api_key) = config.gemini.api_key.as_deref() {
        transports.register(GeminiTransport::new(
            &config.gemini.api_base,
            &config.gemini.model,
            api_key,
            config.timeout,
        )?);
    }
    Ok(transports)
}

pub fn transport_error(err: &anyhow::Error) -> TransportError {
    TransportError::network(error_chain_text(err, ERROR_MESSAGE_MAX_CHARS))
}

fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() || parts.last().map(String::as_str) == Some(trimmed) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
