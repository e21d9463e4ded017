use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub preview_dir: PathBuf,
    pub gemini: GeminiConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            preview_dir: env::temp_dir(),
            gemini: GeminiConfig {
                api_key: None,
                api_base: DEFAULT_GEMINI_API_BASE.to_string(),
                model: DEFAULT_GEMINI_MODEL.to_string(),
            },
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let timeout = match non_empty("ECOLENS_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("ECOLENS_TIMEOUT_SECS must be whole seconds, got {raw:?}"))?;
                Duration::from_secs(secs)
            }
            None => defaults.timeout,
        };

        Ok(Self {
            api_url: non_empty("ECOLENS_API_URL")
                .map(|value| trim_base_url(&value))
                .unwrap_or(defaults.api_url),
            timeout,
            preview_dir: non_empty("ECOLENS_PREVIEW_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.preview_dir),
            gemini: GeminiConfig {
                api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("GOOGLE_API_KEY")),
                api_base: non_empty("GEMINI_API_BASE")
                    .map(|value| trim_base_url(&value))
                    .unwrap_or(defaults.gemini.api_base),
                model: non_empty("GEMINI_MODEL").unwrap_or(defaults.gemini.model),
            },
        })
    }
}

pub(crate) fn trim_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
