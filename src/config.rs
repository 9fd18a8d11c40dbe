//! Configuration types.
//!
//! Two independent knobs live here:
//!
//! * [`StudyConfig`] controls the enhancement pipeline (which LLM, sampling,
//!   how many slides run at once). Built via [`StudyConfigBuilder`].
//! * [`ServerConfig`] controls the HTTP service and is read from the process
//!   environment with [`ServerConfig::from_env`].

use crate::error::LecSlideError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::env;
use std::fmt;
use std::sync::Arc;

/// Default model when the provider is auto-detected from `GEMINI_API_KEY`.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Default model when the provider is auto-detected from `OPENAI_API_KEY`.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-nano";

/// Configuration for the slide-enhancement pipeline.
///
/// Built via [`StudyConfig::builder()`] or using [`StudyConfig::default()`].
///
/// # Example
/// ```rust
/// use lecslide::StudyConfig;
///
/// let config = StudyConfig::builder()
///     .slide_concurrency(2)
///     .model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.slide_concurrency, 2);
/// ```
#[derive(Clone)]
pub struct StudyConfig {
    /// Number of slides enhanced at the same time. Default: 4.
    ///
    /// Every slide already issues four concurrent requests, so the number of
    /// in-flight backend calls is `4 × slide_concurrency`.
    pub slide_concurrency: usize,

    /// LLM model identifier, e.g. "gemini-2.0-flash", "gpt-4.1-mini".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens generated per request. Default: 2048.
    pub max_tokens: usize,

    /// Per-request timeout in seconds; 0 disables the timeout. Default: 60.
    pub api_timeout_secs: u64,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Optional per-slide progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            slide_concurrency: 4,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 2048,
            api_timeout_secs: 60,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudyConfig")
            .field("slide_concurrency", &self.slide_concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl StudyConfig {
    /// Create a new builder for `StudyConfig`.
    pub fn builder() -> StudyConfigBuilder {
        StudyConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`StudyConfig`].
#[derive(Debug)]
pub struct StudyConfigBuilder {
    config: StudyConfig,
}

impl StudyConfigBuilder {
    pub fn slide_concurrency(mut self, n: usize) -> Self {
        self.config.slide_concurrency = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StudyConfig, LecSlideError> {
        let c = &self.config;
        if c.slide_concurrency == 0 {
            return Err(LecSlideError::InvalidConfig(
                "Slide concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_tokens < 64 {
            return Err(LecSlideError::InvalidConfig(format!(
                "max_tokens must be ≥ 64, got {}",
                c.max_tokens
            )));
        }
        Ok(self.config)
    }
}

// ── Server ───────────────────────────────────────────────────────────────

/// Default upload limit: 20 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// HTTP service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL prefixed to download links, e.g. `https://lecslide.example/api`.
    /// When unset, links are relative (`/api/download/…`).
    pub public_url: Option<String>,
    pub max_upload_bytes: usize,
    /// Serve the built-in demo deck for unknown session ids.
    pub fixtures: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_url: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            fixtures: true,
        }
    }
}

impl ServerConfig {
    /// Read `LECSLIDE_*` variables, falling back to defaults for anything
    /// missing or unparsable.
    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();
        ServerConfig {
            host: env::var("LECSLIDE_HOST").unwrap_or(defaults.host),
            port: env::var("LECSLIDE_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            public_url: env::var("LECSLIDE_PUBLIC_URL")
                .ok()
                .map(|v| v.trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
            max_upload_bytes: env::var("LECSLIDE_MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            fixtures: env::var("LECSLIDE_FIXTURES")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.fixtures),
        }
    }

    /// Download URL for an exported file name.
    pub fn download_url(&self, file_name: &str) -> String {
        match &self.public_url {
            Some(base) => format!("{base}/download/{file_name}"),
            None => format!("/api/download/{file_name}"),
        }
    }
}

fn parse_flag(v: &str) -> bool {
    !matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_zero_concurrency() {
        let err = StudyConfig::builder().slide_concurrency(0).build().unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = StudyConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn download_url_relative_and_absolute() {
        let mut c = ServerConfig::default();
        assert_eq!(c.download_url("abc.pdf"), "/api/download/abc.pdf");
        c.public_url = Some("https://example.org/api".into());
        assert_eq!(c.download_url("abc.md"), "https://example.org/api/download/abc.md");
    }

    #[test]
    fn flags() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag("FALSE"));
    }
}
