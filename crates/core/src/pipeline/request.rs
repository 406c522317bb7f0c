use std::fmt;
use std::num::NonZeroU32;

use crate::config::app_config::AppConfig;
use crate::shared::constants::AUTO_LANGUAGE;

/// Per-run knobs. `language: None` means auto-detect.
#[derive(Clone, PartialEq)]
pub struct PipelineOptions {
    pub language: Option<String>,
    pub target_speakers: Option<NonZeroU32>,
    pub diarize: bool,
    pub voice_filter: bool,
    pub force_cpu: bool,
    pub credential: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            language: None,
            target_speakers: None,
            diarize: true,
            voice_filter: true,
            force_cpu: false,
            credential: None,
        }
    }
}

impl PipelineOptions {
    /// Defaults taken from persisted configuration. Callers override
    /// individual fields afterwards.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            language: normalize_language(&config.language),
            target_speakers: config.num_speakers.and_then(NonZeroU32::new),
            credential: config.hf_token.clone().filter(|t| !t.trim().is_empty()),
            ..Self::default()
        }
    }

    /// Language code as passed to the recognizer, `"auto"` when unset.
    pub fn language_code(&self) -> &str {
        self.language.as_deref().unwrap_or(AUTO_LANGUAGE)
    }
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("language", &self.language)
            .field("target_speakers", &self.target_speakers)
            .field("diarize", &self.diarize)
            .field("voice_filter", &self.voice_filter)
            .field("force_cpu", &self.force_cpu)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// `"auto"` and blank codes mean auto-detect.
pub fn normalize_language(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() || code.eq_ignore_ascii_case(AUTO_LANGUAGE) {
        None
    } else {
        Some(code.to_lowercase())
    }
}

/// A source URL plus options. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineRequest {
    url: String,
    options: PipelineOptions,
}

impl PipelineRequest {
    pub fn new(url: impl Into<String>, options: PipelineOptions) -> Self {
        Self {
            url: url.into().trim().to_string(),
            options,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }
}
