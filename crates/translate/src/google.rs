//! Client for the public Google Translate web endpoint.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use slidecheck_core::{BackTranslator, Error, Result};
use std::thread;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Longest text the endpoint accepts in one request.
pub const MAX_TEXT_CHARS: usize = 5000;

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub endpoint: String,
    /// Language of the text being translated, or "auto" to detect it.
    pub source_lang: String,
    /// Language to translate into.
    pub target_lang: String,
    pub timeout: Duration,
    /// Attempts per text, including the first.
    pub max_retries: u32,
    /// Pause after each network call to stay under the endpoint's rate limit.
    pub request_delay: Duration,
    /// Base delay for exponential backoff between attempts.
    pub backoff: Duration,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            source_lang: "auto".to_string(),
            target_lang: "en".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            request_delay: Duration::from_millis(180),
            backoff: Duration::from_millis(500),
        }
    }
}

impl GoogleConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_source_lang(mut self, lang: impl Into<String>) -> Self {
        let lang = lang.into();
        self.source_lang = if lang.trim().is_empty() {
            "auto".to_string()
        } else {
            lang
        };
        self
    }

    pub fn with_target_lang(mut self, lang: impl Into<String>) -> Self {
        self.target_lang = lang.into();
        self
    }
}

pub struct GoogleTranslator {
    client: Client,
    config: GoogleConfig,
}

impl GoogleTranslator {
    pub fn new(config: GoogleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Translation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn translate(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let chars = text.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Err(Error::Translation(format!(
                "Text of {} characters exceeds the {} character limit",
                chars, MAX_TEXT_CHARS
            )));
        }

        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match self.call_api(text) {
                Ok(translated) => return Ok(translated),
                Err(CallError::Fatal(e)) => return Err(e),
                Err(CallError::Retryable(e)) => {
                    log::warn!("Translation attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                    if attempt + 1 < attempts {
                        thread::sleep(backoff_delay(self.config.backoff, attempt));
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::Translation("Translation failed after retries".to_string())))
    }

    fn call_api(&self, text: &str) -> std::result::Result<String, CallError> {
        let result = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", self.config.source_lang.as_str()),
                ("tl", self.config.target_lang.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send();

        thread::sleep(self.config.request_delay);

        let response = result.map_err(|e| {
            CallError::Retryable(Error::Translation(format!("Request failed: {}", e)))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let err = Error::Translation(format!("API returned {}: {}", status, body));
            return Err(if is_retryable(status) {
                CallError::Retryable(err)
            } else {
                CallError::Fatal(err)
            });
        }

        let body = response.text().map_err(|e| {
            CallError::Retryable(Error::Translation(format!("Failed to read response: {}", e)))
        })?;

        parse_response(&body).map_err(CallError::Fatal)
    }
}

impl BackTranslator for GoogleTranslator {
    fn back_translate(&mut self, text: &str) -> Result<String> {
        self.translate(text)
    }

    fn target_language(&self) -> &str {
        &self.config.target_lang
    }
}

/// Delay before retry number `attempt + 1`: `base * 2^attempt`, saturating.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

enum CallError {
    Retryable(Error),
    Fatal(Error),
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The body is a nested array whose first element lists
/// `[translated, original, ...]` segments.
pub fn parse_response(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::Translation(format!("Invalid response JSON: {}", e)))?;

    let segments = match value.get(0) {
        Some(Value::Array(segments)) => segments,
        Some(Value::Null) => return Ok(String::new()),
        _ => {
            return Err(Error::Translation(
                "Unexpected response shape: missing segment list".to_string(),
            ))
        }
    };

    let mut translated = String::new();
    for segment in segments {
        if let Some(part) = segment.get(0).and_then(Value::as_str) {
            translated.push_str(part);
        }
    }

    Ok(translated.trim().to_string())
}
