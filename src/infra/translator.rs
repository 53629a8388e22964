// ============================================================
// Layer 6 — HTTP Translator
// ============================================================
// Translator backed by a LibreTranslate-compatible HTTP service:
//
//   POST {base_url}/translate
//   {"q": "...", "source": "auto", "target": "es", "format": "text"}
//   → {"translatedText": "..."}
//
// Blocking on purpose: augmentation runs inside the single-threaded
// dataset construction pass.

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::traits::Translator;

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q:      &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

pub struct HttpTranslator {
    client:   reqwest::blocking::Client,
    endpoint: String,
    api_key:  Option<String>,
}

impl HttpTranslator {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("meme-classifier"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Cannot build HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/translate", base_url.trim_end_matches('/')),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Translator for HttpTranslator {
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let body = TranslateRequest {
            q: text,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .with_context(|| format!("Translation request to '{}' failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Translation service answered {status}");
        }

        let parsed: TranslateResponse = response
            .json()
            .context("Translation service returned malformed JSON")?;
        Ok(parsed.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalises_trailing_slash() {
        let t = HttpTranslator::new("http://localhost:5000/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(t.endpoint(), "http://localhost:5000/translate");
    }

    #[test]
    fn test_request_body_shape() {
        let body = TranslateRequest { q: "hola", source: "auto", target: "en", format: "text", api_key: None };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["q"], "hola");
        assert_eq!(json["target"], "en");
        assert!(json.get("api_key").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let r: TranslateResponse = serde_json::from_str(r#"{"translatedText": "hello"}"#).unwrap();
        assert_eq!(r.translated_text, "hello");
    }

    #[test]
    fn test_unreachable_service_is_an_error() {
        let t = HttpTranslator::new("http://127.0.0.1:9", None, Duration::from_millis(300)).unwrap();
        assert!(t.translate("hola", "auto", "en").is_err());
    }
}
