//! Literal machine translation through Google's free web endpoint.
//!
//! Uses the `translate_a/single?client=gtx` endpoint, which needs no key
//! and accepts `auto` as source language. The same call reports the
//! detected source language, which makes it usable as a detector.

use super::{
    LanguageDetector, TranslationBackend, TranslationOutcome, UnchangedReason,
    check_response_status, create_http_client,
};
use crate::config::{BackendKind, GoogleConfig};
use crate::error::TranslationError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

/// Translator backed by the free Google web endpoint.
pub struct GoogleTranslator {
    /// HTTP client for API requests.
    client: Client,
    /// Endpoint root, without trailing slash.
    base_url: String,
}

impl GoogleTranslator {
    /// Create a new GoogleTranslator.
    pub fn new(config: &GoogleConfig) -> Result<Self, TranslationError> {
        Ok(Self {
            client: create_http_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds the request URL for one call.
    fn endpoint(&self, text: &str, source: &str, target: &str) -> Result<Url, TranslationError> {
        let url = format!("{}/translate_a/single", self.base_url);
        Url::parse_with_params(
            &url,
            &[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ],
        )
        .map_err(|e| TranslationError::ParseError(format!("invalid endpoint {}: {}", url, e)))
    }

    /// Sends one request and returns the raw JSON body.
    async fn request(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<Value, TranslationError> {
        let url = self.endpoint(text, source, target)?;
        let response = self.client.get(url).send().await?;
        let response = check_response_status(response).await?;

        let body = response.json::<Value>().await?;
        Ok(body)
    }

    /// Translates text, returning an error on any failure.
    pub async fn translate_text(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let body = self.request(text, source, target).await?;
        parse_translation(&body)
    }
}

#[async_trait]
impl TranslationBackend for GoogleTranslator {
    fn kind(&self) -> BackendKind {
        BackendKind::Google
    }

    fn name(&self) -> &'static str {
        "Google Translate"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> TranslationOutcome {
        if text.trim().is_empty() {
            return TranslationOutcome::Unchanged(UnchangedReason::BlankInput);
        }

        TranslationOutcome::from_result(self.translate_text(text, source, target).await)
    }
}

#[async_trait]
impl LanguageDetector for GoogleTranslator {
    async fn detect(&self, text: &str) -> Result<Option<String>, TranslationError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        // Target does not matter for detection; English keeps the response small.
        let body = self.request(text, "auto", "en").await?;
        Ok(parse_detected_language(&body))
    }
}

/// Joins the translated segments of a `translate_a/single` response.
///
/// The body looks like `[[["Hola ", "Hello ", ...], ["mundo", "world", ...]], null, "en", ...]`.
fn parse_translation(body: &Value) -> Result<String, TranslationError> {
    let sentences = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::ParseError("unexpected response shape".to_string()))?;

    let translated: String = sentences
        .iter()
        .filter_map(|sentence| sentence.get(0).and_then(Value::as_str))
        .collect();

    Ok(translated)
}

/// Reads the detected source language from a `translate_a/single` response.
fn parse_detected_language(body: &Value) -> Option<String> {
    body.get(2)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::test_server::serve_once;
    use serde_json::json;

    fn make_translator() -> GoogleTranslator {
        GoogleTranslator::new(&GoogleConfig::default()).unwrap()
    }

    fn translator_at(base_url: &str) -> GoogleTranslator {
        GoogleTranslator::new(&GoogleConfig {
            base_url: base_url.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_parse_translation_joins_segments() {
        let body = json!([
            [
                ["Consejo: ", "Tip: ", null, null, 10],
                ["usa más pasos.", "use more steps.", null, null, 10]
            ],
            null,
            "en"
        ]);
        assert_eq!(parse_translation(&body).unwrap(), "Consejo: usa más pasos.");
    }

    #[test]
    fn test_parse_translation_rejects_unexpected_shape() {
        let body = json!({"error": "quota"});
        assert!(matches!(
            parse_translation(&body),
            Err(TranslationError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_detected_language() {
        let body = json!([[["Hello", "Bonjour", null, null, 10]], null, "FR"]);
        assert_eq!(parse_detected_language(&body), Some("fr".to_string()));

        let body = json!([[["Hello", "Hello", null, null, 10]], null, null]);
        assert_eq!(parse_detected_language(&body), None);
    }

    #[test]
    fn test_endpoint_encodes_text() {
        let translator = make_translator();
        let url = translator
            .endpoint("Tip: use more steps & CFG", "auto", "es")
            .unwrap();

        assert_eq!(url.path(), "/translate_a/single");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("sl".to_string(), "auto".to_string())));
        assert!(query.contains(&("tl".to_string(), "es".to_string())));
        assert!(query.contains(&("q".to_string(), "Tip: use more steps & CFG".to_string())));
    }

    #[tokio::test]
    async fn test_blank_input_skips_request() {
        let translator = make_translator();
        let outcome = translator.translate("   \n", "en", "es").await;
        assert!(matches!(
            outcome,
            TranslationOutcome::Unchanged(UnchangedReason::BlankInput)
        ));
    }

    #[tokio::test]
    async fn test_translate_over_http() {
        let body = r#"[[["Consejo: ","Tip: ",null,null,10],["usa más pasos.","use more steps.",null,null,10]],null,"en"]"#;
        let (base_url, server) = serve_once(200, body).await;
        let translator = translator_at(&base_url);

        let outcome = translator.translate("Tip: use more steps.", "auto", "es").await;
        match outcome {
            TranslationOutcome::Translated(text) => assert_eq!(text, "Consejo: usa más pasos."),
            other => panic!("expected a translation, got {:?}", other),
        }

        let request = server.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert!(request_line.starts_with("GET /translate_a/single?"));
        assert!(request_line.contains("client=gtx"));
        assert!(request_line.contains("sl=auto"));
        assert!(request_line.contains("tl=es"));
        assert!(request_line.contains("dt=t"));
    }

    #[tokio::test]
    async fn test_error_status_keeps_original() {
        let (base_url, server) = serve_once(500, r#"{"error":"backend down"}"#).await;
        let translator = translator_at(&base_url);

        let outcome = translator.translate("Tip", "en", "es").await;
        match outcome {
            TranslationOutcome::Unchanged(UnchangedReason::Failed(TranslationError::ApiError(
                message,
            ))) => {
                assert!(message.contains("500"));
                assert!(message.contains("backend down"));
            }
            other => panic!("expected an API error, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_detect_over_http() {
        let body = r#"[[["Hello","Bonjour",null,null,10]],null,"fr"]"#;
        let (base_url, server) = serve_once(200, body).await;
        let translator = translator_at(&base_url);

        let detected = translator.detect("Bonjour").await.unwrap();
        assert_eq!(detected, Some("fr".to_string()));

        let request = server.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert!(request_line.contains("sl=auto"));
        assert!(request_line.contains("tl=en"));
    }
}
