//! Translation backends and their shared contract.
//!
//! Every backend implements [`TranslationBackend`] and never fails: any
//! problem is turned into [`TranslationOutcome::Unchanged`] carrying the
//! reason, so the caller keeps the original text and decides what to log.

mod ai;
mod google;

pub use ai::{AiTranslator, check_completion, max_tokens_for, system_prompt};
pub use google::GoogleTranslator;

use crate::config::{BackendKind, Config};
use crate::console::Console;
use crate::error::TranslationError;
use async_trait::async_trait;
use isolang::Language;
use std::fmt;
use std::time::Duration;

/// Per-request timeout for all backend calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Why a backend left the text as it was.
#[derive(Debug)]
pub enum UnchangedReason {
    /// The input was empty or whitespace only.
    BlankInput,
    /// Source and target language are the same.
    SameLanguage,
    /// The backend was unavailable, the call failed, or the result was rejected.
    Failed(TranslationError),
}

impl fmt::Display for UnchangedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankInput => f.write_str("blank input"),
            Self::SameLanguage => f.write_str("source and target language are the same"),
            Self::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Result of asking a backend for a translation.
#[derive(Debug)]
pub enum TranslationOutcome {
    /// The backend produced a translation.
    Translated(String),
    /// The original text should be kept.
    Unchanged(UnchangedReason),
}

impl TranslationOutcome {
    /// Wraps a backend call result, absorbing any error.
    pub fn from_result(result: Result<String, TranslationError>) -> Self {
        match result {
            Ok(text) => Self::Translated(text),
            Err(e) => Self::Unchanged(UnchangedReason::Failed(e)),
        }
    }
}

/// A translation provider.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Human-readable name for log lines.
    fn name(&self) -> &'static str;

    /// Translates `text` from `source` (a code or `auto`) to `target`.
    async fn translate(&self, text: &str, source: &str, target: &str) -> TranslationOutcome;
}

/// Detects the language of a piece of text.
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    /// Returns a language code, or `None` if the language could not be told.
    async fn detect(&self, text: &str) -> Result<Option<String>, TranslationError>;
}

/// Builds the backend selected by `kind`.
///
/// The AI backend uses the Google endpoint for language detection.
pub fn create_backend(
    kind: BackendKind,
    config: &Config,
    console: &Console,
) -> Result<Box<dyn TranslationBackend>, TranslationError> {
    let google = GoogleTranslator::new(&config.google)?;

    let backend: Box<dyn TranslationBackend> = match kind {
        BackendKind::Google => Box::new(google),
        BackendKind::Ai => Box::new(AiTranslator::new(
            config.api.clone(),
            config.translation.clone(),
            Box::new(google),
            console.clone(),
        )?),
    };

    Ok(backend)
}

/// Common HTTP client configuration for backends.
pub fn create_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("comfy-notes/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// Checks if an HTTP response is successful, and if not, returns a detailed error.
pub async fn check_response_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, TranslationError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(TranslationError::ApiError(format!(
            "HTTP {}: {}",
            status, text
        )));
    }
    Ok(response)
}

/// English name of a language code, for prompts and log lines.
///
/// Region-qualified codes such as `zh-cn` are looked up by their primary
/// subtag. Unknown codes come back upper-cased.
pub fn language_name(code: &str) -> String {
    let code = code.trim();
    let primary = code
        .split(['-', '_'])
        .next()
        .unwrap_or(code)
        .to_ascii_lowercase();

    match Language::from_639_1(&primary) {
        Some(language) => language.to_name().to_string(),
        None => code.to_uppercase(),
    }
}

/// A one-shot HTTP server for exercising backends against canned replies.
#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves a single request with `status` and a JSON `body`.
    ///
    /// Returns the base URL to point a backend at, and a handle resolving to
    /// the raw request (head and body) the server received.
    pub(crate) async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;

            let reply = format!(
                "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(reply.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            request
        });

        (base_url, handle)
    }

    /// Reads the request head and as much body as `Content-Length` announces.
    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).into_owned()
    }
}
