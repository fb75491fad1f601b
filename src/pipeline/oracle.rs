//! Translation oracle client: one request in, one populated text out.
//!
//! The client is deliberately thin. Prompt wording lives in
//! [`crate::prompts`]; the provider call sits behind [`OracleTransport`] so
//! the request/response contract can be exercised without a network.
//!
//! ## Contract
//!
//! * Exactly one transport call per [`OracleClient::invoke`]. Retrying is the
//!   caller's decision (see [`crate::integrate::Integrator::run_with_retry`]).
//! * A reply must decode to `{"translatedContent": "<non-empty string>"}`.
//!   Anything else is an `OracleContractFailure`, distinct from transport
//!   problems.
//! * Transport failures are split into `OracleRejected` (the service said no:
//!   policy, safety filter, malformed request, bad credentials) and
//!   `OracleUnavailable` (everything that might work next time).

use crate::config::IntegrationConfig;
use crate::document::IntegrationRequest;
use crate::error::IntegrationError;
use crate::output::IntegrationResult;
use crate::pipeline::postprocess;
use crate::prompts;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Raw reply from the generative-model service.
#[derive(Debug, Clone, Default)]
pub struct OracleReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Why a transport call produced no reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Network, 5xx, rate limit or timeout.
    Unavailable(String),
    /// The service refused the request.
    Rejected(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Unavailable(d) => write!(f, "unavailable: {}", d),
            TransportError::Rejected(d) => write!(f, "rejected: {}", d),
        }
    }
}

/// Sends chat messages to a generative-model service.
#[async_trait]
pub trait OracleTransport: Send + Sync {
    async fn send(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<OracleReply, TransportError>;
}

/// [`OracleTransport`] backed by an `edgequake-llm` provider.
pub struct LlmTransport {
    provider: Arc<dyn LLMProvider>,
}

impl LlmTransport {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl OracleTransport for LlmTransport {
    async fn send(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<OracleReply, TransportError> {
        match self.provider.chat(messages, Some(options)).await {
            Ok(response) => Ok(OracleReply {
                content: response.content,
                input_tokens: response.prompt_tokens as usize,
                output_tokens: response.completion_tokens as usize,
            }),
            Err(e) => Err(classify_transport_error(&e.to_string())),
        }
    }
}

/// Client for the translation oracle.
#[derive(Clone)]
pub struct OracleClient {
    transport: Arc<dyn OracleTransport>,
    system_prompt: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Option<Duration>,
}

impl fmt::Debug for OracleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleClient")
            .field("transport", &"<dyn OracleTransport>")
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OracleClient {
    /// Build a client over an arbitrary transport.
    pub fn new(transport: Arc<dyn OracleTransport>, config: &IntegrationConfig) -> Self {
        Self {
            transport,
            system_prompt: prompts::system_message(config.system_prompt.as_deref()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.oracle_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Build a client over the configured LLM provider.
    ///
    /// Fails with a configuration error when no provider can be resolved,
    /// e.g. because no API key is set. Nothing is sent at this point.
    pub fn from_config(config: &IntegrationConfig) -> Result<Self, IntegrationError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(Arc::new(LlmTransport::new(provider)), config))
    }

    /// Send one request and decode the populated text.
    pub async fn invoke(
        &self,
        request: &IntegrationRequest,
    ) -> Result<IntegrationResult, IntegrationError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(prompts::user_message(request)),
        ];
        let options = self.build_options();

        debug!(
            "Invoking oracle: {} pdf chars, {} template chars → {}",
            request.pdf_text().len(),
            request.template_text().len(),
            request.target_language()
        );

        let sent = self.transport.send(&messages, &options);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, sent).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!("Oracle call exceeded {}s", limit.as_secs());
                    return Err(IntegrationError::OracleUnavailable {
                        detail: format!("no reply within {}s", limit.as_secs()),
                    });
                }
            },
            None => sent.await,
        };

        let reply = outcome.map_err(|e| match e {
            TransportError::Unavailable(detail) => IntegrationError::OracleUnavailable { detail },
            TransportError::Rejected(detail) => IntegrationError::OracleRejected { detail },
        })?;

        let translated_content = parse_reply(&reply.content)?;
        info!(
            "Oracle replied: {} chars, {} input / {} output tokens, {:?}",
            translated_content.len(),
            reply.input_tokens,
            reply.output_tokens,
            start.elapsed()
        );

        Ok(IntegrationResult {
            translated_content,
            input_tokens: reply.input_tokens,
            output_tokens: reply.output_tokens,
        })
    }

    /// Build `CompletionOptions` from the client settings.
    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

/// Decode a raw reply into the populated text.
pub fn parse_reply(raw: &str) -> Result<String, IntegrationError> {
    let contract = |detail: String| IntegrationError::OracleContract { detail };

    let cleaned = postprocess::clean_reply(raw);
    let value: serde_json::Value = serde_json::from_str(&cleaned)
        .map_err(|e| contract(format!("reply is not a JSON object: {}", e)))?;

    let field = value
        .get("translatedContent")
        .ok_or_else(|| contract("reply has no translatedContent field".to_string()))?;
    let text = field
        .as_str()
        .ok_or_else(|| contract(format!("translatedContent is not a string: {}", field)))?;

    let content = postprocess::clean_content(text);
    if content.trim().is_empty() {
        return Err(contract("translatedContent is empty".to_string()));
    }
    Ok(content)
}

/// A status code stated as such: leading the message or following a
/// `status`/`http`/`error`/`code` label. Bare numbers elsewhere (token
/// limits, sizes) are not statuses.
static RE_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^\s*|\b(?:status|http|error|code)\D{0,4})([45]\d\d)\b").unwrap()
});

static RE_RETRYABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)rate.?limit|too many requests|timed? ?out|overloaded|temporar|unavailable")
        .unwrap()
});

static RE_REJECTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)content.?filter|safety|policy|blocked|invalid.?request|bad request|unauthori[sz]ed|forbidden|api key",
    )
    .unwrap()
});

/// Classify a provider error message.
///
/// Provider errors only reach us as text. An explicit status code decides
/// first: `429` and `5xx` are transient, any other `4xx` is a refusal.
/// Without one, transient markers win over refusal markers, and anything
/// unrecognised is treated as transient.
pub fn classify_transport_error(detail: &str) -> TransportError {
    let status = RE_STATUS
        .captures(detail)
        .and_then(|caps| caps[1].parse::<u16>().ok());

    let retryable = match status {
        Some(code) => code == 429 || code >= 500,
        None => RE_RETRYABLE.is_match(detail) || !RE_REJECTED.is_match(detail),
    };

    if retryable {
        TransportError::Unavailable(detail.to_string())
    } else {
        TransportError::Rejected(detail.to_string())
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Default model for a named provider.
fn default_model(provider_name: &str) -> &'static str {
    match provider_name {
        "gemini" | "google" => "gemini-2.0-flash",
        "anthropic" => "claude-sonnet-4-20250514",
        "ollama" => "llama3.2",
        _ => "gpt-4.1-mini",
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, IntegrationError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        IntegrationError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) + `config.model` or the
///    provider's default model.
/// 3. **Environment pair** `LINGUALEAP_LLM_PROVIDER` + `LINGUALEAP_MODEL`.
/// 4. **Gemini** when `GEMINI_API_KEY` is set (`gemini-2.0-flash`).
/// 5. **OpenAI** when `OPENAI_API_KEY` is set.
/// 6. **Auto-detection** via [`ProviderFactory::from_env`].
fn resolve_provider(config: &IntegrationConfig) -> Result<Arc<dyn LLMProvider>, IntegrationError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or_else(|| default_model(name));
        return create_provider(name, model);
    }

    if let (Some(prov), Some(model)) = (
        env_non_empty("LINGUALEAP_LLM_PROVIDER"),
        env_non_empty("LINGUALEAP_MODEL"),
    ) {
        return create_provider(&prov, &model);
    }

    for (key, name) in [("GEMINI_API_KEY", "gemini"), ("OPENAI_API_KEY", "openai")] {
        if env_non_empty(key).is_some() {
            let model = config.model.as_deref().unwrap_or_else(|| default_model(name));
            return create_provider(name, model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| IntegrationError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
