//! The request/response contract seen by front ends.
//!
//! Inbound payloads arrive in one of two JSON shapes:
//!
//! ```json
//! {"pdfText": "...", "templateText": "...", "targetLanguage": "Spanish"}
//! {"pdfDataUri": "data:application/pdf;base64,...",
//!  "templateDataUri": "data:...;base64,...", "targetLanguage": "Spanish"}
//! ```
//!
//! Both are resolved into a [`RunRequest`] here, so the orchestrator only
//! ever sees one representation. Every failure is reported with the same
//! generic `error` message plus the structured `kind` and `retryable`
//! fields; details go to the log.

use crate::document::{sniff_media_type, DocumentInput, SourceDocument, TemplateDocument};
use crate::error::{FailureKind, IntegrationError};
use crate::integrate::{Integrator, RunRequest};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// User-facing message for every failed run.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to process documents";

/// An inbound request in either accepted shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InboundRequest {
    /// Raw documents as base64 data URIs.
    DataUri {
        #[serde(rename = "pdfDataUri")]
        pdf_data_uri: String,
        #[serde(rename = "templateDataUri")]
        template_data_uri: String,
        #[serde(rename = "targetLanguage", default)]
        target_language: Option<String>,
    },
    /// Text the front end already extracted. Absent fields stay `None` and
    /// fail validation in the orchestrator.
    Text {
        #[serde(rename = "pdfText", default)]
        pdf_text: Option<String>,
        #[serde(rename = "templateText", default)]
        template_text: Option<String>,
        #[serde(rename = "targetLanguage", default)]
        target_language: Option<String>,
    },
}

impl InboundRequest {
    /// Resolve into a [`RunRequest`], decoding data URIs.
    pub fn into_run_request(self) -> Result<RunRequest, IntegrationError> {
        match self {
            InboundRequest::Text {
                pdf_text,
                template_text,
                target_language,
            } => Ok(RunRequest {
                source: pdf_text.map(DocumentInput::Text),
                template: template_text.map(DocumentInput::Text),
                target_language,
            }),
            InboundRequest::DataUri {
                pdf_data_uri,
                template_data_uri,
                target_language,
            } => {
                let (pdf_type, pdf_bytes) = parse_data_uri(&pdf_data_uri)?;
                let (template_type, template_bytes) = parse_data_uri(&template_data_uri)?;
                let pdf_type = sniff_media_type(&pdf_bytes, &pdf_type);
                let template_type = sniff_media_type(&template_bytes, &template_type);

                Ok(RunRequest {
                    source: Some(DocumentInput::Document(
                        SourceDocument::new(pdf_bytes, pdf_type),
                    )),
                    template: Some(DocumentInput::Document(
                        TemplateDocument::new(template_bytes, template_type),
                    )),
                    target_language,
                })
            }
        }
    }
}

/// Decode `data:<media type>[;params];base64,<payload>`.
///
/// Returns the media type (defaulting to `application/octet-stream`) and the
/// decoded bytes. Anything else is a validation failure.
pub fn parse_data_uri(uri: &str) -> Result<(String, Vec<u8>), IntegrationError> {
    let invalid = |why: &str| IntegrationError::Validation(format!("invalid data URI: {}", why));

    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| invalid("missing 'data:' prefix"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing ',' separator"))?;

    let mut params = header.split(';');
    let media_type = params.next().unwrap_or_default().trim();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(invalid("only base64 payloads are supported"));
    }

    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| invalid(&e.to_string()))?;

    let media_type = if media_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        media_type.to_ascii_lowercase()
    };
    Ok((media_type, bytes))
}

/// The response written back to the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundResponse {
    Success {
        #[serde(rename = "translatedContent")]
        translated_content: String,
    },
    Failure {
        error: String,
        kind: FailureKind,
        retryable: bool,
    },
}

impl OutboundResponse {
    /// The generic failure envelope for `err`.
    pub fn failure(err: &IntegrationError) -> Self {
        OutboundResponse::Failure {
            error: GENERIC_FAILURE_MESSAGE.to_string(),
            kind: err.kind(),
            retryable: err.is_retryable(),
        }
    }

    /// HTTP status: 200 on success, 500 for every failure.
    pub fn status_code(&self) -> u16 {
        match self {
            OutboundResponse::Success { .. } => 200,
            OutboundResponse::Failure { .. } => 500,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OutboundResponse::Success { .. })
    }
}

/// Run one inbound request to completion and build its response.
pub async fn process_inbound(integrator: &Integrator, inbound: InboundRequest) -> OutboundResponse {
    let outcome = match inbound.into_run_request() {
        Ok(request) => integrator.run_with_retry(&request).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(output) => {
            info!("Request succeeded: {} chars", output.result.translated_content.len());
            OutboundResponse::Success {
                translated_content: output.result.translated_content,
            }
        }
        Err(e) => {
            warn!("Request failed [{}]: {}", e.kind(), e);
            OutboundResponse::failure(&e)
        }
    }
}
