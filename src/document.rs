//! Input documents and the values derived from them.
//!
//! Documents are owned by the caller and only borrowed by a pipeline run.
//! Everything derived from them ([`ExtractedText`], [`IntegrationRequest`])
//! belongs to the single run that produced it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Media type of a PDF document.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Media type of a WordprocessingML (`.docx`) document.
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Media type of plain UTF-8 text.
pub const TEXT_MEDIA_TYPE: &str = "text/plain";

/// Which side of the integration a document is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// The PDF carrying names and numbers.
    Source,
    /// The target-language template with placeholders.
    Template,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Source => f.write_str("source PDF"),
            DocumentKind::Template => f.write_str("template"),
        }
    }
}

/// The uploaded PDF.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub bytes: Vec<u8>,
    pub media_type: String,
    /// Original file name, when known.
    pub name: Option<String>,
}

impl SourceDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// The uploaded template.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    pub bytes: Vec<u8>,
    pub media_type: String,
    /// Original file name, when known. Used to name the artifact.
    pub name: Option<String>,
}

impl TemplateDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// One side of a run request: either a raw document that still needs
/// extracting, or text the caller already extracted.
#[derive(Debug, Clone)]
pub enum DocumentInput<D> {
    Document(D),
    Text(String),
}

impl DocumentInput<TemplateDocument> {
    /// File name of the template, if it was supplied as a named document.
    pub fn name(&self) -> Option<&str> {
        match self {
            DocumentInput::Document(doc) => doc.name.as_deref(),
            DocumentInput::Text(_) => None,
        }
    }
}

/// Plain text extracted from a document. May be empty, never absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedText(String);

impl ExtractedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for ExtractedText {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ExtractedText {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the oracle needs for one integration.
///
/// Built once per run by [`crate::pipeline::request::build_request`] and
/// never mutated; the serialised field names form the oracle's input schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationRequest {
    pdf_text: ExtractedText,
    template_text: ExtractedText,
    target_language: String,
}

impl IntegrationRequest {
    pub(crate) fn new(
        pdf_text: ExtractedText,
        template_text: ExtractedText,
        target_language: String,
    ) -> Self {
        Self {
            pdf_text,
            template_text,
            target_language,
        }
    }

    pub fn pdf_text(&self) -> &ExtractedText {
        &self.pdf_text
    }

    pub fn template_text(&self) -> &ExtractedText {
        &self.template_text
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }
}

/// Guess a media type from the leading bytes, falling back to `declared`.
///
/// Browsers and HTTP clients often label uploads `application/octet-stream`;
/// sniffing keeps the extractor from rejecting well-formed files.
pub fn sniff_media_type(bytes: &[u8], declared: &str) -> String {
    if bytes.starts_with(b"%PDF") {
        PDF_MEDIA_TYPE.to_string()
    } else if bytes.starts_with(b"PK\x03\x04") && !declared.starts_with("application/vnd.") {
        DOCX_MEDIA_TYPE.to_string()
    } else {
        declared.to_string()
    }
}

/// Media type implied by a file name's extension.
pub fn media_type_for_name(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        PDF_MEDIA_TYPE
    } else if lower.ends_with(".docx") || lower.ends_with(".dotx") {
        DOCX_MEDIA_TYPE
    } else if lower.ends_with(".txt") || lower.ends_with(".md") {
        TEXT_MEDIA_TYPE
    } else {
        "application/octet-stream"
    }
}
