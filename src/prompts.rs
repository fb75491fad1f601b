//! Prompts for the translation oracle.
//!
//! Every prompt lives here so wording can change without touching the
//! request/response handling in [`crate::pipeline::oracle`]. Callers can
//! override the system prompt via
//! [`crate::config::IntegrationConfig::system_prompt`]; the reply schema in
//! [`REPLY_FORMAT`] is always appended because the client depends on it.

use crate::document::IntegrationRequest;

/// Default system prompt for populating a template.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an assistant that populates a document template with data extracted from a PDF.

The template may be in a different language than the extracted data. Follow these rules precisely:

1. PLACEHOLDERS
   - Identify every placeholder in the template text (for example {{name}}, [DATE], ____ or similar markers)
   - Fill each placeholder with the matching value from the extracted PDF text

2. TRANSLATION
   - Translate any surrounding or inserted content into the target language
   - The result must read as coherent, grammatical text in the target language

3. LITERAL VALUES
   - Keep all personal names exactly as they appear in the source
   - Keep all numbers, amounts, dates and identifiers exactly as they appear in the source

4. STRUCTURE
   - Preserve the template's ordering of sections, lines and paragraphs
   - Do not add sections, notes or commentary

5. OUTPUT
   - Return only the final populated text"#;

/// Reply schema appended to every system prompt.
pub const REPLY_FORMAT: &str = r#"

Respond with a single JSON object and nothing else:
{"translatedContent": "<the populated template text>"}"#;

/// The system message actually sent: `base` followed by [`REPLY_FORMAT`].
pub fn system_message(base: Option<&str>) -> String {
    format!("{}{}", base.unwrap_or(DEFAULT_SYSTEM_PROMPT), REPLY_FORMAT)
}

/// Build the user message for one request.
///
/// The three request fields travel as a JSON object so the model sees
/// exactly the `{pdfText, templateText, targetLanguage}` schema, with
/// quoting handled by the serialiser rather than ad-hoc delimiters.
pub fn user_message(request: &IntegrationRequest) -> String {
    let payload = serde_json::to_string_pretty(request).unwrap_or_else(|_| {
        format!(
            "{{\"pdfText\": {:?}, \"templateText\": {:?}, \"targetLanguage\": {:?}}}",
            request.pdf_text().as_str(),
            request.template_text().as_str(),
            request.target_language()
        )
    });
    format!(
        "Populate the template in {} using the extracted data.\n\n{}",
        request.target_language(),
        payload
    )
}
