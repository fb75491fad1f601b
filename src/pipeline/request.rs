//! Integration request builder.
//!
//! Pure: no I/O, no logging. Both text fields are owned values, so "absent"
//! cannot be expressed here; empty strings are valid input.

use crate::document::{ExtractedText, IntegrationRequest};
use crate::error::IntegrationError;

/// Package extracted texts and a target language into one request.
///
/// The three values are stored exactly as given. Only the target language
/// is validated: it must contain something other than whitespace.
pub fn build_request(
    pdf_text: ExtractedText,
    template_text: ExtractedText,
    target_language: &str,
) -> Result<IntegrationRequest, IntegrationError> {
    if target_language.trim().is_empty() {
        return Err(IntegrationError::Validation(
            "target language must not be empty".into(),
        ));
    }
    Ok(IntegrationRequest::new(
        pdf_text,
        template_text,
        target_language.to_string(),
    ))
}
