//! Pipeline stages for template population.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and swapped (the extractor and the oracle transport are traits).
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ request ──▶ oracle ──▶ assemble
//! (path/URL) (pdfium,    (validate)  (LLM +     (docx/txt,
//!             OOXML)                 postprocess) file name)
//! ```
//!
//! 1. [`input`]   : load a local file or download a URL into a document
//! 2. [`extract`] : first-page PDF text and raw template text
//! 3. [`request`] : validate and package the integration request
//! 4. [`oracle`]  : the single network call; [`postprocess`] cleans its reply
//! 5. [`assemble`]: package the populated text as a downloadable artifact

pub mod assemble;
pub mod extract;
pub mod input;
pub mod oracle;
pub mod postprocess;
pub mod request;
