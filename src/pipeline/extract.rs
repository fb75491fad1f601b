//! Text extraction from the source PDF and the template.
//!
//! The [`Extractor`] trait is the seam between the orchestrator and the
//! format decoders; [`DocumentExtractor`] is the production implementation:
//!
//! * **PDF**: first page only, via pdfium. Text segments are joined with a
//!   single space in the order pdfium reports them; no layout is rebuilt.
//! * **Template**: the whole `word/document.xml` of a `.docx`, formatting
//!   dropped, paragraphs separated by a blank line. Placeholder tokens are
//!   ordinary text and survive verbatim. `text/*` templates are read as
//!   UTF-8.
//!
//! Both decoders are blocking and run under `spawn_blocking`. pdfium keeps
//! thread-local state and must never be driven from an async worker.

use crate::config::IntegrationConfig;
use crate::document::{
    DocumentKind, ExtractedText, SourceDocument, TemplateDocument, PDF_MEDIA_TYPE,
};
use crate::error::IntegrationError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

/// Converts documents into plain text.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract the text of the source PDF.
    async fn extract_source(&self, doc: &SourceDocument) -> Result<ExtractedText, IntegrationError>;

    /// Extract the raw text of the template.
    async fn extract_template(
        &self,
        doc: &TemplateDocument,
    ) -> Result<ExtractedText, IntegrationError>;
}

/// pdfium + OOXML extractor.
#[derive(Debug, Clone, Default)]
pub struct DocumentExtractor {
    pdfium_library_path: Option<PathBuf>,
}

impl DocumentExtractor {
    pub fn new(config: &IntegrationConfig) -> Self {
        Self {
            pdfium_library_path: config.pdfium_library_path.clone(),
        }
    }
}

#[async_trait]
impl Extractor for DocumentExtractor {
    async fn extract_source(&self, doc: &SourceDocument) -> Result<ExtractedText, IntegrationError> {
        if !doc.bytes.starts_with(b"%PDF") {
            return Err(extraction_error(
                DocumentKind::Source,
                format!(
                    "expected {}, got '{}' (first bytes: {:?})",
                    PDF_MEDIA_TYPE,
                    doc.media_type,
                    &doc.bytes[..doc.bytes.len().min(4)]
                ),
            ));
        }

        let bytes = doc.bytes.clone();
        let lib_path = self.pdfium_library_path.clone();
        let text = tokio::task::spawn_blocking(move || {
            pdf_first_page_text(&bytes, lib_path.as_deref())
        })
        .await
        .map_err(|e| IntegrationError::Internal(format!("PDF extraction task panicked: {}", e)))??;

        info!("Extracted {} chars from source PDF", text.len());
        Ok(ExtractedText::new(text))
    }

    async fn extract_template(
        &self,
        doc: &TemplateDocument,
    ) -> Result<ExtractedText, IntegrationError> {
        if doc.media_type.starts_with("text/") {
            let text = String::from_utf8(doc.bytes.clone()).map_err(|e| {
                extraction_error(DocumentKind::Template, format!("not valid UTF-8: {}", e))
            })?;
            return Ok(ExtractedText::new(text));
        }

        if !doc.bytes.starts_with(b"PK\x03\x04") {
            return Err(extraction_error(
                DocumentKind::Template,
                format!(
                    "'{}' is not a .docx package (legacy .doc files are not supported)",
                    doc.media_type
                ),
            ));
        }

        let bytes = doc.bytes.clone();
        let text = tokio::task::spawn_blocking(move || docx_raw_text(&bytes))
            .await
            .map_err(|e| {
                IntegrationError::Internal(format!("Template extraction task panicked: {}", e))
            })?
            .map_err(|reason| extraction_error(DocumentKind::Template, reason))?;

        info!("Extracted {} chars from template", text.len());
        Ok(ExtractedText::new(text))
    }
}

fn extraction_error(kind: DocumentKind, reason: String) -> IntegrationError {
    IntegrationError::Extraction { kind, reason }
}

// ── PDF ──────────────────────────────────────────────────────────────────

/// Bind pdfium from an explicit path, `PDFIUM_LIB_PATH`, or the system.
///
/// A directory is resolved to the platform library name inside it.
fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, IntegrationError> {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    let bindings = match configured {
        Some(path) if path.is_dir() => {
            debug!("Binding pdfium from directory {}", path.display());
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                path.to_string_lossy().as_ref(),
            ))
        }
        Some(path) => {
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(path.to_string_lossy().to_string())
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| IntegrationError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking: text of the first page, segments joined by single spaces.
fn pdf_first_page_text(bytes: &[u8], lib_path: Option<&Path>) -> Result<String, IntegrationError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            extraction_error(
                DocumentKind::Source,
                "document is password-protected".to_string(),
            )
        } else {
            extraction_error(DocumentKind::Source, err_str)
        }
    })?;

    let pages = document.pages();
    if pages.len() == 0 {
        debug!("PDF has no pages; extracted text is empty");
        return Ok(String::new());
    }

    let page = pages
        .get(0)
        .map_err(|e| extraction_error(DocumentKind::Source, format!("page 1: {:?}", e)))?;
    let text = page
        .text()
        .map_err(|e| extraction_error(DocumentKind::Source, format!("page 1 text: {:?}", e)))?;

    let runs: Vec<String> = text.segments().iter().map(|segment| segment.text()).collect();
    debug!("Page 1: {} text segments", runs.len());
    Ok(runs.join(" "))
}

// ── DOCX ─────────────────────────────────────────────────────────────────

/// Blocking: raw text of a `.docx` package.
fn docx_raw_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not a zip archive: {}", e))?;

    let mut xml = Vec::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| "missing word/document.xml".to_string())?
        .read_to_end(&mut xml)
        .map_err(|e| format!("reading word/document.xml: {}", e))?;

    document_xml_text(&xml)
}

/// Walk WordprocessingML and keep only the characters a reader would see.
///
/// `w:t` runs are text, `w:tab` is a tab, `w:br`/`w:cr` are line breaks and
/// every `w:p` ends with a blank line. Tab *stops* (`w:tabs/w:tab` inside
/// paragraph properties) and deleted text (`w:delText`) are not content.
fn document_xml_text(xml: &[u8]) -> Result<String, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;
    let mut in_tab_stops = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"tabs" => in_tab_stops = true,
                b"tab" if !in_tab_stops => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" if !in_tab_stops => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                b"p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"tabs" => in_tab_stops = false,
                b"p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e.unescape().map_err(|e| format!("bad text run: {}", e))?;
                out.push_str(&text);
            }
            Ok(Event::CData(e)) if in_text => out.push_str(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "malformed word/document.xml at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DOCX_MEDIA_TYPE, TEXT_MEDIA_TYPE};
    use crate::error::FailureKind;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("word/document.xml", options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        )
        .unwrap();
        zip.finish().unwrap();
        buffer.into_inner()
    }

    #[test]
    fn xml_paragraphs_runs_and_placeholders() {
        let xml = br#"<w:document xmlns:w="x"><w:body>
<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>
<w:r><w:rPr><w:b/></w:rPr><w:t>Name:</w:t></w:r><w:r><w:t xml:space="preserve"> {{name}}</w:t></w:r></w:p>
<w:p><w:r><w:t>Age</w:t><w:tab/><w:t>{{age}}</w:t><w:br/><w:t>&amp; more</w:t></w:r></w:p>
<w:p/>
</w:body></w:document>"#;
        let text = document_xml_text(xml).unwrap();
        assert_eq!(text, "Name: {{name}}\n\nAge\t{{age}}\n& more\n\n\n\n");
    }

    #[test]
    fn xml_deleted_text_is_skipped() {
        let xml = br#"<w:body><w:p><w:del><w:r><w:delText>old</w:delText></w:r></w:del><w:r><w:t>new</w:t></w:r></w:p></w:body>"#;
        assert_eq!(document_xml_text(xml).unwrap(), "new\n\n");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = document_xml_text(b"<w:p><w:t>x</w:p>").unwrap_err();
        assert!(err.contains("malformed"), "got: {err}");
    }

    #[tokio::test]
    async fn docx_template_extracted() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>Nombre: {{name}}</w:t></w:r></w:p><w:p><w:r><w:t>Edad: {{age}}</w:t></w:r></w:p>",
        );
        let doc = TemplateDocument::new(bytes, DOCX_MEDIA_TYPE);
        let text = DocumentExtractor::default()
            .extract_template(&doc)
            .await
            .unwrap();
        assert_eq!(text.as_str(), "Nombre: {{name}}\n\nEdad: {{age}}\n\n");
    }

    #[tokio::test]
    async fn zip_without_document_xml_fails() {
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        zip.start_file("readme.txt", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"hi").unwrap();
        zip.finish().unwrap();

        let doc = TemplateDocument::new(buffer.into_inner(), DOCX_MEDIA_TYPE);
        let err = DocumentExtractor::default()
            .extract_template(&doc)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::ExtractionFailure);
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[tokio::test]
    async fn legacy_doc_template_rejected() {
        let doc = TemplateDocument::new(vec![0xD0, 0xCF, 0x11, 0xE0], "application/msword");
        let err = DocumentExtractor::default()
            .extract_template(&doc)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::ExtractionFailure);
    }

    #[tokio::test]
    async fn text_template_passthrough() {
        let doc = TemplateDocument::new("Name: {{name}}".as_bytes(), TEXT_MEDIA_TYPE);
        let text = DocumentExtractor::default()
            .extract_template(&doc)
            .await
            .unwrap();
        assert_eq!(text.as_str(), "Name: {{name}}");
    }

    #[tokio::test]
    async fn non_pdf_source_rejected_before_pdfium() {
        let doc = SourceDocument::new(b"GIF89a".to_vec(), "image/gif");
        let err = DocumentExtractor::default()
            .extract_source(&doc)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::ExtractionFailure);
        assert!(err.to_string().contains("image/gif"));
    }
}
