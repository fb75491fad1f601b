//! Result assembly: wrap translated content into a downloadable document.

use crate::config::ArtifactFormat;
use crate::document::{DOCX_MEDIA_TYPE, TEXT_MEDIA_TYPE};
use crate::error::IntegrationError;
use crate::output::{Artifact, IntegrationResult};
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

/// Package `result` as an [`Artifact`] named `suggested_name`.
///
/// Empty content is never packaged: it fails with an assembly error.
pub fn assemble(
    result: &IntegrationResult,
    suggested_name: &str,
    format: ArtifactFormat,
) -> Result<Artifact, IntegrationError> {
    let content = &result.translated_content;
    if content.is_empty() {
        return Err(IntegrationError::Assembly(
            "translated content is empty".into(),
        ));
    }

    let (bytes, media_type) = match format {
        ArtifactFormat::Docx => (docx_package(content)?, DOCX_MEDIA_TYPE),
        ArtifactFormat::PlainText => (content.as_bytes().to_vec(), TEXT_MEDIA_TYPE),
    };
    debug!("Assembled {} ({} bytes)", suggested_name, bytes.len());

    Ok(Artifact {
        content: content.clone(),
        bytes,
        media_type,
        file_name: suggested_name.to_string(),
    })
}

/// Suggested download name for an artifact.
///
/// `<prefix>_<template stem>_<language>.<ext>`, where the language is
/// trimmed and lower-cased (`translated` when blank). Without a usable
/// template name: `<prefix>_Translated_Document.<ext>`.
pub fn suggested_file_name(
    template_name: Option<&str>,
    target_language: &str,
    prefix: &str,
    format: ArtifactFormat,
) -> String {
    let ext = format.extension();
    let stem = template_name
        .and_then(|name| Path::new(name).file_stem())
        .map(|s| s.to_string_lossy().trim().to_string())
        .filter(|s| !s.is_empty());

    match stem {
        Some(stem) => {
            let language = target_language.trim().to_lowercase();
            let language = if language.is_empty() {
                "translated".to_string()
            } else {
                language.replace(['/', '\\'], "_")
            };
            format!("{prefix}_{stem}_{language}.{ext}")
        }
        None => format!("{prefix}_Translated_Document.{ext}"),
    }
}

/// A minimal WordprocessingML package, one paragraph per line.
fn docx_package(content: &str) -> Result<Vec<u8>, IntegrationError> {
    let pack = |e: &dyn std::fmt::Display| IntegrationError::Assembly(format!("docx packaging: {}", e));

    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", ROOT_RELS_XML.to_string()),
        ("word/document.xml", document_xml(content)),
    ];
    for (path, xml) in parts {
        zip.start_file(path, options).map_err(|e| pack(&e))?;
        zip.write_all(xml.as_bytes()).map_err(|e| pack(&e))?;
    }
    zip.finish().map_err(|e| pack(&e))?;

    Ok(buffer.into_inner())
}

fn document_xml(content: &str) -> String {
    let mut body = String::with_capacity(content.len() * 2);
    for line in content.lines() {
        if line.trim().is_empty() {
            body.push_str("<w:p/>");
            continue;
        }
        body.push_str("<w:p><w:r>");
        for (i, piece) in line.split('\t').enumerate() {
            if i > 0 {
                body.push_str("<w:tab/>");
            }
            if !piece.is_empty() {
                let clean: String = piece.chars().filter(|c| !c.is_control()).collect();
                body.push_str(r#"<w:t xml:space="preserve">"#);
                body.push_str(&escape(clean.as_str()));
                body.push_str("</w:t>");
            }
        }
        body.push_str("</w:r></w:p>");
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    )
}
