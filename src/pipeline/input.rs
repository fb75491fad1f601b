//! Input resolution: load a user-supplied path or URL into memory.
//!
//! Documents are small (a one-page PDF, a form template), so both local
//! files and downloads are read fully into memory; no temp files are
//! involved. The media type is taken from the file name and then corrected
//! by magic-byte sniffing.

use crate::document::{media_type_for_name, sniff_media_type};
use crate::error::IntegrationError;
use std::path::PathBuf;
use tracing::{debug, info};

/// Bytes plus the metadata needed to build a document.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub bytes: Vec<u8>,
    pub media_type: String,
    pub name: String,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a local file or download a URL.
pub async fn load_input(input: &str, timeout_secs: u64) -> Result<LoadedInput, IntegrationError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        load_local(input).await
    }
}

async fn load_local(path_str: &str) -> Result<LoadedInput, IntegrationError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => IntegrationError::PermissionDenied {
            path: path.clone(),
        },
        _ => IntegrationError::FileNotFound { path: path.clone() },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());
    let media_type = sniff_media_type(&bytes, media_type_for_name(&name));

    debug!("Loaded {} ({} bytes, {})", path.display(), bytes.len(), media_type);
    Ok(LoadedInput {
        bytes,
        media_type,
        name,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<LoadedInput, IntegrationError> {
    info!("Downloading: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| IntegrationError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let failed = |e: reqwest::Error| {
        if e.is_timeout() {
            IntegrationError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            IntegrationError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(failed)?;
    if !response.status().is_success() {
        return Err(IntegrationError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let declared = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
    let name = filename_from_url(url);
    let bytes = response.bytes().await.map_err(failed)?.to_vec();

    let declared = declared.unwrap_or_else(|| media_type_for_name(&name).to_string());
    let media_type = sniff_media_type(&bytes, &declared);

    info!("Downloaded {} bytes ({})", bytes.len(), media_type);
    Ok(LoadedInput {
        bytes,
        media_type,
        name,
    })
}

/// Last path segment of a URL if it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded".to_string()
}
