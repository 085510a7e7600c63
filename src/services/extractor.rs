//! PDF text extraction for uploaded reports.

use axum::body::Bytes;

/// PDF extraction errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The upload is not a readable PDF.
    #[error("Could not read PDF: {0}")]
    Format(String),
}

/// Extract plain text from PDF bytes, one line per page in page order.
///
/// Pages without a text layer contribute an empty line. The result is not
/// truncated.
pub fn extract_text(pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        .map_err(|e| ExtractionError::Format(e.to_string()))?;

    let mut text = String::new();
    for page in &pages {
        text.push_str(page.trim());
        text.push('\n');
    }

    tracing::debug!(pages = pages.len(), chars = text.len(), "Extracted PDF text");
    Ok(text)
}

/// Run [`extract_text`] on the blocking pool.
///
/// A panic inside the PDF parser is reported as a format error.
pub async fn extract_text_blocking(pdf_bytes: Bytes) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract_text(&pdf_bytes))
        .await
        .map_err(|e| ExtractionError::Format(format!("PDF parser aborted: {e}")))?
}
