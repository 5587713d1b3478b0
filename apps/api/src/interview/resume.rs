use crate::errors::AppError;

/// Extracts plain text from an uploaded resume, dispatched on the file
/// extension. PDFs go through pdf-extract; plain text passes through.
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, AppError> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => pdf_extract::extract_text_from_mem(bytes)
            .map(|text| text.trim().to_string())
            .map_err(|e| AppError::Validation(format!("Could not read PDF resume: {e}"))),
        "txt" | "md" => Ok(String::from_utf8_lossy(bytes).trim().to_string()),
        other => Err(AppError::Validation(format!(
            "Unsupported resume format: .{other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through_trimmed() {
        let text = extract_text("resume.txt", b"  Senior Rust Engineer\n").unwrap();
        assert_eq!(text, "Senior Rust Engineer");
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        assert!(extract_text("resume.docx", b"...").is_err());
    }

    #[test]
    fn missing_extension_is_rejected() {
        assert!(extract_text("resume", b"...").is_err());
    }
}
