//! PDF text extraction
//!
//! Extraction is CPU-bound and runs on the blocking pool so it never
//! stalls the request executor. A PDF that parses but yields only
//! whitespace is reported as `NoText` rather than stored as an empty
//! book.

use super::IngestError;

/// Extract the raw text layer from an in-memory PDF.
pub async fn extract_text(data: Vec<u8>) -> Result<String, IngestError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
        .await
        .map_err(|e| IngestError::ExtractionFailed(format!("extraction task panicked: {}", e)))?
        .map_err(|e| IngestError::ExtractionFailed(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(IngestError::NoText);
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a one-page PDF with `text` drawn in Helvetica, computing
    /// the cross-reference table offsets as the body is assembled.
    pub(crate) fn minimal_pdf(text: &str) -> Vec<u8> {
        let stream = format!("BT /F1 24 Tf 72 720 Td ({}) Tj ET", text);
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
            format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream),
        ];

        let mut pdf = String::from("%PDF-1.4\n");
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
        }

        let xref_at = pdf.len();
        pdf.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
        pdf.push_str("0000000000 65535 f \n");
        for offset in &offsets {
            pdf.push_str(&format!("{:010} 00000 n \n", offset));
        }
        pdf.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        ));

        pdf.into_bytes()
    }

    #[tokio::test]
    async fn test_extracts_text_from_simple_pdf() {
        let text = extract_text(minimal_pdf("Hello world")).await.unwrap();
        assert!(text.contains("Hello"), "extracted: {:?}", text);
        assert!(text.contains("world"), "extracted: {:?}", text);
    }

    #[tokio::test]
    async fn test_rejects_non_pdf_bytes() {
        let err = extract_text(b"this is not a pdf".to_vec()).await.unwrap_err();
        assert!(matches!(err, IngestError::ExtractionFailed(_)));
    }

    #[tokio::test]
    async fn test_rejects_pdf_without_text() {
        let err = extract_text(minimal_pdf("")).await.unwrap_err();
        assert!(matches!(err, IngestError::NoText));
    }
}
