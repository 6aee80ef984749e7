//! File Ingestion — validate an uploaded résumé and encode it as a data URL.
//!
//! Both input paths (file picker and drag-and-drop) go through [`ingest`], so
//! validation and encoding can never diverge between them. Ingestion never
//! touches session state; the caller applies the result.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::tuning::PDF_MIME_TYPE;

/// How the file reached us. Recorded for diagnostics only; it never changes validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadSource {
    #[default]
    Picker,
    Drop,
}

impl std::str::FromStr for UploadSource {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "picker" => Ok(UploadSource::Picker),
            "drop" | "drag_and_drop" => Ok(UploadSource::Drop),
            other => Err(IngestError::UnknownSource(other.to_string())),
        }
    }
}

/// A file as offered by the client, before validation.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub file_name: Option<String>,
    /// Declared content type, exactly as sent by the client.
    pub content_type: Option<String>,
    pub bytes: bytes::Bytes,
}

/// Opaque handle describing an accepted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHandle {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: usize,
    pub source: UploadSource,
}

#[derive(Debug, Clone)]
pub struct IngestedFile {
    pub handle: FileHandle,
    pub data_url: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("Please upload a valid PDF file.")]
    UnsupportedType { declared: Option<String> },

    #[error("The uploaded file is empty.")]
    Empty,

    #[error("The uploaded file is larger than {limit} bytes.")]
    TooLarge { size: usize, limit: usize },

    #[error("Unknown upload source '{0}'.")]
    UnknownSource(String),
}

/// Validates and encodes a candidate résumé.
///
/// The declared content type must be exactly `application/pdf`; file extensions and
/// content sniffing play no part.
pub fn ingest(
    candidate: CandidateFile,
    source: UploadSource,
    max_bytes: usize,
) -> Result<IngestedFile, IngestError> {
    let declared = candidate.content_type.as_deref();
    if declared != Some(PDF_MIME_TYPE) {
        info!(
            "Rejected upload {:?} via {:?}: declared type {:?}",
            candidate.file_name, source, declared
        );
        return Err(IngestError::UnsupportedType {
            declared: candidate.content_type,
        });
    }

    let size = candidate.bytes.len();
    if size == 0 {
        return Err(IngestError::Empty);
    }
    if size > max_bytes {
        return Err(IngestError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let data_url = encode_data_url(PDF_MIME_TYPE, &candidate.bytes);
    debug!("Encoded {} bytes into a {} char data URL", size, data_url.len());

    Ok(IngestedFile {
        handle: FileHandle {
            file_name: candidate
                .file_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "resume.pdf".to_string()),
            content_type: PDF_MIME_TYPE.to_string(),
            size_bytes: size,
            source,
        },
        data_url,
    })
}

pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::strip_data_url_prefix;

    const LIMIT: usize = 10 * 1024 * 1024;

    fn candidate(content_type: Option<&str>, bytes: &'static [u8]) -> CandidateFile {
        CandidateFile {
            file_name: Some("resume.pdf".to_string()),
            content_type: content_type.map(String::from),
            bytes: bytes::Bytes::from_static(bytes),
        }
    }

    #[test]
    fn test_rejects_non_pdf_types() {
        for declared in [
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            Some("text/plain"),
            Some("application/PDF"),
            Some("application/pdf; charset=binary"),
            Some("application/x-pdf"),
            None,
        ] {
            let err = ingest(candidate(declared, b"%PDF-1.4"), UploadSource::Picker, LIMIT)
                .unwrap_err();
            assert!(
                matches!(err, IngestError::UnsupportedType { .. }),
                "declared {declared:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_encoded_payload_round_trips() {
        let bytes: &'static [u8] = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n1 0 obj\n<<>>\nendobj\n%%EOF";
        let ingested = ingest(
            candidate(Some("application/pdf"), bytes),
            UploadSource::Drop,
            LIMIT,
        )
        .unwrap();

        assert!(ingested.data_url.starts_with("data:application/pdf;base64,"));
        let decoded = BASE64
            .decode(strip_data_url_prefix(&ingested.data_url))
            .unwrap();
        assert_eq!(decoded, bytes);
        assert_eq!(ingested.handle.size_bytes, bytes.len());
        assert_eq!(ingested.handle.source, UploadSource::Drop);
    }

    #[test]
    fn test_both_sources_encode_identically() {
        let picked = ingest(
            candidate(Some("application/pdf"), b"%PDF-1.7"),
            UploadSource::Picker,
            LIMIT,
        )
        .unwrap();
        let dropped = ingest(
            candidate(Some("application/pdf"), b"%PDF-1.7"),
            UploadSource::Drop,
            LIMIT,
        )
        .unwrap();
        assert_eq!(picked.data_url, dropped.data_url);
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        assert_eq!(
            ingest(candidate(Some("application/pdf"), b""), UploadSource::Picker, LIMIT)
                .unwrap_err(),
            IngestError::Empty
        );
        assert_eq!(
            ingest(candidate(Some("application/pdf"), b"%PDF-1.4"), UploadSource::Picker, 4)
                .unwrap_err(),
            IngestError::TooLarge { size: 8, limit: 4 }
        );
    }

    #[test]
    fn test_missing_file_name_gets_default() {
        let mut file = candidate(Some("application/pdf"), b"%PDF");
        file.file_name = None;
        let ingested = ingest(file, UploadSource::Picker, LIMIT).unwrap();
        assert_eq!(ingested.handle.file_name, "resume.pdf");
    }

    #[test]
    fn test_upload_source_parsing() {
        assert_eq!("drop".parse::<UploadSource>().unwrap(), UploadSource::Drop);
        assert_eq!("".parse::<UploadSource>().unwrap(), UploadSource::Picker);
        assert!("paste".parse::<UploadSource>().is_err());
    }
}
