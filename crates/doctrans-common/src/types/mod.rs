//! Common types used across doctrans

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DocTransError, Result};

/// MIME type of plain-text documents.
pub const TEXT_PLAIN_MIME: &str = "text/plain";

/// MIME type of Word-processing (OOXML) documents.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// MIME type of PDF documents.
pub const PDF_MIME: &str = "application/pdf";

// ============================================================================
// File Status
// ============================================================================

/// Lifecycle status of an uploaded document.
///
/// Transitions only move forward:
///
/// ```text
/// PENDING ──> IN_PROGRESS ──> COMPLETED
///    │              └───────> FAILED
///    └──> COMPLETED | FAILED
/// ```
///
/// `COMPLETED` and `FAILED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl FileStatus {
    /// Wire representation stored in the metadata table.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "PENDING",
            FileStatus::InProgress => "IN_PROGRESS",
            FileStatus::Completed => "COMPLETED",
            FileStatus::Failed => "FAILED",
        }
    }

    /// Whether no further transitions follow this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            FileStatus::Pending => 0,
            FileStatus::InProgress => 1,
            FileStatus::Completed | FileStatus::Failed => 2,
        }
    }

    /// Whether moving from `self` to `next` is a forward transition.
    ///
    /// Re-writing the same status is allowed so that repeated writes stay
    /// idempotent.
    pub fn can_transition_to(&self, next: FileStatus) -> bool {
        if *self == next {
            return true;
        }
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl std::str::FromStr for FileStatus {
    type Err = DocTransError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(FileStatus::Pending),
            "IN_PROGRESS" => Ok(FileStatus::InProgress),
            "COMPLETED" => Ok(FileStatus::Completed),
            "FAILED" => Ok(FileStatus::Failed),
            other => Err(DocTransError::InvalidStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Document Format
// ============================================================================

/// Document formats accepted by the ingestion handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// `.txt`, translated synchronously
    #[serde(rename = "txt")]
    PlainText,
    /// `.docx`, submitted as an asynchronous job
    Docx,
    /// `.pdf`, converted to `.docx` before submission
    Pdf,
}

impl DocumentFormat {
    /// Detect the format from an object key or file name.
    ///
    /// Matching is on the final extension, case-insensitively.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let base = base_name(name);
        let extension = base
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .ok_or_else(|| DocTransError::UnsupportedFormat(name.to_string()))?;

        match extension.as_str() {
            "txt" => Ok(DocumentFormat::PlainText),
            "docx" => Ok(DocumentFormat::Docx),
            "pdf" => Ok(DocumentFormat::Pdf),
            _ => Err(DocTransError::UnsupportedFormat(name.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::PlainText => "txt",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pdf => "pdf",
        }
    }

    /// MIME type of the document itself.
    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::PlainText => TEXT_PLAIN_MIME,
            DocumentFormat::Docx => DOCX_MIME,
            DocumentFormat::Pdf => PDF_MIME,
        }
    }

    /// Whether the translation engine accepts this format without conversion.
    pub fn is_translatable(&self) -> bool {
        matches!(self, DocumentFormat::PlainText | DocumentFormat::Docx)
    }

    /// Content type announced to the translation engine for this format.
    ///
    /// Anything that is not plain text travels as a Word document, since
    /// PDFs are converted before submission.
    pub fn translation_content_type(&self) -> &'static str {
        match self {
            DocumentFormat::PlainText => TEXT_PLAIN_MIME,
            DocumentFormat::Docx | DocumentFormat::Pdf => DOCX_MIME,
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Last path segment of an object key.
pub fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Rewrite a `.pdf` file name to the `.docx` name produced by conversion.
///
/// Other names are returned unchanged.
pub fn converted_file_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("pdf") => format!("{}.docx", stem),
        _ => file_name.to_string(),
    }
}

// ============================================================================
// File Record
// ============================================================================

/// Status record kept for every uploaded document.
///
/// Keyed by `file_id`. `job_id` is set once the translation engine accepts
/// the document and is unique across records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Opaque identifier assigned at upload time
    pub file_id: String,

    /// Original object name, without any key prefix
    pub file_name: String,

    /// Requested target language
    pub language_code: String,

    /// Current lifecycle status
    pub status: FileStatus,

    /// Translation job identifier, once submitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    /// Time of the last status write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Name of the document the translation engine produces for this file.
    pub fn translated_file_name(&self) -> String {
        converted_file_name(&self.file_name)
    }
}
