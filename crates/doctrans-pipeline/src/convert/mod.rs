//! Format adaptation
//!
//! The translation engine accepts plain text and Word documents. Text and
//! DOCX uploads pass through untouched; PDFs are rebuilt as a DOCX holding
//! their extracted text, one paragraph per line and one page break per page.

use doctrans_common::DocumentFormat;
use thiserror::Error;
use tracing::{debug, info, instrument};

pub mod docx;
pub mod pdf;

/// Conversion errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Failed to parse PDF: {0}")]
    PdfParse(String),

    #[error("PDF contains no extractable text")]
    NoText,

    #[error("Failed to write DOCX: {0}")]
    DocxWrite(String),

    #[error("Text document is not valid UTF-8")]
    NotUtf8,
}

/// A document in a format the translation engine accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatableDocument {
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
}

/// Turns an uploaded document into a translatable one
pub trait DocumentConverter: Send + Sync {
    fn to_translatable(
        &self,
        bytes: Vec<u8>,
        format: DocumentFormat,
    ) -> Result<TranslatableDocument, ConvertError>;
}

/// [`DocumentConverter`] that rewrites PDFs as DOCX
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfToDocxConverter;

impl PdfToDocxConverter {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentConverter for PdfToDocxConverter {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    fn to_translatable(
        &self,
        bytes: Vec<u8>,
        format: DocumentFormat,
    ) -> Result<TranslatableDocument, ConvertError> {
        if format.is_translatable() {
            debug!("Format {} needs no conversion", format);
            return Ok(TranslatableDocument { bytes, format });
        }

        let pages = pdf::extract_pages(&bytes)?;
        if pages.iter().all(|page| page.trim().is_empty()) {
            return Err(ConvertError::NoText);
        }

        let docx = docx::write_docx(&pages)?;
        info!(pages = pages.len(), size = docx.len(), "Converted PDF to DOCX");

        Ok(TranslatableDocument {
            bytes: docx,
            format: DocumentFormat::Docx,
        })
    }
}
