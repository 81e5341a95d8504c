use lopdf::Document;
use tracing::{debug, warn};

use super::ConvertError;

/// Extract the text of every page, in page order.
///
/// A page whose text cannot be decoded yields an empty string rather than
/// failing the whole document.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, ConvertError> {
    let doc = Document::load_mem(bytes).map_err(|e| ConvertError::PdfParse(e.to_string()))?;

    let mut pages = Vec::new();
    for (page_number, _) in doc.get_pages() {
        match doc.extract_text(&[page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                warn!(page = page_number, error = %e, "Failed to extract page text");
                pages.push(String::new());
            },
        }
    }

    debug!(pages = pages.len(), "Extracted PDF text");

    Ok(pages)
}
