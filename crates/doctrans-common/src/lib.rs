//! doctrans Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging and error handling for the doctrans workspace.
//!
//! # Overview
//!
//! - **Types**: the file record tracked for every uploaded document, its
//!   status lifecycle and the document formats the pipeline accepts
//! - **Error Handling**: parse and validation errors for those types
//! - **Logging**: `tracing` subscriber setup shared by every handler binary
//!
//! # Example
//!
//! ```no_run
//! use doctrans_common::types::{DocumentFormat, FileStatus};
//!
//! let format = DocumentFormat::from_file_name("report.pdf")?;
//! assert_eq!(format, DocumentFormat::Pdf);
//! assert!(FileStatus::Completed.is_terminal());
//! # Ok::<(), doctrans_common::DocTransError>(())
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{DocTransError, Result};
pub use types::{DocumentFormat, FileRecord, FileStatus};
