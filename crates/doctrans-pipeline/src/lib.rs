//! doctrans Pipeline Library
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//!
//! Upload-triggered document translation on AWS Lambda.
//!
//! # Overview
//!
//! - **Upload URLs**: issue a file id, record it as PENDING and sign a PUT
//!   carrying the id and target language as object metadata
//! - **Ingestion**: on upload, translate plain text inline, or stage the
//!   document (converting PDFs to DOCX) and submit an Amazon Translate job
//! - **Completion**: on job state change, settle the file record once, sign
//!   a download link and notify by email
//!
//! # Architecture
//!
//! Each entry point lives in [`handlers`] and receives a [`PipelineContext`]
//! holding one trait object per external collaborator:
//!
//! | Trait | Production implementation |
//! |-------|---------------------------|
//! | [`metadata::MetadataStore`] | DynamoDB table with a `jobId` index |
//! | [`storage::ObjectStore`] | S3 |
//! | [`translate::TranslationEngine`] | Amazon Translate |
//! | [`notify::Notifier`] | SMTP relay (SES) |
//! | [`convert::DocumentConverter`] | lopdf text extraction + DOCX writer |
//!
//! Handlers never propagate errors; they answer with a
//! [`handlers::HandlerResponse`].
//!
//! # Example
//!
//! ```no_run
//! use doctrans_pipeline::{handlers, PipelineContext};
//!
//! # async fn run(event: aws_lambda_events::event::s3::S3Event) -> anyhow::Result<()> {
//! let ctx = PipelineContext::from_env().await?;
//! let response = handlers::handle_object_created(&ctx, event).await;
//! println!("{}", response.status_code);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod convert;
pub mod error;
pub mod events;
pub mod handlers;
pub mod metadata;
pub mod notify;
pub mod storage;
pub mod translate;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::{PipelineError, PipelineResult};
