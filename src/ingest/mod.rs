//! Text ingestion pipeline
//!
//! Turns an uploaded PDF into the plain text that playback reads from:
//! extract, normalize, count words, persist to object storage. Book rows
//! move through `pending -> processing -> completed | failed` while this
//! runs.

pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod tokenizer;

pub use extract::extract_text;
pub use normalize::normalize_text;
pub use pipeline::IngestPipeline;
pub use tokenizer::WordSequence;

use thiserror::Error;

/// Errors produced while turning a PDF into readable text
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to extract text from PDF: {0}")]
    ExtractionFailed(String),

    #[error("PDF contains no extractable text (it may be scanned or encrypted)")]
    NoText,

    #[error("Stored text for book is not valid UTF-8")]
    CorruptText,
}
