//! Storage module for book objects
//!
//! Uploaded PDFs and extracted text live in an object store: an
//! S3-compatible backend (MinIO, Cloudflare R2, Backblaze B2, AWS S3)
//! or the local filesystem.

mod backend;
mod s3_client;
mod types;

pub use backend::{ObjectStore, StorageBackend};
pub use s3_client::S3Client;
pub use types::*;

/// Key of the uploaded PDF for a book
pub fn pdf_key(book_id: &str) -> String {
    format!("pdfs/{}.pdf", book_id)
}

/// Key of the extracted text for a book
pub fn text_key(book_id: &str) -> String {
    format!("texts/{}.txt", book_id)
}
