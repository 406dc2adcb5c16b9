//! Flash Reader Server Library
//!
//! This crate exposes the application modules for integration tests and
//! benchmarks. The main server binary is in main.rs.
//!
//! # Modules
//!
//! - `ingest`: PDF text extraction, normalization, and tokenization
//! - `playback`: Timed word-by-word playback engine and session actors
//! - `routes`: HTTP API handlers
//! - `storage`: Object storage backends (S3-compatible and local)

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod playback;
pub mod routes;
pub mod state;
pub mod storage;
