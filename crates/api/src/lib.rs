//! Axum-based HTTP surface for oraclefeed.
//!
//! This crate provides:
//! - `GET /new-report` - Retained value reports, oldest first
//! - `GET /tip-added` - Retained tips, oldest first
//! - `POST /webhook/new-report` - Push delivery of a `NewReport` log
//! - `POST /webhook/tip-added` - Push delivery of a `TipAdded` log
//! - `GET /health` - Liveness probe

#![warn(missing_docs)]

/// Logging setup for the binary.
pub mod logging;
/// API server runtime and in-process app builder.
pub mod server;
