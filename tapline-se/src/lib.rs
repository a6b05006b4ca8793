//! # Tapline Scan Engine Library (tapline-se)
//!
//! Card-scan ingestion and attendance-resolution engine.
//!
//! **Purpose:** Reconstruct discrete card taps from heterogeneous reader
//! input, resolve each tap to exactly one person scoped to a site, persist
//! the attendance fact at most once per tap, and fan the outcome out to
//! real-time subscribers.
//!
//! **Architecture:** Per-reader-stream session actors feeding a shared
//! resolve/record pipeline, with SQLite persistence and SSE fan-out.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod notice;
pub mod roster;
pub mod sse;

pub use config::{Config, ScanTuning};
pub use error::{Error, Result};
pub use ingest::ScanEngine;
