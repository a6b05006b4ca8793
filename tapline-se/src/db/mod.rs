//! Database access layer
//!
//! Provides database queries for attendance facts, roster projections,
//! device registry, and settings.

pub mod attendance;
pub mod devices;
pub mod init;
pub mod roster;
pub mod settings;
