//! Event types for the Tapline scan pipeline

use crate::person::PersonType;
use serde::{Deserialize, Serialize};

/// Which hardware protocol produced a scan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReaderKind {
    /// USB keyboard-emulation reader (keystroke burst)
    Hid,
    /// Platform NFC API (decoded payload)
    Nfc,
}

impl std::fmt::Display for ReaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderKind::Hid => write!(f, "hid"),
            ReaderKind::Nfc => write!(f, "nfc"),
        }
    }
}

/// One reconstructed physical tap
///
/// Created once per tap by the input normalizer, consumed by the identity
/// resolver, then discarded. The raw identifier is never persisted as a
/// foreign key; it must resolve to a person first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub raw_identifier: String,
    pub reader_kind: ReaderKind,
    pub reader_id: String,
    pub site_id: String,
    pub observed_at: chrono::DateTime<chrono::Utc>,
}

/// Tapline broadcast events
///
/// Fanned out to SSE subscribers as invalidation signals; consumers re-query
/// attendance-derived views rather than treating the payload as source of
/// truth. Transient, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaplineEvent {
    /// A tap resolved to a person and was acknowledged
    AttendanceSuccess {
        person_name: String,
        person_type: PersonType,
        site_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A tap could not be turned into an attendance fact
    AttendanceFailure {
        reason: String,
        site_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl TaplineEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            TaplineEvent::AttendanceSuccess { .. } => "AttendanceSuccess",
            TaplineEvent::AttendanceFailure { .. } => "AttendanceFailure",
        }
    }

    /// Site this event belongs to, for per-site subscriber filtering
    pub fn site_id(&self) -> &str {
        match self {
            TaplineEvent::AttendanceSuccess { site_id, .. } => site_id,
            TaplineEvent::AttendanceFailure { site_id, .. } => site_id,
        }
    }
}
