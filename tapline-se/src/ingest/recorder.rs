//! Attendance recorder
//!
//! Turns a resolved person plus a scan into a persisted attendance fact,
//! at most once per tap. The in-memory window is a fast-path guard against
//! reader chatter; the authoritative duplicate check is the latest persisted
//! fact for the (person, site) pair. Only successful writes populate the
//! window, so a failed write can be retried by re-scanning immediately.

use crate::db::attendance::{self, AttendanceFact};
use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tapline_common::events::ScanEvent;
use tapline_common::person::Person;
use tapline_common::Clock;
use tracing::{debug, info};
use uuid::Uuid;

const STATUS_PRESENT: &str = "present";

/// In-memory map of recently accepted (person, site) pairs
#[derive(Clone)]
pub struct DedupWindow {
    entries: Arc<Mutex<HashMap<(String, String), DateTime<Utc>>>>,
    window: Duration,
}

impl DedupWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            window,
        }
    }

    fn window_chrono(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.window.as_millis() as i64)
    }

    /// Whether a fact for this pair was accepted within the window
    ///
    /// Expired entries are pruned on the way through; the map only ever
    /// holds identifiers seen in the last few seconds.
    pub fn is_recent(&self, person_id: &str, site_id: &str, now: DateTime<Utc>) -> bool {
        let window = self.window_chrono();
        let mut entries = self.entries.lock().expect("dedup window lock poisoned");
        entries.retain(|_, accepted_at| now - *accepted_at < window);
        entries.contains_key(&(person_id.to_string(), site_id.to_string()))
    }

    /// Record a successful write
    pub fn mark_accepted(&self, person_id: &str, site_id: &str, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().expect("dedup window lock poisoned");
        entries.insert((person_id.to_string(), site_id.to_string()), now);
    }
}

/// Outcome of one recording attempt
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    /// A new fact was persisted
    Recorded(AttendanceFact),
    /// The tap is acknowledged but a fact already exists within the window
    DuplicateSuppressed,
}

/// Persists attendance facts with duplicate suppression
#[derive(Clone)]
pub struct AttendanceRecorder {
    db: Pool<Sqlite>,
    window: DedupWindow,
    clock: Arc<dyn Clock>,
}

impl AttendanceRecorder {
    pub fn new(db: Pool<Sqlite>, dedup_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            window: DedupWindow::new(dedup_window),
            clock,
        }
    }

    /// Record one resolved tap
    ///
    /// Write failures propagate to the caller (for the failure broadcast)
    /// without touching the window.
    pub async fn record(
        &self,
        person: &Person,
        scan: &ScanEvent,
        device_label: &str,
    ) -> Result<RecordOutcome> {
        let person_id = person.person_id();
        let site_id = person.site_id();
        let now = self.clock.now();

        // Fast path: in-process chatter guard
        if self.window.is_recent(person_id, site_id, now) {
            debug!(
                "Suppressed duplicate tap for {} at {} (in-memory window)",
                person_id, site_id
            );
            return Ok(RecordOutcome::DuplicateSuppressed);
        }

        // Authoritative check against persisted facts
        if let Some(last) = attendance::latest_recorded_at(&self.db, person_id, site_id).await? {
            if now - last < self.window.window_chrono() {
                debug!(
                    "Suppressed duplicate tap for {} at {} (persisted fact at {})",
                    person_id, site_id, last
                );
                return Ok(RecordOutcome::DuplicateSuppressed);
            }
        }

        let fact = AttendanceFact {
            fact_id: Uuid::new_v4().to_string(),
            person_id: person_id.to_string(),
            person_type: person.person_type(),
            site_id: site_id.to_string(),
            device_id: scan.reader_id.clone(),
            device_label: device_label.to_string(),
            recorded_at: now,
            status: STATUS_PRESENT.to_string(),
        };

        attendance::insert_fact(&self.db, &fact).await?;
        self.window.mark_accepted(person_id, site_id, now);

        info!(
            "Recorded attendance for {} ({}) at {} via {}",
            person.display_name(),
            person.person_type(),
            site_id,
            scan.reader_id
        );

        Ok(RecordOutcome::Recorded(fact))
    }
}
