//! Scan engine
//!
//! Owns the shared pieces of the ingestion path (roster cache, recorder,
//! broadcaster, notice board, session map) and runs the
//! resolve -> record -> broadcast pipeline for admitted scans.
//!
//! Every resolution or write failure is converted into a failure broadcast
//! at this boundary; nothing propagates far enough to kill the reader
//! listeners, which stay up around the clock.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use sqlx::{Pool, Sqlite};
use tapline_common::events::{ScanEvent, TaplineEvent};
use tapline_common::Clock;

use crate::config::ScanTuning;
use crate::db;
use crate::error::{Error, Result};
use crate::notice::{NoticeBoard, NoticeSeverity};
use crate::roster::{self, RosterCache};
use crate::sse::EventBroadcaster;

use super::recorder::{AttendanceRecorder, RecordOutcome};
use super::resolver::{CandidateMatch, Resolver};
use super::session::{self, SessionHandle, SessionInput};

pub struct ScanEngine {
    db: Pool<Sqlite>,
    tuning: ScanTuning,
    clock: Arc<dyn Clock>,
    roster: RosterCache,
    resolver: Resolver,
    recorder: AttendanceRecorder,
    broadcaster: EventBroadcaster,
    notices: NoticeBoard,
    sessions: RwLock<HashMap<String, SessionHandle>>,
    refresher: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ScanEngine {
    /// Create the engine: warm the roster cache and start its refresher
    pub async fn new(
        db: Pool<Sqlite>,
        tuning: ScanTuning,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>> {
        let roster = RosterCache::new();
        roster.refresh_all(&db).await?;

        let resolver = Resolver::new(
            roster.clone(),
            tuning.identifier_frame_width,
            tuning.roster_wait_timeout,
            tuning.roster_poll_interval,
        );
        let recorder = AttendanceRecorder::new(db.clone(), tuning.dedup_window, clock.clone());
        let broadcaster = EventBroadcaster::new(100);
        let notices = NoticeBoard::new(clock.clone());

        let engine = Arc::new(Self {
            db: db.clone(),
            tuning: tuning.clone(),
            clock,
            roster: roster.clone(),
            resolver,
            recorder,
            broadcaster,
            notices,
            sessions: RwLock::new(HashMap::new()),
            refresher: std::sync::Mutex::new(None),
        });

        let handle = roster::spawn_refresher(roster, db, tuning.roster_refresh_interval);
        *engine.refresher.lock().expect("refresher lock poisoned") = Some(handle);

        Ok(engine)
    }

    pub fn tuning(&self) -> &ScanTuning {
        &self.tuning
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn roster(&self) -> &RosterCache {
        &self.roster
    }

    pub fn clock_now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Deliver one HID key event from a reader stream
    pub async fn ingest_key(self: &Arc<Self>, site_id: &str, device_id: &str, key: &str) {
        self.deliver(site_id, device_id, SessionInput::Key(key.to_string()))
            .await;
    }

    /// Deliver one decoded NFC payload from a reader stream
    pub async fn ingest_nfc(self: &Arc<Self>, site_id: &str, device_id: &str, uid: &str) {
        self.deliver(site_id, device_id, SessionInput::Nfc(uid.to_string()))
            .await;
    }

    async fn deliver(self: &Arc<Self>, site_id: &str, device_id: &str, input: SessionInput) {
        let handle = self.session_handle(site_id, device_id).await;
        if !handle.send(input) {
            warn!(
                "Scan session for {}/{} was gone; input dropped",
                site_id, device_id
            );
            // Forget the dead handle so the next input respawns the session
            let mut sessions = self.sessions.write().await;
            sessions.remove(&session_key(site_id, device_id));
        }
    }

    async fn session_handle(self: &Arc<Self>, site_id: &str, device_id: &str) -> SessionHandle {
        let key = session_key(site_id, device_id);

        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(&key) {
                return handle.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        // Double-check under the write lock
        if let Some(handle) = sessions.get(&key) {
            return handle.clone();
        }

        let handle = session::spawn_session(
            Arc::clone(self),
            site_id.to_string(),
            device_id.to_string(),
        );
        sessions.insert(key, handle.clone());
        handle
    }

    /// Run the full pipeline for one admitted scan
    ///
    /// Infallible from the caller's point of view: outcomes, including
    /// failures, come out as broadcasts and notices.
    pub async fn process_scan(&self, scan: ScanEvent) {
        match self.run_pipeline(&scan).await {
            Ok((candidate, outcome)) => {
                if matches!(outcome, RecordOutcome::DuplicateSuppressed) {
                    debug!(
                        "Tap for {} at {} acknowledged without a new fact",
                        candidate.person.person_id(),
                        scan.site_id
                    );
                }

                let person_name = candidate.person.display_name().to_string();
                self.notices.post(
                    &scan.site_id,
                    NoticeSeverity::Success,
                    format!("{} is present", person_name),
                    self.tuning.notice_success_ttl,
                );
                self.broadcaster.broadcast_lossy(TaplineEvent::AttendanceSuccess {
                    person_name,
                    person_type: candidate.person.person_type(),
                    site_id: scan.site_id.clone(),
                    timestamp: self.clock.now(),
                });
            }
            Err(e) => {
                let reason = failure_reason(&e);
                warn!(
                    "Scan {} at {} failed: {}",
                    scan.raw_identifier, scan.site_id, e
                );
                self.notices.post(
                    &scan.site_id,
                    NoticeSeverity::Failure,
                    reason.clone(),
                    self.tuning.notice_failure_ttl,
                );
                self.broadcaster.broadcast_lossy(TaplineEvent::AttendanceFailure {
                    reason,
                    site_id: scan.site_id.clone(),
                    timestamp: self.clock.now(),
                });
            }
        }
    }

    async fn run_pipeline(&self, scan: &ScanEvent) -> Result<(CandidateMatch, RecordOutcome)> {
        let candidate = self
            .resolver
            .resolve(&scan.site_id, &scan.raw_identifier)
            .await?;

        let device_label = db::devices::get_device_label(&self.db, &scan.reader_id)
            .await?
            .unwrap_or_else(|| scan.reader_id.clone());

        let outcome = self
            .recorder
            .record(&candidate.person, scan, &device_label)
            .await?;

        Ok((candidate, outcome))
    }

    /// Tear down sessions and the roster refresher
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.write().await;
        sessions.clear();

        if let Some(handle) = self
            .refresher
            .lock()
            .expect("refresher lock poisoned")
            .take()
        {
            handle.abort();
        }
    }
}

fn session_key(site_id: &str, device_id: &str) -> String {
    format!("{}/{}", site_id, device_id)
}

/// Human-readable reason for the failure broadcast
fn failure_reason(error: &Error) -> String {
    match error {
        Error::UnrecognizedCard => "unrecognized card".to_string(),
        Error::RosterUnavailable(site_id) => {
            format!("roster for {} is not available", site_id)
        }
        Error::Database(e) => format!("attendance write failed: {}", e),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::time::Duration;
    use tapline_common::SystemClock;

    /// Short windows so tests drive the real timers with small sleeps
    fn test_tuning() -> ScanTuning {
        ScanTuning {
            min_identifier_len: 4,
            identifier_frame_width: 10,
            keystroke_gap: Duration::from_millis(40),
            dedup_window: Duration::from_millis(150),
            roster_wait_timeout: Duration::from_millis(300),
            roster_poll_interval: Duration::from_millis(20),
            roster_refresh_interval: Duration::from_secs(60),
            notice_success_ttl: Duration::from_millis(3000),
            notice_failure_ttl: Duration::from_millis(5000),
        }
    }

    async fn setup_engine() -> Arc<ScanEngine> {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init::init_schema(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO students (person_id, display_name, site_id, card_identifier, secondary_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind("stu-1")
        .bind("Mia Park")
        .bind("site-a")
        .bind("3680715012")
        .bind("S2201")
        .execute(&pool)
        .await
        .unwrap();

        ScanEngine::new(pool, test_tuning(), Arc::new(SystemClock))
            .await
            .unwrap()
    }

    fn scan(raw: &str) -> ScanEvent {
        ScanEvent {
            raw_identifier: raw.to_string(),
            reader_kind: tapline_common::events::ReaderKind::Nfc,
            reader_id: "front-desk-1".to_string(),
            site_id: "site-a".to_string(),
            observed_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_process_scan_success_broadcast_and_notice() {
        let engine = setup_engine().await;
        let mut rx = engine.broadcaster().subscribe();

        engine.process_scan(scan("3680715012")).await;

        let event = rx.recv().await.unwrap();
        match event {
            TaplineEvent::AttendanceSuccess {
                person_name,
                site_id,
                ..
            } => {
                assert_eq!(person_name, "Mia Park");
                assert_eq!(site_id, "site-a");
            }
            other => panic!("expected success event, got {:?}", other),
        }

        let notices = engine.notices().active("site-a");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].text, "Mia Park is present");

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_process_scan_no_match_failure_broadcast() {
        let engine = setup_engine().await;
        let mut rx = engine.broadcaster().subscribe();

        engine.process_scan(scan("9999999999")).await;

        let event = rx.recv().await.unwrap();
        match event {
            TaplineEvent::AttendanceFailure { reason, .. } => {
                assert_eq!(reason, "unrecognized card");
            }
            other => panic!("expected failure event, got {:?}", other),
        }

        engine.shutdown().await;
    }
}
