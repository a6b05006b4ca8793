//! Transient operator notices
//!
//! Local, process-scoped feedback surface for the point of scan, independent
//! of the SSE fan-out. Success notices expire after ~3s, failure notices
//! after ~5s; expired notices are pruned whenever the board is read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tapline_common::Clock;

/// Outcome class of a notice, drives display styling at the kiosk
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    Success,
    Failure,
}

/// One transient operator notice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub site_id: String,
    pub severity: NoticeSeverity,
    pub text: String,
    pub posted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Auto-expiring notice store
#[derive(Clone)]
pub struct NoticeBoard {
    notices: Arc<Mutex<Vec<Notice>>>,
    clock: Arc<dyn Clock>,
}

impl NoticeBoard {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            notices: Arc::new(Mutex::new(Vec::new())),
            clock,
        }
    }

    /// Post a notice that expires `ttl` from now
    pub fn post(&self, site_id: &str, severity: NoticeSeverity, text: String, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = now + chrono::Duration::milliseconds(ttl.as_millis() as i64);

        let mut notices = self.notices.lock().expect("notice board lock poisoned");
        notices.push(Notice {
            site_id: site_id.to_string(),
            severity,
            text,
            posted_at: now,
            expires_at,
        });
    }

    /// Active (unexpired) notices for a site, oldest first
    pub fn active(&self, site_id: &str) -> Vec<Notice> {
        let now = self.clock.now();
        let mut notices = self.notices.lock().expect("notice board lock poisoned");
        notices.retain(|n| n.expires_at > now);
        notices
            .iter()
            .filter(|n| n.site_id == site_id)
            .cloned()
            .collect()
    }
}
