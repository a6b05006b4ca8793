//! Debounce/coalescer
//!
//! Physical readers double-fire: a timeout flush and a terminator flush can
//! both observe the same keystrokes, and HID and NFC paths can be active for
//! one device at the same time. The coalescer guarantees a single physical
//! tap produces at most one downstream resolution attempt.
//!
//! State is shared between the session actor (admission) and the spawned
//! pipeline run (release on drop), so admission never blocks the reader
//! stream on a slow downstream write.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Why an event was dropped instead of admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// A resolution for this stream is still in flight
    Busy,
    /// Same raw identifier seen within the dedup window
    DuplicateTap,
}

#[derive(Debug)]
struct CoalescerState {
    processing: bool,
    last_identifier: Option<String>,
    last_admitted_at: Option<Instant>,
}

/// Per-stream admission guard for the scan pipeline
#[derive(Clone)]
pub struct Coalescer {
    state: Arc<Mutex<CoalescerState>>,
    dedup_window: Duration,
}

impl Coalescer {
    pub fn new(dedup_window: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CoalescerState {
                processing: false,
                last_identifier: None,
                last_admitted_at: None,
            })),
            dedup_window,
        }
    }

    /// Admit one scan for processing, or say why not
    ///
    /// On admission the identifier and instant are recorded and the
    /// `processing` flag is raised; the returned guard lowers it again when
    /// dropped, on every exit path of the pipeline run.
    pub fn try_admit(
        &self,
        raw_identifier: &str,
        now: Instant,
    ) -> Result<ProcessingGuard, DropReason> {
        let mut state = self.state.lock().expect("coalescer lock poisoned");

        if state.processing {
            return Err(DropReason::Busy);
        }

        let is_repeat = state.last_identifier.as_deref() == Some(raw_identifier)
            && state
                .last_admitted_at
                .is_some_and(|at| now.duration_since(at) < self.dedup_window);
        if is_repeat {
            return Err(DropReason::DuplicateTap);
        }

        state.processing = true;
        state.last_identifier = Some(raw_identifier.to_string());
        state.last_admitted_at = Some(now);

        Ok(ProcessingGuard {
            state: Arc::clone(&self.state),
        })
    }
}

/// RAII release of the `processing` flag
///
/// Held across the pipeline run; dropping it (normal return, error return,
/// or unwind) re-opens the stream for the next distinct tap.
pub struct ProcessingGuard {
    state: Arc<Mutex<CoalescerState>>,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        // Recover the state even if a panicking holder poisoned the lock;
        // the stream must never stay wedged shut.
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.processing = false;
    }
}
