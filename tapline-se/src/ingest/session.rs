//! Per-reader-stream scan session
//!
//! One session owns the frame assembler and debounce state for a single
//! (site, device) input stream; it replaces the module-level "last processed
//! card" globals of older kiosk builds with state the engine constructs and
//! tears down explicitly.
//!
//! The actor serializes keystroke handling and timer flushes for its stream,
//! but pipeline runs are spawned off so a slow store write never blocks the
//! reader. Admission control for those runs lives in the coalescer.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use tapline_common::events::{ReaderKind, ScanEvent};

use super::coalescer::{Coalescer, DropReason};
use super::engine::ScanEngine;
use super::normalizer::HidFrameAssembler;

/// How long an idle session sleeps when no flush deadline is armed
const IDLE_PARK: Duration = Duration::from_secs(3600);

/// Raw input delivered to a session
#[derive(Debug)]
pub enum SessionInput {
    /// One HID key event (character or named key)
    Key(String),
    /// One decoded NFC payload
    Nfc(String),
}

/// Handle for delivering input to a running session
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionInput>,
}

impl SessionHandle {
    /// Deliver input; false if the session has shut down
    pub fn send(&self, input: SessionInput) -> bool {
        self.tx.send(input).is_ok()
    }
}

/// Spawn the session actor for one reader stream
pub fn spawn_session(engine: Arc<ScanEngine>, site_id: String, device_id: String) -> SessionHandle {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let tuning = engine.tuning().clone();

    tokio::spawn(async move {
        let mut assembler =
            HidFrameAssembler::new(tuning.min_identifier_len, tuning.keystroke_gap);
        let coalescer = Coalescer::new(tuning.dedup_window);

        info!("Scan session started for {}/{}", site_id, device_id);

        loop {
            let deadline = assembler.flush_deadline();
            let wake = deadline.unwrap_or_else(|| Instant::now() + IDLE_PARK);

            tokio::select! {
                input = rx.recv() => {
                    match input {
                        None => break,
                        Some(SessionInput::Key(key)) => {
                            if let Some(identifier) = assembler.push_key(&key, Instant::now()) {
                                dispatch(&engine, &coalescer, &site_id, &device_id, identifier, ReaderKind::Hid);
                            }
                        }
                        Some(SessionInput::Nfc(uid)) => {
                            // NFC payloads arrive pre-framed; no assembly
                            dispatch(&engine, &coalescer, &site_id, &device_id, uid, ReaderKind::Nfc);
                        }
                    }
                }
                _ = tokio::time::sleep_until(wake), if deadline.is_some() => {
                    if let Some(identifier) = assembler.flush_due(Instant::now()) {
                        dispatch(&engine, &coalescer, &site_id, &device_id, identifier, ReaderKind::Hid);
                    }
                }
            }
        }

        info!("Scan session ended for {}/{}", site_id, device_id);
    });

    SessionHandle { tx }
}

/// Admit one reconstructed scan and hand it to the pipeline
fn dispatch(
    engine: &Arc<ScanEngine>,
    coalescer: &Coalescer,
    site_id: &str,
    device_id: &str,
    raw_identifier: String,
    reader_kind: ReaderKind,
) {
    match coalescer.try_admit(&raw_identifier, Instant::now()) {
        Ok(guard) => {
            let scan = ScanEvent {
                raw_identifier,
                reader_kind,
                reader_id: device_id.to_string(),
                site_id: site_id.to_string(),
                observed_at: engine.clock_now(),
            };
            let engine = Arc::clone(engine);
            tokio::spawn(async move {
                // Guard released when the run finishes, on every path
                let _guard = guard;
                engine.process_scan(scan).await;
            });
        }
        Err(DropReason::Busy) => {
            debug!(
                "Dropped scan {} on {}/{}: resolution in flight",
                raw_identifier, site_id, device_id
            );
        }
        Err(DropReason::DuplicateTap) => {
            debug!(
                "Dropped scan {} on {}/{}: duplicate tap within window",
                raw_identifier, site_id, device_id
            );
        }
    }
}
