//! tapline-se specific configuration

use std::path::PathBuf;
use std::time::Duration;

/// Scan Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind_addr: String,
}

/// Timing and framing parameters for the scan pipeline
///
/// Values are database-first: loaded from the settings table at startup with
/// write-back defaults (see db::settings::load_scan_tuning).
#[derive(Debug, Clone)]
pub struct ScanTuning {
    /// Minimum cleaned-identifier length accepted by the normalizer
    pub min_identifier_len: usize,
    /// Zero-pad width used by the pad normalization tier
    pub identifier_frame_width: usize,
    /// Inter-keystroke silence that flushes the HID buffer
    pub keystroke_gap: Duration,
    /// Window within which a repeated identical scan is reader chatter
    pub dedup_window: Duration,
    /// Upper bound on waiting for a cold roster cache
    pub roster_wait_timeout: Duration,
    /// Poll increment while waiting for the roster cache
    pub roster_poll_interval: Duration,
    /// How often the background loader re-reads rosters from the store
    pub roster_refresh_interval: Duration,
    /// Operator notice lifetime after a successful tap
    pub notice_success_ttl: Duration,
    /// Operator notice lifetime after a failed tap
    pub notice_failure_ttl: Duration,
}

impl Default for ScanTuning {
    fn default() -> Self {
        Self {
            min_identifier_len: 4,
            identifier_frame_width: 10,
            keystroke_gap: Duration::from_millis(500),
            dedup_window: Duration::from_millis(3000),
            roster_wait_timeout: Duration::from_millis(3000),
            roster_poll_interval: Duration::from_millis(100),
            roster_refresh_interval: Duration::from_secs(30),
            notice_success_ttl: Duration::from_millis(3000),
            notice_failure_ttl: Duration::from_millis(5000),
        }
    }
}
