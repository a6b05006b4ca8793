//! Raw input normalizer
//!
//! HID keyboard-emulation readers deliver one physical tap as a burst of
//! character key events terminated either by Enter or by inter-keystroke
//! silence. The assembler reconstructs the identifier from that burst; NFC
//! payloads arrive already framed and skip it entirely.
//!
//! The assembler is a pure state machine over caller-supplied instants: the
//! owning session feeds it key events and arms exactly one flush timer from
//! `flush_deadline`, so the timeout path and the Enter path can never both
//! fire for the same buffer.

use std::time::Duration;
use tokio::time::Instant;

use tapline_common::ident::clean_digits;

const TERMINATOR_KEY: &str = "Enter";

/// Reassembles discrete identifiers from a HID keystroke stream
#[derive(Debug)]
pub struct HidFrameAssembler {
    buffer: String,
    last_key_at: Option<Instant>,
    min_identifier_len: usize,
    keystroke_gap: Duration,
}

impl HidFrameAssembler {
    pub fn new(min_identifier_len: usize, keystroke_gap: Duration) -> Self {
        Self {
            buffer: String::new(),
            last_key_at: None,
            min_identifier_len,
            keystroke_gap,
        }
    }

    /// Feed one key event; returns a cleaned identifier when a frame closes
    ///
    /// Enter closes the current buffer immediately. Multi-character keys
    /// (Shift, F5, ...) are ignored and neither extend nor reset the buffer.
    /// A character arriving after the silence gap starts a fresh buffer; the
    /// stale partial is discarded, not merged.
    pub fn push_key(&mut self, key: &str, now: Instant) -> Option<String> {
        if key == TERMINATOR_KEY {
            return self.flush();
        }

        // Modifier/function keys: names longer than one character
        if key.chars().count() != 1 {
            return None;
        }

        if let Some(last) = self.last_key_at {
            if now.duration_since(last) >= self.keystroke_gap {
                self.buffer.clear();
            }
        }

        self.buffer.push_str(key);
        self.last_key_at = Some(now);
        None
    }

    /// Flush the buffer if the silence gap has elapsed since the last key
    ///
    /// Called by the session when the armed timer fires. A keystroke that
    /// arrived after the timer was armed moved the deadline, in which case
    /// this is a no-op and the session re-arms.
    pub fn flush_due(&mut self, now: Instant) -> Option<String> {
        match self.last_key_at {
            Some(last) if now.duration_since(last) >= self.keystroke_gap => self.flush(),
            _ => None,
        }
    }

    /// Instant at which the current buffer should be force-flushed
    ///
    /// None while the buffer is empty (no timer to arm). Consuming a frame
    /// clears this, which is what cancels a pending timeout when Enter wins.
    pub fn flush_deadline(&self) -> Option<Instant> {
        self.last_key_at.map(|last| last + self.keystroke_gap)
    }

    fn flush(&mut self) -> Option<String> {
        let cleaned = clean_digits(&self.buffer);
        self.buffer.clear();
        self.last_key_at = None;

        if cleaned.len() >= self.min_identifier_len {
            Some(cleaned)
        } else {
            // Too short: hardware noise, discarded silently
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> HidFrameAssembler {
        HidFrameAssembler::new(4, Duration::from_millis(500))
    }

    fn push_str(asm: &mut HidFrameAssembler, s: &str, now: Instant) {
        for c in s.chars() {
            assert!(asm.push_key(&c.to_string(), now).is_none());
        }
    }

    #[tokio::test]
    async fn test_enter_terminated_frame() {
        let mut asm = assembler();
        let t0 = Instant::now();

        push_str(&mut asm, "0003680715012", t0);
        let emitted = asm.push_key("Enter", t0);
        assert_eq!(emitted.as_deref(), Some("0003680715012"));

        // Buffer cleared and deadline cancelled after the flush
        assert!(asm.flush_deadline().is_none());
        assert!(asm.push_key("Enter", t0).is_none());
    }

    #[tokio::test]
    async fn test_timeout_flush_after_silence_gap() {
        let mut asm = assembler();
        let t0 = Instant::now();

        push_str(&mut asm, "3680715012", t0);
        let deadline = asm.flush_deadline().unwrap();
        assert_eq!(deadline, t0 + Duration::from_millis(500));

        // Before the gap: nothing due
        assert!(asm.flush_due(t0 + Duration::from_millis(499)).is_none());

        let emitted = asm.flush_due(t0 + Duration::from_millis(500));
        assert_eq!(emitted.as_deref(), Some("3680715012"));
        assert!(asm.flush_deadline().is_none());
    }

    #[tokio::test]
    async fn test_short_buffer_discarded_silently() {
        let mut asm = assembler();
        let t0 = Instant::now();

        push_str(&mut asm, "123", t0);
        assert!(asm.push_key("Enter", t0).is_none());

        // Non-digit garbage shorter than the minimum after cleaning
        push_str(&mut asm, "ab1c2", t0);
        assert!(asm.push_key("Enter", t0).is_none());
    }

    #[tokio::test]
    async fn test_non_digits_stripped_from_frame() {
        let mut asm = assembler();
        let t0 = Instant::now();

        push_str(&mut asm, "36a80b715012", t0);
        assert_eq!(asm.push_key("Enter", t0).as_deref(), Some("3680715012"));
    }

    #[tokio::test]
    async fn test_modifier_keys_ignored() {
        let mut asm = assembler();
        let t0 = Instant::now();

        push_str(&mut asm, "36", t0);
        assert!(asm.push_key("Shift", t0).is_none());
        assert!(asm.push_key("F5", t0).is_none());
        push_str(&mut asm, "80", t0);

        assert_eq!(asm.push_key("Enter", t0).as_deref(), Some("3680"));
    }

    #[tokio::test]
    async fn test_stale_partial_discarded_on_late_keystroke() {
        let mut asm = assembler();
        let t0 = Instant::now();

        push_str(&mut asm, "999", t0);

        // Next keystroke arrives after the silence gap: fresh buffer
        let t1 = t0 + Duration::from_millis(600);
        push_str(&mut asm, "3680", t1);

        assert_eq!(asm.push_key("Enter", t1).as_deref(), Some("3680"));
    }

    #[tokio::test]
    async fn test_keystroke_moves_flush_deadline() {
        let mut asm = assembler();
        let t0 = Instant::now();

        push_str(&mut asm, "36", t0);
        let t1 = t0 + Duration::from_millis(300);
        push_str(&mut asm, "80", t1);

        // Deadline follows the most recent keystroke
        assert_eq!(asm.flush_deadline().unwrap(), t1 + Duration::from_millis(500));

        // The old deadline firing is a no-op
        assert!(asm.flush_due(t0 + Duration::from_millis(500)).is_none());
        assert_eq!(
            asm.flush_due(t1 + Duration::from_millis(500)).as_deref(),
            Some("3680")
        );
    }
}
