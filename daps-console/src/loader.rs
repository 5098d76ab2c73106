//! Loading indicator that never flickers.
//!
//! Once shown, the indicator stays up for at least `min_visible`, even if the
//! work finishes sooner.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Loader {
    min_visible: Duration,
    shown_at: Option<Instant>,
    hide_at: Option<Instant>,
    pub label: String,
}

impl Loader {
    pub fn new(min_visible: Duration) -> Self {
        Loader {
            min_visible,
            shown_at: None,
            hide_at: None,
            label: String::new(),
        }
    }

    pub fn show(&mut self, label: &str) {
        self.show_at(label, Instant::now());
    }

    pub fn show_at(&mut self, label: &str, now: Instant) {
        self.shown_at = Some(now);
        self.hide_at = None;
        self.label = label.to_string();
    }

    /// How long hiding must wait: `max(0, min_visible - elapsed)`.
    pub fn hide_delay(&self, now: Instant) -> Duration {
        match self.shown_at {
            Some(at) => self
                .min_visible
                .saturating_sub(now.saturating_duration_since(at)),
            None => Duration::ZERO,
        }
    }

    /// Request hiding; the indicator disappears after [`hide_delay`](Self::hide_delay).
    pub fn hide(&mut self) {
        self.hide_at_instant(Instant::now());
    }

    pub fn hide_at_instant(&mut self, now: Instant) {
        if self.shown_at.is_some() {
            self.hide_at = Some(now + self.hide_delay(now));
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        match (self.shown_at, self.hide_at) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(hide)) => now < hide,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_work_stays_visible() {
        let mut l = Loader::new(Duration::from_millis(400));
        let t0 = Instant::now();
        l.show_at("Loading", t0);
        let done = t0 + Duration::from_millis(100);
        assert_eq!(l.hide_delay(done), Duration::from_millis(300));
        l.hide_at_instant(done);
        assert!(l.is_visible(t0 + Duration::from_millis(399)));
        assert!(!l.is_visible(t0 + Duration::from_millis(400)));
    }

    #[test]
    fn test_slow_work_hides_at_once() {
        let mut l = Loader::new(Duration::from_millis(400));
        let t0 = Instant::now();
        l.show_at("Loading", t0);
        let done = t0 + Duration::from_secs(2);
        assert_eq!(l.hide_delay(done), Duration::ZERO);
        l.hide_at_instant(done);
        assert!(!l.is_visible(done));
    }

    #[test]
    fn test_never_shown() {
        let l = Loader::new(Duration::from_millis(400));
        assert!(!l.is_visible(Instant::now()));
        assert_eq!(l.hide_delay(Instant::now()), Duration::ZERO);
    }
}
