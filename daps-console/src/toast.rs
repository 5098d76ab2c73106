//! On-screen notifications.

use std::{
    collections::VecDeque,
    sync::Mutex,
    time::{Duration, Instant},
};

use dapsconfig::services::{Notifier, ToastKind};

const MAX_TOASTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub expires: Instant,
}

/// Queue of recent notifications; the TUI shows the live ones and the CLI
/// prints them as they arrive.
#[derive(Debug)]
pub struct ToastQueue {
    ttl: Duration,
    items: Mutex<VecDeque<Toast>>,
    echo: bool,
}

impl ToastQueue {
    pub fn new(ttl: Duration) -> Self {
        ToastQueue {
            ttl,
            items: Mutex::new(VecDeque::new()),
            echo: false,
        }
    }

    /// Also print every toast to stderr (for non-interactive commands).
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Toasts that have not expired, oldest first.
    pub fn live(&self) -> Vec<Toast> {
        let now = Instant::now();
        let Ok(mut items) = self.items.lock() else {
            return Vec::new();
        };
        items.retain(|t| t.expires > now);
        items.iter().cloned().collect()
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, kind: ToastKind, message: &str) {
        match kind {
            ToastKind::Error => warn!("toast: {message}"),
            _ => debug!("toast: {message}"),
        }
        if self.echo {
            use colored::Colorize;
            let line = match kind {
                ToastKind::Error => message.red().to_string(),
                ToastKind::Warning => message.yellow().to_string(),
                ToastKind::Success => message.green().to_string(),
                ToastKind::Info => message.to_string(),
            };
            eprintln!("{line}");
        }
        if let Ok(mut items) = self.items.lock() {
            items.push_back(Toast {
                kind,
                message: message.to_string(),
                expires: Instant::now() + self.ttl,
            });
            while items.len() > MAX_TOASTS {
                items.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_and_order() {
        let q = ToastQueue::new(Duration::from_secs(60));
        for i in 0..7 {
            q.notify(ToastKind::Info, &format!("m{i}"));
        }
        let live = q.live();
        assert_eq!(live.len(), MAX_TOASTS);
        assert_eq!(live[0].message, "m2");
        assert_eq!(live[4].message, "m6");
    }

    #[test]
    fn test_expiry() {
        let q = ToastQueue::new(Duration::ZERO);
        q.error("gone");
        assert!(q.live().is_empty());
    }
}
