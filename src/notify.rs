//! Desktop notifications.
//!
//! Three fixed toasts: connecting, connected, error. A missing notification
//! daemon must never kill a signup run, so failures are logged and swallowed.

use notify_rust::Notification;
use tracing::warn;

pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn connecting(&self) {
        self.send(
            "network-wireless",
            "Cox Wifi Connecting...",
            "Attempting to connect to Cox Wifi.",
        );
    }

    pub fn connected(&self) {
        self.send(
            "network-wireless",
            "Cox Wifi Connected",
            "Wifi Connected Successfully",
        );
    }

    pub fn error(&self) {
        self.send(
            "dialog-error",
            "Error",
            "Error, Cox Wifi failed to connect, please check output.",
        );
    }

    fn send(&self, icon: &str, title: &str, body: &str) {
        if !self.enabled {
            return;
        }
        if let Err(e) = Notification::new()
            .summary(title)
            .body(body)
            .icon(icon)
            .show()
        {
            warn!("desktop notification failed: {e}");
        }
    }
}
