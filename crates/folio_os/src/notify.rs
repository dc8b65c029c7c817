#![forbid(unsafe_code)]

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
}

/// Transient user-visible message (a toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Default, Clone)]
pub struct Notifier {
    queue: Vec<Notification>,
}

impl Notifier {
    pub fn success(&mut self, message: impl Into<String>) {
        self.queue.push(Notification {
            kind: NotificationKind::Success,
            title: "Success".to_string(),
            message: message.into(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.queue.push(Notification {
            kind: NotificationKind::Error,
            title: "Error".to_string(),
            message: message.into(),
        });
    }

    pub fn pending(&self) -> &[Notification] {
        &self.queue
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.queue)
    }
}
