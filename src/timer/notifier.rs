use anyhow::Result;
use log::info;
use serde::Serialize;

pub const REST_NOTIFICATION_ID: &str = "rest-timer-notification";
pub const REST_NOTIFICATION_TITLE: &str = "Rest Complete";
pub const REST_NOTIFICATION_BODY: &str = "Time for your next set!";

/// A deferred local notification. Scheduling again with the same `id`
/// replaces the pending one.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub id: String,
    pub title: String,
    pub body: String,
    pub fire_in_seconds: u32,
}

impl NotificationRequest {
    pub fn rest_complete(fire_in_seconds: u32) -> Self {
        Self {
            id: REST_NOTIFICATION_ID.to_string(),
            title: REST_NOTIFICATION_TITLE.to_string(),
            body: REST_NOTIFICATION_BODY.to_string(),
            fire_in_seconds,
        }
    }
}

/// Platform notification delivery, implemented by the host.
pub trait NotificationScheduler: Send + Sync {
    fn schedule(&self, request: NotificationRequest) -> Result<()>;
    fn cancel(&self, id: &str) -> Result<()>;
}

/// Scheduler for hosts without notification support; records intent in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationScheduler for LogNotifier {
    fn schedule(&self, request: NotificationRequest) -> Result<()> {
        info!(
            "Notification {} scheduled in {}s: {}",
            request.id, request.fire_in_seconds, request.title
        );
        Ok(())
    }

    fn cancel(&self, id: &str) -> Result<()> {
        info!("Notification {id} cancelled");
        Ok(())
    }
}
