//! Fire-and-forget event sink.
//!
//! Publishing never blocks and never fails the emitting operation; delivery
//! is best effort by contract.

use crate::domain::notification::NotificationEvent;

/// Accepts lifecycle events for asynchronous inbox delivery.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync {
    fn publish(&self, event: NotificationEvent);
}

/// Sink that discards every event. Used where delivery is not wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotificationSink;

impl NotificationSink for NoopNotificationSink {
    fn publish(&self, _event: NotificationEvent) {}
}
