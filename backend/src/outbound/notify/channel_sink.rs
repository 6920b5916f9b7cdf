//! Channel-backed notification sink and its writer task.
//!
//! `publish` pushes onto an unbounded channel and returns immediately; a
//! spawned writer drains the channel and persists inbox rows. Losing the
//! writer degrades delivery, never the operation that emitted the event.

use std::sync::Arc;

use mockable::Clock;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

use crate::domain::notification::NotificationEvent;
use crate::domain::ports::{NotificationRepository, NotificationSink};

/// Sink half of the notification channel.
#[derive(Clone)]
pub struct ChannelNotificationSink {
    tx: UnboundedSender<NotificationEvent>,
}

impl NotificationSink for ChannelNotificationSink {
    fn publish(&self, event: NotificationEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("notification writer is gone; event dropped");
        }
    }
}

/// Create the sink and the receiver the writer task drains.
#[must_use]
pub fn notification_channel() -> (
    ChannelNotificationSink,
    UnboundedReceiver<NotificationEvent>,
) {
    let (tx, rx) = unbounded_channel();
    (ChannelNotificationSink { tx }, rx)
}

/// Spawn the writer task persisting events as unread inbox rows.
///
/// The task ends when every sink handle has been dropped.
pub fn spawn_notification_writer(
    repository: Arc<dyn NotificationRepository>,
    mut rx: UnboundedReceiver<NotificationEvent>,
    clock: Arc<dyn Clock>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let row = event.into_notification(clock.utc());
            if let Err(err) = repository.insert(row).await {
                tracing::warn!(error = %err, "failed to persist notification");
            }
        }
    })
}
