//! Notification delivery adapters.

mod channel_sink;

pub use channel_sink::{ChannelNotificationSink, notification_channel, spawn_notification_writer};
