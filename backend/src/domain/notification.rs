//! In-app notification entity and the events the sink accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::challan::{ChallanId, CitationNumber};
use crate::domain::user::UserId;

/// Closed set of notification categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    Challan,
    Payment,
    DocumentExpiry,
    System,
    Alert,
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Challan => "challan",
            Self::Payment => "payment",
            Self::DocumentExpiry => "document-expiry",
            Self::System => "system",
            Self::Alert => "alert",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "challan" => Some(Self::Challan),
            "payment" => Some(Self::Payment),
            "document-expiry" => Some(Self::DocumentExpiry),
            "system" => Some(Self::System),
            "alert" => Some(Self::Alert),
            _ => None,
        }
    }
}

/// Delivery priority hint for clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl NotificationPriority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// Persisted inbox row.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    pub related_challan: Option<ChallanId>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An event emitted by a lifecycle operation, not yet persisted.
///
/// Events are fire-and-forget: the emitting operation succeeds whether or
/// not the sink manages to persist the inbox row.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    pub related_challan: Option<ChallanId>,
}

impl NotificationEvent {
    /// Event raised when a citation is issued against the recipient.
    #[must_use]
    pub fn citation_issued(
        owner: UserId,
        challan: ChallanId,
        number: &CitationNumber,
        amount: u64,
    ) -> Self {
        Self {
            user_id: owner,
            kind: NotificationKind::Challan,
            priority: NotificationPriority::High,
            title: "New E-Challan Issued".to_owned(),
            message: format!("E-Challan {number} issued against your vehicle for ₹{amount}."),
            related_challan: Some(challan),
        }
    }

    /// Event raised when the recipient's citation is settled.
    #[must_use]
    pub fn payment_confirmed(
        owner: UserId,
        challan: ChallanId,
        number: &CitationNumber,
        amount: u64,
    ) -> Self {
        Self {
            user_id: owner,
            kind: NotificationKind::Payment,
            priority: NotificationPriority::Medium,
            title: "Payment Successful".to_owned(),
            message: format!("Payment of ₹{amount} received for e-challan {number}."),
            related_challan: Some(challan),
        }
    }

    /// Materialise the event into an unread inbox row.
    #[must_use]
    pub fn into_notification(self, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            kind: self.kind,
            priority: self.priority,
            title: self.title,
            message: self.message,
            related_challan: self.related_challan,
            is_read: false,
            read_at: None,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(NotificationKind::DocumentExpiry, "document-expiry")]
    #[case(NotificationKind::Challan, "challan")]
    fn kind_round_trips(#[case] kind: NotificationKind, #[case] encoded: &str) {
        assert_eq!(kind.as_str(), encoded);
        assert_eq!(NotificationKind::parse(encoded), Some(kind));
    }

    #[test]
    fn citation_event_targets_the_owner() {
        let owner = UserId::random();
        let challan = ChallanId::random();
        let number = CitationNumber::from_raw("ECH26070042".to_owned());
        let event = NotificationEvent::citation_issued(owner, challan, &number, 2000);
        assert_eq!(event.user_id, owner);
        assert_eq!(event.kind, NotificationKind::Challan);
        assert_eq!(event.priority, NotificationPriority::High);
        assert!(event.message.contains("ECH26070042"));
        assert!(event.message.contains("₹2000"));

        let row = event.into_notification(Utc::now());
        assert!(!row.is_read);
        assert_eq!(row.read_at, None);
        assert_eq!(row.related_challan, Some(challan));
    }

    #[test]
    fn payment_event_is_medium_priority() {
        let event = NotificationEvent::payment_confirmed(
            UserId::random(),
            ChallanId::random(),
            &CitationNumber::from_raw("ECH26070042".to_owned()),
            2000,
        );
        assert_eq!(event.kind, NotificationKind::Payment);
        assert_eq!(event.priority, NotificationPriority::Medium);
        assert_eq!(event.title, "Payment Successful");
    }
}
