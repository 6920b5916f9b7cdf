//! Citation (e-challan) aggregate and its lifecycle state machine.
//!
//! All status changes go through [`Challan`] methods so the workflow status
//! and the payment status can never drift into contradictory combinations.

use chrono::{DateTime, Datelike, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::user::UserId;
use crate::domain::vehicle::PlateNumber;

/// Days a citation remains payable before it counts as overdue.
pub const GRACE_PERIOD_DAYS: i64 = 30;

/// Issuing location recorded when the officer leaves the field blank.
pub const DEFAULT_LOCATION: &str = "DELHI ZONE 04";

/// Opaque citation identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct ChallanId(Uuid);

impl ChallanId {
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for ChallanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Workflow status: the authoritative lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ChallanStatus {
    Pending,
    Paid,
    Disputed,
    Cancelled,
    Waived,
}

impl ChallanStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Disputed => "disputed",
            Self::Cancelled => "cancelled",
            Self::Waived => "waived",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "disputed" => Some(Self::Disputed),
            "cancelled" => Some(Self::Cancelled),
            "waived" => Some(Self::Waived),
            _ => None,
        }
    }

    /// Terminal states admit no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled | Self::Waived)
    }
}

/// Settlement status, constrained by the workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    PartiallyPaid,
    Waived,
    Cancelled,
}

impl PaymentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::PartiallyPaid => "partially-paid",
            Self::Waived => "waived",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "partially-paid" => Some(Self::PartiallyPaid),
            "waived" => Some(Self::Waived),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Accepted settlement channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    NetBanking,
    Wallet,
}

impl PaymentMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Upi => "upi",
            Self::NetBanking => "net-banking",
            Self::Wallet => "wallet",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cash" => Some(Self::Cash),
            "card" => Some(Self::Card),
            "upi" => Some(Self::Upi),
            "net-banking" => Some(Self::NetBanking),
            "wallet" => Some(Self::Wallet),
            _ => None,
        }
    }
}

/// Human-facing citation number: `ECH` + two-digit year + two-digit month +
/// four random digits. Uniqueness is enforced by the store, not the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct CitationNumber(String);

impl CitationNumber {
    /// Generate a candidate number for the current instant.
    pub fn generate(now: DateTime<Utc>, rng: &mut impl Rng) -> Self {
        let suffix: u16 = rng.gen_range(0..10_000);
        Self(format!(
            "ECH{:02}{:02}{:04}",
            now.year() % 100,
            now.month(),
            suffix
        ))
    }

    #[must_use]
    pub fn from_raw(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for CitationNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payment receipt number: `RCP` + millisecond timestamp of the settlement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ReceiptNumber(String);

impl ReceiptNumber {
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self(format!("RCP{}", now.timestamp_millis()))
    }

    #[must_use]
    pub fn from_raw(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Settlement details recorded by a successful payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDetails {
    pub receipt: ReceiptNumber,
    pub method: PaymentMethod,
    /// Gateway reference supplied by the external payment confirmation.
    pub transaction_ref: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub paid_by: UserId,
}

/// Details of an open or resolved dispute.
#[derive(Debug, Clone, PartialEq)]
pub struct DisputeDetails {
    pub reason: String,
    pub raised_at: DateTime<Utc>,
}

/// Raw citation state as persisted. Adapters read and write this directly;
/// everything else goes through [`Challan`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChallanRecord {
    pub id: ChallanId,
    pub citation_number: CitationNumber,
    pub plate: PlateNumber,
    pub vehicle_id: Uuid,
    pub owner_id: UserId,
    pub owner_name: String,
    pub owner_phone: String,
    pub violation: String,
    pub description: Option<String>,
    /// Fine and late fee in whole rupees.
    pub fine_amount: u64,
    pub late_fee: u64,
    pub location: String,
    pub issued_by: UserId,
    pub issued_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: ChallanStatus,
    pub payment_status: PaymentStatus,
    pub payment: Option<PaymentDetails>,
    pub dispute: Option<DisputeDetails>,
    /// Officer note attached by a waiver or cancellation.
    pub resolution_note: Option<String>,
}

/// Inputs for issuing a new citation, before vehicle resolution.
#[derive(Debug, Clone)]
pub struct ChallanDraft {
    pub plate: PlateNumber,
    pub violation: String,
    pub description: Option<String>,
    pub fine_amount: u64,
    pub location: Option<String>,
}

/// A transition the current status does not admit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChallanTransitionError {
    /// The citation is already settled; payment is idempotent at the API
    /// boundary so callers map this distinctly from other refusals.
    #[error("citation is already paid")]
    AlreadyPaid,
    #[error("cannot {action} a citation in the {from} state", from = .from.as_str())]
    Illegal {
        from: ChallanStatus,
        action: &'static str,
    },
}

/// Citation aggregate enforcing the lifecycle state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Challan {
    record: ChallanRecord,
}

impl Challan {
    /// Issue a new citation from a draft against a resolved vehicle.
    ///
    /// Status starts at `Pending`/`Pending`; the due date is the issuance
    /// instant plus the grace period.
    #[must_use]
    pub fn issue(
        draft: ChallanDraft,
        citation_number: CitationNumber,
        vehicle_id: Uuid,
        owner_id: UserId,
        owner_name: String,
        owner_phone: String,
        issued_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        let location = draft
            .location
            .filter(|loc| !loc.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_owned());
        Self {
            record: ChallanRecord {
                id: ChallanId::random(),
                citation_number,
                plate: draft.plate,
                vehicle_id,
                owner_id,
                owner_name,
                owner_phone,
                violation: draft.violation,
                description: draft.description,
                fine_amount: draft.fine_amount,
                late_fee: 0,
                location,
                issued_by,
                issued_at: now,
                due_date: now + Duration::days(GRACE_PERIOD_DAYS),
                status: ChallanStatus::Pending,
                payment_status: PaymentStatus::Pending,
                payment: None,
                dispute: None,
                resolution_note: None,
            },
        }
    }

    /// Rehydrate from a persisted record.
    #[must_use]
    pub fn from_record(record: ChallanRecord) -> Self {
        Self { record }
    }

    #[must_use]
    pub fn record(&self) -> &ChallanRecord {
        &self.record
    }

    #[must_use]
    pub fn into_record(self) -> ChallanRecord {
        self.record
    }

    #[must_use]
    pub fn id(&self) -> ChallanId {
        self.record.id
    }

    #[must_use]
    pub fn status(&self) -> ChallanStatus {
        self.record.status
    }

    #[must_use]
    pub fn owner_id(&self) -> UserId {
        self.record.owner_id
    }

    /// Fine plus accrued late fee.
    #[must_use]
    pub fn total_amount(&self) -> u64 {
        self.record.fine_amount + self.record.late_fee
    }

    /// A citation is overdue while it is still unpaid past its due date.
    /// A dispute does not stop the clock. Overdue is derived, never stored.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.record.payment_status == PaymentStatus::Pending && now > self.record.due_date
    }

    /// Record a settlement. Allowed from `Pending` and `Disputed` (an
    /// enforcement payment on a disputed citation resolves the dispute).
    ///
    /// # Errors
    /// [`ChallanTransitionError::AlreadyPaid`] when already settled;
    /// [`ChallanTransitionError::Illegal`] from `Cancelled`/`Waived`.
    pub fn mark_paid(&mut self, details: PaymentDetails) -> Result<(), ChallanTransitionError> {
        match self.record.status {
            ChallanStatus::Paid => Err(ChallanTransitionError::AlreadyPaid),
            ChallanStatus::Pending | ChallanStatus::Disputed => {
                self.record.status = ChallanStatus::Paid;
                self.record.payment_status = PaymentStatus::Paid;
                self.record.payment = Some(details);
                Ok(())
            }
            from @ (ChallanStatus::Cancelled | ChallanStatus::Waived) => {
                Err(ChallanTransitionError::Illegal { from, action: "pay" })
            }
        }
    }

    /// Open a dispute. Allowed only from `Pending`.
    ///
    /// # Errors
    /// [`ChallanTransitionError::Illegal`] from every other state.
    pub fn dispute(
        &mut self,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<(), ChallanTransitionError> {
        match self.record.status {
            ChallanStatus::Pending => {
                self.record.status = ChallanStatus::Disputed;
                self.record.dispute = Some(DisputeDetails {
                    reason,
                    raised_at: now,
                });
                Ok(())
            }
            from => Err(ChallanTransitionError::Illegal {
                from,
                action: "dispute",
            }),
        }
    }

    /// Waive the citation. Allowed from `Pending` and `Disputed`.
    ///
    /// # Errors
    /// [`ChallanTransitionError::Illegal`] from terminal states.
    pub fn waive(&mut self, note: Option<String>) -> Result<(), ChallanTransitionError> {
        match self.record.status {
            ChallanStatus::Pending | ChallanStatus::Disputed => {
                self.record.status = ChallanStatus::Waived;
                self.record.payment_status = PaymentStatus::Waived;
                self.record.resolution_note = note;
                Ok(())
            }
            from => Err(ChallanTransitionError::Illegal {
                from,
                action: "waive",
            }),
        }
    }

    /// Cancel the citation. Allowed from `Pending` and `Disputed`.
    ///
    /// # Errors
    /// [`ChallanTransitionError::Illegal`] from terminal states.
    pub fn cancel(&mut self, note: Option<String>) -> Result<(), ChallanTransitionError> {
        match self.record.status {
            ChallanStatus::Pending | ChallanStatus::Disputed => {
                self.record.status = ChallanStatus::Cancelled;
                self.record.payment_status = PaymentStatus::Cancelled;
                self.record.resolution_note = note;
                Ok(())
            }
            from => Err(ChallanTransitionError::Illegal {
                from,
                action: "cancel",
            }),
        }
    }
}
