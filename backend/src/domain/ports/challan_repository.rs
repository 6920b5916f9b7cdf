//! Citation store port.
//!
//! `try_transition` is the compare-and-set at the centre of payment
//! idempotency: the adapter applies the mutation only if the current status
//! is still in `allowed_from`, as one atomic operation.

use async_trait::async_trait;

use crate::domain::challan::{
    Challan, ChallanId, ChallanRecord, ChallanStatus, ChallanTransitionError, DisputeDetails,
    PaymentDetails, PaymentStatus,
};
use crate::domain::error::Error;
use crate::domain::user::UserId;
use crate::domain::vehicle::PlateNumber;

/// Query filter for citation listings. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChallanFilter {
    /// Restrict to one owner; set for every citizen query.
    pub owner: Option<UserId>,
    pub status: Option<ChallanStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub plate: Option<PlateNumber>,
}

/// One-based page request with a clamped size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    pub const MAX_SIZE: u32 = 100;
    pub const DEFAULT_SIZE: u32 = 20;

    /// Normalise raw query input: pages start at one, size is clamped.
    #[must_use]
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.clamp(1, Self::MAX_SIZE),
        }
    }

    /// Row offset of this page.
    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_SIZE)
    }
}

/// One page of citations, newest first, plus the unpaged total.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallanPage {
    pub items: Vec<ChallanRecord>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// A status mutation to apply under the compare-and-set guard.
#[derive(Debug, Clone, PartialEq)]
pub enum ChallanMutation {
    Pay(PaymentDetails),
    Dispute(DisputeDetails),
    Waive { note: Option<String> },
    Cancel { note: Option<String> },
}

impl ChallanMutation {
    /// Apply the mutation through the aggregate's own transition methods, so
    /// adapters cannot produce a status pair the state machine forbids.
    ///
    /// # Errors
    /// The aggregate's transition error when the current state refuses it.
    pub fn apply_to(&self, record: ChallanRecord) -> Result<ChallanRecord, ChallanTransitionError> {
        let mut challan = Challan::from_record(record);
        match self {
            Self::Pay(details) => challan.mark_paid(details.clone())?,
            Self::Dispute(details) => {
                challan.dispute(details.reason.clone(), details.raised_at)?;
            }
            Self::Waive { note } => challan.waive(note.clone())?,
            Self::Cancel { note } => challan.cancel(note.clone())?,
        }
        Ok(challan.into_record())
    }
}

/// Result of a compare-and-set transition attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The guard held and the mutation was applied; carries the new record.
    Applied(ChallanRecord),
    /// The guard failed; carries the record as it was found.
    Rejected(ChallanRecord),
    /// No citation with this id exists.
    Missing,
}

/// Failures surfaced by citation store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChallanRepositoryError {
    #[error("citation store connection failed: {0}")]
    Connection(String),
    #[error("citation store query failed: {0}")]
    Query(String),
    #[error("citation number already in use")]
    DuplicateCitationNumber,
}

impl ChallanRepositoryError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }
}

impl From<ChallanRepositoryError> for Error {
    fn from(err: ChallanRepositoryError) -> Self {
        match err {
            ChallanRepositoryError::Connection(_) => {
                Self::service_unavailable("citation store is unavailable")
            }
            ChallanRepositoryError::Query(message) => {
                Self::internal(format!("citation store query failed: {message}"))
            }
            ChallanRepositoryError::DuplicateCitationNumber => {
                Self::conflict("citation number already in use")
            }
        }
    }
}

/// Persistence port for citations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChallanRepository: Send + Sync {
    /// Insert a new citation; [`ChallanRepositoryError::DuplicateCitationNumber`]
    /// when the citation number is already taken. The store's uniqueness
    /// constraint, not the generator, is the source of truth.
    async fn insert(&self, record: ChallanRecord) -> Result<(), ChallanRepositoryError>;

    async fn find_by_id(
        &self,
        id: ChallanId,
    ) -> Result<Option<ChallanRecord>, ChallanRepositoryError>;

    /// List citations matching `filter`, newest first.
    async fn list(
        &self,
        filter: &ChallanFilter,
        page: PageRequest,
    ) -> Result<ChallanPage, ChallanRepositoryError>;

    /// All citations for a plate whose status is in `statuses`, newest first.
    async fn find_by_plate(
        &self,
        plate: &PlateNumber,
        statuses: &[ChallanStatus],
    ) -> Result<Vec<ChallanRecord>, ChallanRepositoryError>;

    /// Atomically apply `mutation` if the current status is in
    /// `allowed_from`. Exactly one of two concurrent attempts observes
    /// [`TransitionOutcome::Applied`].
    async fn try_transition(
        &self,
        id: ChallanId,
        mutation: &ChallanMutation,
        allowed_from: &[ChallanStatus],
    ) -> Result<TransitionOutcome, ChallanRepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_normalises_input() {
        let page = PageRequest::new(0, 0);
        assert_eq!(page.number, 1);
        assert_eq!(page.size, 1);
        assert_eq!(page.offset(), 0);

        let page = PageRequest::new(3, 500);
        assert_eq!(page.size, PageRequest::MAX_SIZE);
        assert_eq!(page.offset(), 200);
    }
}
