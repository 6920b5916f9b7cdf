//! Citation lifecycle manager.
//!
//! Issuance, settlement, dispute, waiver, and cancellation, with role- and
//! ownership-scoped access. Every status change is funnelled through the
//! store's compare-and-set so concurrent callers cannot double-apply one.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::auth::AuthenticatedUser;
use crate::domain::challan::{
    Challan, ChallanDraft, ChallanId, ChallanRecord, ChallanStatus, CitationNumber,
    DisputeDetails, PaymentDetails, PaymentMethod, PaymentStatus, ReceiptNumber,
};
use crate::domain::error::{DomainResult, Error};
use crate::domain::notification::NotificationEvent;
use crate::domain::ports::{
    ChallanFilter, ChallanMutation, ChallanPage, ChallanRepository, ChallanRepositoryError,
    NotificationSink, PageRequest, TransitionOutcome, VehicleDirectory,
};
use crate::domain::vehicle::PlateNumber;

/// Attempts at a unique citation number before giving up. The store's
/// uniqueness constraint arbitrates; this only bounds the retry loop.
const NUMBER_ATTEMPTS: u32 = 5;

/// Caller-supplied filters for citation listings.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub status: Option<ChallanStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub plate: Option<PlateNumber>,
}

/// Citation lifecycle service over the citation store, vehicle registry,
/// and notification sink.
pub struct ChallanService {
    challans: Arc<dyn ChallanRepository>,
    vehicles: Arc<dyn VehicleDirectory>,
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl ChallanService {
    #[must_use]
    pub fn new(
        challans: Arc<dyn ChallanRepository>,
        vehicles: Arc<dyn VehicleDirectory>,
        notifications: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            challans,
            vehicles,
            notifications,
            clock,
        }
    }

    /// Issue a citation against the vehicle registered under the draft's
    /// plate. Staff only.
    ///
    /// Citation numbers are random; on a store-reported collision a fresh
    /// candidate is tried, up to [`NUMBER_ATTEMPTS`] times.
    ///
    /// # Errors
    /// `forbidden` for citizens, `invalid_request` for empty violations,
    /// `not_found` for unregistered plates, `conflict` when no unique number
    /// could be allocated.
    pub async fn issue(
        &self,
        caller: &AuthenticatedUser,
        draft: ChallanDraft,
    ) -> DomainResult<ChallanRecord> {
        if !caller.role.is_staff() {
            return Err(Error::forbidden("only officers can issue citations"));
        }
        if draft.violation.trim().is_empty() {
            return Err(Error::invalid_request("violation must not be empty"));
        }

        let vehicle = self
            .vehicles
            .resolve_by_plate(&draft.plate)
            .await?
            .ok_or_else(|| Error::not_found("no vehicle registered with this plate"))?;

        let now = self.clock.utc();
        let mut rng = rand::thread_rng();
        for _ in 0..NUMBER_ATTEMPTS {
            let number = CitationNumber::generate(now, &mut rng);
            let challan = Challan::issue(
                draft.clone(),
                number,
                vehicle.id,
                vehicle.owner_id,
                vehicle.owner_name.clone(),
                vehicle.owner_phone.clone(),
                caller.id,
                now,
            );
            match self.challans.insert(challan.record().clone()).await {
                Ok(()) => {
                    let record = challan.into_record();
                    tracing::info!(
                        citation = %record.citation_number,
                        plate = %record.plate,
                        "citation issued"
                    );
                    self.notifications.publish(NotificationEvent::citation_issued(
                        record.owner_id,
                        record.id,
                        &record.citation_number,
                        record.fine_amount + record.late_fee,
                    ));
                    return Ok(record);
                }
                Err(ChallanRepositoryError::DuplicateCitationNumber) => continue,
                Err(other) => return Err(other.into()),
            }
        }
        Err(Error::conflict(
            "could not allocate a unique citation number",
        ))
    }

    /// Fetch one citation, owner-scoped for citizens.
    ///
    /// # Errors
    /// `not_found` for unknown ids, `forbidden` when a citizen reads someone
    /// else's citation.
    pub async fn get(
        &self,
        caller: &AuthenticatedUser,
        id: ChallanId,
    ) -> DomainResult<ChallanRecord> {
        let record = self
            .challans
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("citation not found"))?;
        self.check_ownership(caller, &record)?;
        Ok(record)
    }

    /// List citations, newest first. Citizens see only their own; staff can
    /// filter freely.
    ///
    /// # Errors
    /// Store failures only.
    pub async fn list(
        &self,
        caller: &AuthenticatedUser,
        query: ListQuery,
        page: PageRequest,
    ) -> DomainResult<ChallanPage> {
        let filter = ChallanFilter {
            owner: (!caller.role.is_staff()).then_some(caller.id),
            status: query.status,
            payment_status: query.payment_status,
            plate: query.plate,
        };
        Ok(self.challans.list(&filter, page).await?)
    }

    /// Settle a citation. Owners pay their own pending citations; staff may
    /// also settle a disputed one, which resolves the dispute.
    ///
    /// Idempotent at the boundary: a citation that is already paid, or that
    /// a concurrent request pays first, reports `already_paid`.
    ///
    /// # Errors
    /// `not_found`, `forbidden`, `already_paid`, or `invalid_transition`
    /// depending on what the store finds.
    pub async fn pay(
        &self,
        caller: &AuthenticatedUser,
        id: ChallanId,
        method: PaymentMethod,
        transaction_ref: Option<String>,
    ) -> DomainResult<ChallanRecord> {
        let record = self
            .challans
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("citation not found"))?;
        self.check_ownership(caller, &record)?;
        if record.status == ChallanStatus::Paid {
            return Err(Error::already_paid("citation is already paid"));
        }

        let allowed_from: &[ChallanStatus] = if caller.role.is_staff() {
            &[ChallanStatus::Pending, ChallanStatus::Disputed]
        } else {
            &[ChallanStatus::Pending]
        };
        let now = self.clock.utc();
        let mutation = ChallanMutation::Pay(PaymentDetails {
            receipt: ReceiptNumber::generate(now),
            method,
            transaction_ref,
            paid_at: now,
            paid_by: caller.id,
        });

        match self.challans.try_transition(id, &mutation, allowed_from).await? {
            TransitionOutcome::Applied(updated) => {
                tracing::info!(citation = %updated.citation_number, "citation paid");
                self.notifications.publish(NotificationEvent::payment_confirmed(
                    updated.owner_id,
                    updated.id,
                    &updated.citation_number,
                    updated.fine_amount + updated.late_fee,
                ));
                Ok(updated)
            }
            TransitionOutcome::Rejected(current) => {
                if current.status == ChallanStatus::Paid {
                    Err(Error::already_paid("citation is already paid"))
                } else {
                    Err(Error::invalid_transition(format!(
                        "cannot pay a citation in the {} state",
                        current.status.as_str()
                    )))
                }
            }
            TransitionOutcome::Missing => Err(Error::not_found("citation not found")),
        }
    }

    /// Open a dispute on a pending citation. Owners only; staff may dispute
    /// on an owner's behalf.
    ///
    /// # Errors
    /// `invalid_request` for blank reasons, `invalid_transition` when the
    /// citation is no longer pending.
    pub async fn dispute(
        &self,
        caller: &AuthenticatedUser,
        id: ChallanId,
        reason: String,
    ) -> DomainResult<ChallanRecord> {
        if reason.trim().is_empty() {
            return Err(Error::invalid_request("dispute reason must not be empty"));
        }
        let record = self
            .challans
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("citation not found"))?;
        self.check_ownership(caller, &record)?;

        let mutation = ChallanMutation::Dispute(DisputeDetails {
            reason,
            raised_at: self.clock.utc(),
        });
        self.apply_or_refuse(id, &mutation, &[ChallanStatus::Pending], "dispute")
            .await
    }

    /// Waive a citation. Staff only; resolves an open dispute.
    ///
    /// # Errors
    /// `forbidden` for citizens, `invalid_transition` from terminal states.
    pub async fn waive(
        &self,
        caller: &AuthenticatedUser,
        id: ChallanId,
        note: Option<String>,
    ) -> DomainResult<ChallanRecord> {
        if !caller.role.is_staff() {
            return Err(Error::forbidden("only officers can waive citations"));
        }
        self.apply_or_refuse(
            id,
            &ChallanMutation::Waive { note },
            &[ChallanStatus::Pending, ChallanStatus::Disputed],
            "waive",
        )
        .await
    }

    /// Cancel a citation. Staff only; resolves an open dispute.
    ///
    /// # Errors
    /// `forbidden` for citizens, `invalid_transition` from terminal states.
    pub async fn cancel(
        &self,
        caller: &AuthenticatedUser,
        id: ChallanId,
        note: Option<String>,
    ) -> DomainResult<ChallanRecord> {
        if !caller.role.is_staff() {
            return Err(Error::forbidden("only officers can cancel citations"));
        }
        self.apply_or_refuse(
            id,
            &ChallanMutation::Cancel { note },
            &[ChallanStatus::Pending, ChallanStatus::Disputed],
            "cancel",
        )
        .await
    }

    /// Public plate lookup: outstanding citations only, so settled history
    /// is not exposed to unauthenticated callers.
    ///
    /// # Errors
    /// Store failures only; an unknown plate yields an empty list.
    pub async fn search_by_plate(&self, plate: &PlateNumber) -> DomainResult<Vec<ChallanRecord>> {
        Ok(self
            .challans
            .find_by_plate(plate, &[ChallanStatus::Pending, ChallanStatus::Disputed])
            .await?)
    }

    async fn apply_or_refuse(
        &self,
        id: ChallanId,
        mutation: &ChallanMutation,
        allowed_from: &[ChallanStatus],
        action: &str,
    ) -> DomainResult<ChallanRecord> {
        match self.challans.try_transition(id, mutation, allowed_from).await? {
            TransitionOutcome::Applied(updated) => Ok(updated),
            TransitionOutcome::Rejected(current) => Err(Error::invalid_transition(format!(
                "cannot {action} a citation in the {} state",
                current.status.as_str()
            ))),
            TransitionOutcome::Missing => Err(Error::not_found("citation not found")),
        }
    }

    fn check_ownership(
        &self,
        caller: &AuthenticatedUser,
        record: &ChallanRecord,
    ) -> DomainResult<()> {
        if caller.role.is_staff() || record.owner_id == caller.id {
            Ok(())
        } else {
            Err(Error::forbidden(
                "citizens can only act on their own citations",
            ))
        }
    }
}

#[cfg(test)]
#[path = "challan_service_tests.rs"]
mod tests;
