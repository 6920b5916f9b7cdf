//! In-memory adapters for the persistence ports.
//!
//! Used by tests and pool-less deployments. Each adapter serialises access
//! through a single mutex, which makes every port method atomic and gives
//! the same guard semantics as the SQL adapters' conditional updates.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::challan::{ChallanId, ChallanRecord, ChallanStatus};
use crate::domain::notification::Notification;
use crate::domain::ports::{
    ChallanFilter, ChallanMutation, ChallanPage, ChallanRepository, ChallanRepositoryError,
    LockoutPolicy, LoginFailureOutcome, MarkReadOutcome, NotificationRepository,
    NotificationRepositoryError, PageRequest, TransitionOutcome, UserRepository,
    UserRepositoryError, VehicleDirectory, VehicleDirectoryError, advance_failure_counters,
};
use crate::domain::user::{Email, UserAccount, UserId};
use crate::domain::vehicle::{PlateNumber, VehicleRecord};

/// In-memory account store.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    accounts: Mutex<HashMap<UserId, UserAccount>>,
}

impl MemoryUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, account: UserAccount) -> Result<(), UserRepositoryError> {
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| UserRepositoryError::query("account store mutex poisoned"))?;
        if accounts.values().any(|existing| existing.email == account.email) {
            return Err(UserRepositoryError::DuplicateEmail);
        }
        accounts.insert(account.id, account);
        Ok(())
    }

    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserAccount>, UserRepositoryError> {
        let accounts = self
            .accounts
            .lock()
            .map_err(|_| UserRepositoryError::query("account store mutex poisoned"))?;
        Ok(accounts.values().find(|a| &a.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, UserRepositoryError> {
        let accounts = self
            .accounts
            .lock()
            .map_err(|_| UserRepositoryError::query("account store mutex poisoned"))?;
        Ok(accounts.get(&id).cloned())
    }

    async fn record_login_failure(
        &self,
        id: UserId,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<LoginFailureOutcome, UserRepositoryError> {
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| UserRepositoryError::query("account store mutex poisoned"))?;
        let account = accounts.get_mut(&id).ok_or(UserRepositoryError::NotFound)?;

        let outcome = advance_failure_counters(
            account.failed_attempts,
            account.locked_until,
            policy,
            now,
        );
        account.failed_attempts = outcome.failed_attempts;
        account.locked_until = outcome.locked_until;
        Ok(outcome)
    }

    async fn record_login_success(
        &self,
        id: UserId,
        now: DateTime<Utc>,
        refresh_fingerprint: &str,
    ) -> Result<(), UserRepositoryError> {
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| UserRepositoryError::query("account store mutex poisoned"))?;
        let account = accounts.get_mut(&id).ok_or(UserRepositoryError::NotFound)?;
        account.failed_attempts = 0;
        account.locked_until = None;
        account.last_login = Some(now);
        account.refresh_token_fingerprint = Some(refresh_fingerprint.to_owned());
        Ok(())
    }

    async fn store_refresh_fingerprint<'a>(
        &self,
        id: UserId,
        fingerprint: Option<&'a str>,
    ) -> Result<(), UserRepositoryError> {
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| UserRepositoryError::query("account store mutex poisoned"))?;
        let account = accounts.get_mut(&id).ok_or(UserRepositoryError::NotFound)?;
        account.refresh_token_fingerprint = fingerprint.map(str::to_owned);
        Ok(())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), UserRepositoryError> {
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| UserRepositoryError::query("account store mutex poisoned"))?;
        let account = accounts.get_mut(&id).ok_or(UserRepositoryError::NotFound)?;
        account.password_hash = password_hash.to_owned();
        Ok(())
    }
}

/// In-memory citation store.
#[derive(Debug, Default)]
pub struct MemoryChallanRepository {
    challans: Mutex<HashMap<ChallanId, ChallanRecord>>,
}

impl MemoryChallanRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(record: &ChallanRecord, filter: &ChallanFilter) -> bool {
    filter.owner.is_none_or(|owner| record.owner_id == owner)
        && filter.status.is_none_or(|status| record.status == status)
        && filter
            .payment_status
            .is_none_or(|payment| record.payment_status == payment)
        && filter
            .plate
            .as_ref()
            .is_none_or(|plate| &record.plate == plate)
}

#[async_trait]
impl ChallanRepository for MemoryChallanRepository {
    async fn insert(&self, record: ChallanRecord) -> Result<(), ChallanRepositoryError> {
        let mut challans = self
            .challans
            .lock()
            .map_err(|_| ChallanRepositoryError::query("citation store mutex poisoned"))?;
        if challans
            .values()
            .any(|existing| existing.citation_number == record.citation_number)
        {
            return Err(ChallanRepositoryError::DuplicateCitationNumber);
        }
        challans.insert(record.id, record);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: ChallanId,
    ) -> Result<Option<ChallanRecord>, ChallanRepositoryError> {
        let challans = self
            .challans
            .lock()
            .map_err(|_| ChallanRepositoryError::query("citation store mutex poisoned"))?;
        Ok(challans.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &ChallanFilter,
        page: PageRequest,
    ) -> Result<ChallanPage, ChallanRepositoryError> {
        let challans = self
            .challans
            .lock()
            .map_err(|_| ChallanRepositoryError::query("citation store mutex poisoned"))?;
        let mut matched: Vec<ChallanRecord> = challans
            .values()
            .filter(|record| matches_filter(record, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.size as usize)
            .collect();
        Ok(ChallanPage {
            items,
            total,
            page: page.number,
            page_size: page.size,
        })
    }

    async fn find_by_plate(
        &self,
        plate: &PlateNumber,
        statuses: &[ChallanStatus],
    ) -> Result<Vec<ChallanRecord>, ChallanRepositoryError> {
        let challans = self
            .challans
            .lock()
            .map_err(|_| ChallanRepositoryError::query("citation store mutex poisoned"))?;
        let mut matched: Vec<ChallanRecord> = challans
            .values()
            .filter(|record| &record.plate == plate && statuses.contains(&record.status))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(matched)
    }

    async fn try_transition(
        &self,
        id: ChallanId,
        mutation: &ChallanMutation,
        allowed_from: &[ChallanStatus],
    ) -> Result<TransitionOutcome, ChallanRepositoryError> {
        // Single lock acquisition: the read, guard check, and write are one
        // atomic step, so exactly one concurrent caller wins.
        let mut challans = self
            .challans
            .lock()
            .map_err(|_| ChallanRepositoryError::query("citation store mutex poisoned"))?;
        let Some(current) = challans.get(&id).cloned() else {
            return Ok(TransitionOutcome::Missing);
        };
        if !allowed_from.contains(&current.status) {
            return Ok(TransitionOutcome::Rejected(current));
        }
        match mutation.apply_to(current.clone()) {
            Ok(updated) => {
                challans.insert(id, updated.clone());
                Ok(TransitionOutcome::Applied(updated))
            }
            // allowed_from should be a subset of the legal source states;
            // if it is not, report the refusal rather than corrupting state.
            Err(_) => Ok(TransitionOutcome::Rejected(current)),
        }
    }
}

/// In-memory vehicle registry.
#[derive(Debug, Default)]
pub struct MemoryVehicleDirectory {
    vehicles: Mutex<HashMap<Uuid, VehicleRecord>>,
}

impl MemoryVehicleDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VehicleDirectory for MemoryVehicleDirectory {
    async fn resolve_by_plate(
        &self,
        plate: &PlateNumber,
    ) -> Result<Option<VehicleRecord>, VehicleDirectoryError> {
        let vehicles = self
            .vehicles
            .lock()
            .map_err(|_| VehicleDirectoryError::query("vehicle registry mutex poisoned"))?;
        Ok(vehicles.values().find(|v| &v.plate == plate).cloned())
    }

    async fn register(&self, vehicle: VehicleRecord) -> Result<(), VehicleDirectoryError> {
        let mut vehicles = self
            .vehicles
            .lock()
            .map_err(|_| VehicleDirectoryError::query("vehicle registry mutex poisoned"))?;
        if vehicles.values().any(|v| v.plate == vehicle.plate) {
            return Err(VehicleDirectoryError::DuplicatePlate);
        }
        vehicles.insert(vehicle.id, vehicle);
        Ok(())
    }
}

/// In-memory notification inbox.
#[derive(Debug, Default)]
pub struct MemoryNotificationRepository {
    notifications: Mutex<HashMap<Uuid, Notification>>,
}

impl MemoryNotificationRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn insert(
        &self,
        notification: Notification,
    ) -> Result<(), NotificationRepositoryError> {
        let mut notifications = self
            .notifications
            .lock()
            .map_err(|_| NotificationRepositoryError::query("inbox store mutex poisoned"))?;
        notifications.insert(notification.id, notification);
        Ok(())
    }

    async fn list_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<Notification>, NotificationRepositoryError> {
        let notifications = self
            .notifications
            .lock()
            .map_err(|_| NotificationRepositoryError::query("inbox store mutex poisoned"))?;
        let mut rows: Vec<Notification> = notifications
            .values()
            .filter(|n| n.user_id == user)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_read(
        &self,
        id: Uuid,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<MarkReadOutcome, NotificationRepositoryError> {
        let mut notifications = self
            .notifications
            .lock()
            .map_err(|_| NotificationRepositoryError::query("inbox store mutex poisoned"))?;
        match notifications.get_mut(&id) {
            None => Ok(MarkReadOutcome::Missing),
            Some(row) if row.user_id != user => Ok(MarkReadOutcome::NotOwner),
            Some(row) => {
                row.is_read = true;
                row.read_at.get_or_insert(now);
                Ok(MarkReadOutcome::Updated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::Role;
    use crate::domain::challan::{
        Challan, ChallanDraft, CitationNumber, DisputeDetails, PaymentDetails, PaymentMethod,
        ReceiptNumber,
    };
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 15, 10, 0, 0).single().expect("ts")
    }

    fn account(email: &str) -> UserAccount {
        UserAccount {
            id: UserId::random(),
            email: Email::parse(email).expect("email"),
            full_name: "Amit Kumar".to_owned(),
            phone: "9876543210".to_owned(),
            password_hash: "$argon2id$stub".to_owned(),
            role: Role::Citizen,
            failed_attempts: 0,
            locked_until: None,
            is_active: true,
            refresh_token_fingerprint: None,
            last_login: None,
            created_at: now(),
        }
    }

    fn pending(owner: UserId, number: &str) -> ChallanRecord {
        Challan::issue(
            ChallanDraft {
                plate: PlateNumber::parse("DL01AB1234").expect("plate"),
                violation: "Signal jumping".to_owned(),
                description: None,
                fine_amount: 2000,
                location: None,
            },
            CitationNumber::from_raw(number.to_owned()),
            Uuid::new_v4(),
            owner,
            "Amit Kumar".to_owned(),
            "9876543210".to_owned(),
            UserId::random(),
            now(),
        )
        .into_record()
    }

    fn pay_mutation() -> ChallanMutation {
        ChallanMutation::Pay(PaymentDetails {
            receipt: ReceiptNumber::generate(now()),
            method: PaymentMethod::Upi,
            transaction_ref: None,
            paid_at: now(),
            paid_by: UserId::random(),
        })
    }

    #[actix_rt::test]
    async fn duplicate_email_is_refused() {
        let repo = MemoryUserRepository::new();
        repo.insert(account("amit@example.com")).await.expect("first");
        let error = repo
            .insert(account("amit@example.com"))
            .await
            .expect_err("duplicate");
        assert_eq!(error, UserRepositoryError::DuplicateEmail);
    }

    #[actix_rt::test]
    async fn failure_run_locks_at_the_threshold() {
        let repo = MemoryUserRepository::new();
        let stored = account("amit@example.com");
        let id = stored.id;
        repo.insert(stored).await.expect("insert");
        let policy = LockoutPolicy::default();

        for attempt in 1..=4u32 {
            let outcome = repo
                .record_login_failure(id, &policy, now())
                .await
                .expect("count");
            assert_eq!(outcome.failed_attempts, attempt);
            assert!(outcome.locked_until.is_none());
        }
        let outcome = repo
            .record_login_failure(id, &policy, now())
            .await
            .expect("count");
        assert_eq!(outcome.failed_attempts, 5);
        assert_eq!(
            outcome.locked_until,
            Some(now() + chrono::Duration::minutes(15))
        );
    }

    #[actix_rt::test]
    async fn expired_lock_restarts_the_run_at_one() {
        let repo = MemoryUserRepository::new();
        let stored = account("amit@example.com");
        let id = stored.id;
        repo.insert(stored).await.expect("insert");
        let policy = LockoutPolicy::default();

        for _ in 0..5 {
            repo.record_login_failure(id, &policy, now()).await.expect("count");
        }
        let later = now() + chrono::Duration::minutes(16);
        let outcome = repo
            .record_login_failure(id, &policy, later)
            .await
            .expect("count after expiry");
        assert_eq!(outcome.failed_attempts, 1);
        assert!(outcome.locked_until.is_none());
    }

    #[actix_rt::test]
    async fn success_resets_the_counters() {
        let repo = MemoryUserRepository::new();
        let stored = account("amit@example.com");
        let id = stored.id;
        repo.insert(stored).await.expect("insert");
        repo.record_login_failure(id, &LockoutPolicy::default(), now())
            .await
            .expect("count");
        repo.record_login_success(id, now(), "abc123").await.expect("reset");

        let refreshed = repo.find_by_id(id).await.expect("find").expect("present");
        assert_eq!(refreshed.failed_attempts, 0);
        assert_eq!(refreshed.last_login, Some(now()));
        assert_eq!(refreshed.refresh_token_fingerprint.as_deref(), Some("abc123"));
    }

    #[actix_rt::test]
    async fn duplicate_citation_number_is_refused() {
        let repo = MemoryChallanRepository::new();
        let owner = UserId::random();
        repo.insert(pending(owner, "ECH26070001")).await.expect("first");
        let error = repo
            .insert(pending(owner, "ECH26070001"))
            .await
            .expect_err("duplicate");
        assert_eq!(error, ChallanRepositoryError::DuplicateCitationNumber);
    }

    #[actix_rt::test]
    async fn transition_guard_admits_exactly_one_payment() {
        let repo = MemoryChallanRepository::new();
        let record = pending(UserId::random(), "ECH26070001");
        let id = record.id;
        repo.insert(record).await.expect("insert");

        let first = repo
            .try_transition(id, &pay_mutation(), &[ChallanStatus::Pending])
            .await
            .expect("first attempt");
        assert!(matches!(first, TransitionOutcome::Applied(_)));

        let second = repo
            .try_transition(id, &pay_mutation(), &[ChallanStatus::Pending])
            .await
            .expect("second attempt");
        match second {
            TransitionOutcome::Rejected(current) => {
                assert_eq!(current.status, ChallanStatus::Paid);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[actix_rt::test]
    async fn transition_on_a_missing_citation_reports_missing() {
        let repo = MemoryChallanRepository::new();
        let outcome = repo
            .try_transition(ChallanId::random(), &pay_mutation(), &[ChallanStatus::Pending])
            .await
            .expect("attempt");
        assert!(matches!(outcome, TransitionOutcome::Missing));
    }

    #[actix_rt::test]
    async fn listings_page_newest_first() {
        let repo = MemoryChallanRepository::new();
        let owner = UserId::random();
        for (index, number) in ["ECH26070001", "ECH26070002", "ECH26070003"]
            .iter()
            .enumerate()
        {
            let mut record = pending(owner, number);
            record.issued_at = now() + chrono::Duration::minutes(index as i64);
            repo.insert(record).await.expect("insert");
        }

        let page = repo
            .list(
                &ChallanFilter {
                    owner: Some(owner),
                    ..ChallanFilter::default()
                },
                PageRequest::new(1, 2),
            )
            .await
            .expect("list");
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].citation_number.as_str(), "ECH26070003");

        let rest = repo
            .list(
                &ChallanFilter {
                    owner: Some(owner),
                    ..ChallanFilter::default()
                },
                PageRequest::new(2, 2),
            )
            .await
            .expect("list");
        assert_eq!(rest.items.len(), 1);
        assert_eq!(rest.items[0].citation_number.as_str(), "ECH26070001");
    }

    #[actix_rt::test]
    async fn plate_search_filters_by_status() {
        let repo = MemoryChallanRepository::new();
        let owner = UserId::random();
        let open = pending(owner, "ECH26070001");
        repo.insert(open.clone()).await.expect("insert");
        let mut settled = pending(owner, "ECH26070002");
        settled = pay_mutation().apply_to(settled).expect("pay fixture");
        repo.insert(settled).await.expect("insert");
        let mut disputed = pending(owner, "ECH26070003");
        disputed = ChallanMutation::Dispute(DisputeDetails {
            reason: "wrong vehicle".to_owned(),
            raised_at: now(),
        })
        .apply_to(disputed)
        .expect("dispute fixture");
        repo.insert(disputed).await.expect("insert");

        let outstanding = repo
            .find_by_plate(
                &PlateNumber::parse("DL01AB1234").expect("plate"),
                &[ChallanStatus::Pending, ChallanStatus::Disputed],
            )
            .await
            .expect("search");
        assert_eq!(outstanding.len(), 2);
        assert!(outstanding.iter().all(|r| r.status != ChallanStatus::Paid));
    }

    #[actix_rt::test]
    async fn mark_read_distinguishes_owner_and_stranger() {
        let repo = MemoryNotificationRepository::new();
        let owner = UserId::random();
        let row = crate::domain::notification::NotificationEvent::citation_issued(
            owner,
            ChallanId::random(),
            &CitationNumber::from_raw("ECH26070001".to_owned()),
            2000,
        )
        .into_notification(now());
        let row_id = row.id;
        repo.insert(row).await.expect("insert");

        assert_eq!(
            repo.mark_read(row_id, UserId::random(), now())
                .await
                .expect("attempt"),
            MarkReadOutcome::NotOwner
        );
        assert_eq!(
            repo.mark_read(row_id, owner, now()).await.expect("attempt"),
            MarkReadOutcome::Updated
        );
        let rows = repo.list_for_user(owner).await.expect("list");
        assert_eq!(rows[0].read_at, Some(now()));
        assert_eq!(
            repo.mark_read(Uuid::new_v4(), owner, now()).await.expect("attempt"),
            MarkReadOutcome::Missing
        );
    }
}
