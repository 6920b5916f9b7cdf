//! Diesel PostgreSQL adapter for the citation store port.
//!
//! `try_transition` is one guarded `UPDATE ... WHERE status = ANY(..)
//! RETURNING *`: the database's row-level atomicity is the compare-and-set.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::RunQueryDsl;

use super::diesel_error_mapping::{StoreFailure, classify_diesel, classify_pool};
use super::models::ChallanRow;
use super::pool::DbPool;
use super::schema::challans;
use crate::domain::challan::{ChallanId, ChallanRecord, ChallanStatus, PaymentStatus};
use crate::domain::ports::{
    ChallanFilter, ChallanMutation, ChallanPage, ChallanRepository, ChallanRepositoryError,
    PageRequest, TransitionOutcome,
};
use crate::domain::vehicle::PlateNumber;

pub struct DieselChallanRepository {
    pool: DbPool,
}

impl DieselChallanRepository {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::bb8::PooledConnection<
            '_,
            diesel_async::AsyncPgConnection,
        >,
        ChallanRepositoryError,
    > {
        self.pool.get().await.map_err(|err| match classify_pool(err) {
            StoreFailure::Connection(m) => ChallanRepositoryError::Connection(m),
            StoreFailure::Query(m) => ChallanRepositoryError::Query(m),
        })
    }
}

fn store_error(err: DieselError) -> ChallanRepositoryError {
    match classify_diesel(err) {
        StoreFailure::Connection(m) => ChallanRepositoryError::Connection(m),
        StoreFailure::Query(m) => ChallanRepositoryError::Query(m),
    }
}

fn row_to_record(row: ChallanRow) -> Result<ChallanRecord, ChallanRepositoryError> {
    ChallanRecord::try_from(row).map_err(ChallanRepositoryError::query)
}

#[async_trait]
impl ChallanRepository for DieselChallanRepository {
    async fn insert(&self, record: ChallanRecord) -> Result<(), ChallanRepositoryError> {
        let mut conn = self.conn().await?;
        let row = ChallanRow::from(&record);
        diesel::insert_into(challans::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    ChallanRepositoryError::DuplicateCitationNumber
                }
                other => store_error(other),
            })?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: ChallanId,
    ) -> Result<Option<ChallanRecord>, ChallanRepositoryError> {
        let mut conn = self.conn().await?;
        let row: Option<ChallanRow> = challans::table
            .find(id.as_uuid())
            .select(ChallanRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(store_error)?;
        row.map(row_to_record).transpose()
    }

    async fn list(
        &self,
        filter: &ChallanFilter,
        page: PageRequest,
    ) -> Result<ChallanPage, ChallanRepositoryError> {
        let mut conn = self.conn().await?;

        let mut rows_query = challans::table.into_boxed();
        let mut count_query = challans::table.into_boxed();
        if let Some(owner) = filter.owner {
            rows_query = rows_query.filter(challans::owner_id.eq(owner.as_uuid()));
            count_query = count_query.filter(challans::owner_id.eq(owner.as_uuid()));
        }
        if let Some(status) = filter.status {
            rows_query = rows_query.filter(challans::status.eq(status.as_str()));
            count_query = count_query.filter(challans::status.eq(status.as_str()));
        }
        if let Some(payment_status) = filter.payment_status {
            rows_query =
                rows_query.filter(challans::payment_status.eq(payment_status.as_str()));
            count_query =
                count_query.filter(challans::payment_status.eq(payment_status.as_str()));
        }
        if let Some(plate) = &filter.plate {
            rows_query = rows_query.filter(challans::plate.eq(plate.as_str().to_owned()));
            count_query = count_query.filter(challans::plate.eq(plate.as_str().to_owned()));
        }

        let total: i64 = count_query
            .count()
            .get_result(&mut conn)
            .await
            .map_err(store_error)?;
        let rows: Vec<ChallanRow> = rows_query
            .order(challans::issued_at.desc())
            .offset(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .limit(i64::from(page.size))
            .select(ChallanRow::as_select())
            .load(&mut conn)
            .await
            .map_err(store_error)?;

        let items = rows
            .into_iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ChallanPage {
            items,
            total: u64::try_from(total).unwrap_or(0),
            page: page.number,
            page_size: page.size,
        })
    }

    async fn find_by_plate(
        &self,
        plate: &PlateNumber,
        statuses: &[ChallanStatus],
    ) -> Result<Vec<ChallanRecord>, ChallanRepositoryError> {
        let mut conn = self.conn().await?;
        let status_strs: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let rows: Vec<ChallanRow> = challans::table
            .filter(challans::plate.eq(plate.as_str()))
            .filter(challans::status.eq_any(status_strs))
            .order(challans::issued_at.desc())
            .select(ChallanRow::as_select())
            .load(&mut conn)
            .await
            .map_err(store_error)?;
        rows.into_iter().map(row_to_record).collect()
    }

    async fn try_transition(
        &self,
        id: ChallanId,
        mutation: &ChallanMutation,
        allowed_from: &[ChallanStatus],
    ) -> Result<TransitionOutcome, ChallanRepositoryError> {
        let mut conn = self.conn().await?;
        let guard_statuses: Vec<&str> = allowed_from.iter().map(|s| s.as_str()).collect();
        let guarded = challans::table
            .filter(challans::id.eq(id.as_uuid()))
            .filter(challans::status.eq_any(guard_statuses));

        let updated: Option<ChallanRow> = match mutation {
            ChallanMutation::Pay(details) => diesel::update(guarded)
                .set((
                    challans::status.eq(ChallanStatus::Paid.as_str()),
                    challans::payment_status.eq(PaymentStatus::Paid.as_str()),
                    challans::payment_receipt.eq(Some(details.receipt.as_str())),
                    challans::payment_method.eq(Some(details.method.as_str())),
                    challans::transaction_ref.eq(details.transaction_ref.as_deref()),
                    challans::paid_at.eq(Some(details.paid_at)),
                    challans::paid_by.eq(Some(details.paid_by.as_uuid())),
                ))
                .returning(ChallanRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
                .map_err(store_error)?,
            ChallanMutation::Dispute(details) => diesel::update(guarded)
                .set((
                    challans::status.eq(ChallanStatus::Disputed.as_str()),
                    challans::dispute_reason.eq(Some(details.reason.as_str())),
                    challans::disputed_at.eq(Some(details.raised_at)),
                ))
                .returning(ChallanRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
                .map_err(store_error)?,
            ChallanMutation::Waive { note } => diesel::update(guarded)
                .set((
                    challans::status.eq(ChallanStatus::Waived.as_str()),
                    challans::payment_status.eq(PaymentStatus::Waived.as_str()),
                    challans::resolution_note.eq(note.as_deref()),
                ))
                .returning(ChallanRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
                .map_err(store_error)?,
            ChallanMutation::Cancel { note } => diesel::update(guarded)
                .set((
                    challans::status.eq(ChallanStatus::Cancelled.as_str()),
                    challans::payment_status.eq(PaymentStatus::Cancelled.as_str()),
                    challans::resolution_note.eq(note.as_deref()),
                ))
                .returning(ChallanRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
                .map_err(store_error)?,
        };

        if let Some(row) = updated {
            return Ok(TransitionOutcome::Applied(row_to_record(row)?));
        }
        // Zero rows matched: either the guard failed or the citation does
        // not exist. A second read tells them apart.
        let current: Option<ChallanRow> = challans::table
            .find(id.as_uuid())
            .select(ChallanRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(store_error)?;
        match current {
            Some(row) => Ok(TransitionOutcome::Rejected(row_to_record(row)?)),
            None => Ok(TransitionOutcome::Missing),
        }
    }
}
