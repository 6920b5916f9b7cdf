//! Classification of Diesel and pool failures into the two categories the
//! port errors distinguish: connection loss (retryable) and everything else.

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use super::pool::PoolError;

/// Adapter-agnostic failure category.
pub(super) enum StoreFailure {
    Connection(String),
    Query(String),
}

pub(super) fn classify_diesel(err: DieselError) -> StoreFailure {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            StoreFailure::Connection(info.message().to_owned())
        }
        DieselError::BrokenTransactionManager => {
            StoreFailure::Connection("transaction manager is broken".to_owned())
        }
        other => StoreFailure::Query(other.to_string()),
    }
}

pub(super) fn classify_pool(err: PoolError) -> StoreFailure {
    StoreFailure::Connection(err.to_string())
}
