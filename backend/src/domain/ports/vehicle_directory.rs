//! Vehicle registry port. Issuance resolves plates through this directory;
//! registration is the only write.

use async_trait::async_trait;

use crate::domain::error::Error;
use crate::domain::vehicle::{PlateNumber, VehicleRecord};

/// Failures surfaced by vehicle registry adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VehicleDirectoryError {
    #[error("vehicle registry connection failed: {0}")]
    Connection(String),
    #[error("vehicle registry query failed: {0}")]
    Query(String),
    #[error("a vehicle with this plate is already registered")]
    DuplicatePlate,
}

impl VehicleDirectoryError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }
}

impl From<VehicleDirectoryError> for Error {
    fn from(err: VehicleDirectoryError) -> Self {
        match err {
            VehicleDirectoryError::Connection(_) => {
                Self::service_unavailable("vehicle registry is unavailable")
            }
            VehicleDirectoryError::Query(message) => {
                Self::internal(format!("vehicle registry query failed: {message}"))
            }
            VehicleDirectoryError::DuplicatePlate => {
                Self::conflict("a vehicle with this plate is already registered")
            }
        }
    }
}

/// Lookup and registration port for vehicles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VehicleDirectory: Send + Sync {
    async fn resolve_by_plate(
        &self,
        plate: &PlateNumber,
    ) -> Result<Option<VehicleRecord>, VehicleDirectoryError>;

    /// Register a vehicle; [`VehicleDirectoryError::DuplicatePlate`] when the
    /// plate already exists.
    async fn register(&self, vehicle: VehicleRecord) -> Result<(), VehicleDirectoryError>;
}
