//! Diesel PostgreSQL adapter for the vehicle registry port.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::RunQueryDsl;

use super::diesel_error_mapping::{StoreFailure, classify_diesel, classify_pool};
use super::models::VehicleRow;
use super::pool::DbPool;
use super::schema::vehicles;
use crate::domain::ports::{VehicleDirectory, VehicleDirectoryError};
use crate::domain::vehicle::{PlateNumber, VehicleRecord};

pub struct DieselVehicleDirectory {
    pool: DbPool,
}

impl DieselVehicleDirectory {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn store_error(err: DieselError) -> VehicleDirectoryError {
    match classify_diesel(err) {
        StoreFailure::Connection(m) => VehicleDirectoryError::Connection(m),
        StoreFailure::Query(m) => VehicleDirectoryError::Query(m),
    }
}

#[async_trait]
impl VehicleDirectory for DieselVehicleDirectory {
    async fn resolve_by_plate(
        &self,
        plate: &PlateNumber,
    ) -> Result<Option<VehicleRecord>, VehicleDirectoryError> {
        let mut conn = self.pool.get().await.map_err(|err| match classify_pool(err) {
            StoreFailure::Connection(m) => VehicleDirectoryError::Connection(m),
            StoreFailure::Query(m) => VehicleDirectoryError::Query(m),
        })?;
        let row: Option<VehicleRow> = vehicles::table
            .filter(vehicles::plate.eq(plate.as_str()))
            .select(VehicleRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(store_error)?;
        row.map(|row| VehicleRecord::try_from(row).map_err(VehicleDirectoryError::query))
            .transpose()
    }

    async fn register(&self, vehicle: VehicleRecord) -> Result<(), VehicleDirectoryError> {
        let mut conn = self.pool.get().await.map_err(|err| match classify_pool(err) {
            StoreFailure::Connection(m) => VehicleDirectoryError::Connection(m),
            StoreFailure::Query(m) => VehicleDirectoryError::Query(m),
        })?;
        let row = VehicleRow::from(&vehicle);
        diesel::insert_into(vehicles::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    VehicleDirectoryError::DuplicatePlate
                }
                other => store_error(other),
            })?;
        Ok(())
    }
}
