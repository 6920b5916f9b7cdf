//! Persistence adapters: Diesel/PostgreSQL for deployments with a database,
//! in-memory maps for tests and pool-less runs.

mod diesel_challan_repository;
mod diesel_error_mapping;
mod diesel_notification_repository;
mod diesel_user_repository;
mod diesel_vehicle_directory;
mod memory;
mod models;
mod pool;
pub mod schema;

pub use diesel_challan_repository::DieselChallanRepository;
pub use diesel_notification_repository::DieselNotificationRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use diesel_vehicle_directory::DieselVehicleDirectory;
pub use memory::{
    MemoryChallanRepository, MemoryNotificationRepository, MemoryUserRepository,
    MemoryVehicleDirectory,
};
pub use models::{ChallanRow, NotificationRow, UserRow, VehicleRow};
pub use pool::{DbPool, PoolConfig, PoolError};
