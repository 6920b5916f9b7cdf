//! Outbound ports: the traits adapters implement for the domain services.

mod challan_repository;
mod notification_repository;
mod notification_sink;
mod user_repository;
mod vehicle_directory;

pub use challan_repository::{
    ChallanFilter, ChallanMutation, ChallanPage, ChallanRepository, ChallanRepositoryError,
    PageRequest, TransitionOutcome,
};
pub use notification_repository::{
    MarkReadOutcome, NotificationRepository, NotificationRepositoryError,
};
pub use notification_sink::{NoopNotificationSink, NotificationSink};
pub use user_repository::{
    LockoutPolicy, LoginFailureOutcome, UserRepository, UserRepositoryError,
    advance_failure_counters,
};
pub use vehicle_directory::{VehicleDirectory, VehicleDirectoryError};

#[cfg(test)]
pub use challan_repository::MockChallanRepository;
#[cfg(test)]
pub use notification_repository::MockNotificationRepository;
#[cfg(test)]
pub use notification_sink::MockNotificationSink;
#[cfg(test)]
pub use user_repository::MockUserRepository;
#[cfg(test)]
pub use vehicle_directory::MockVehicleDirectory;
