//! Domain layer: entities, ports, and the services behind the HTTP surface.

pub mod auth;
pub mod challan;
pub mod challan_service;
pub mod error;
pub mod notification;
pub mod notification_service;
pub mod password;
pub mod ports;
pub mod session_service;
pub mod token;
pub mod user;
pub mod vehicle;

pub use challan_service::{ChallanService, ListQuery};
pub use error::{DomainResult, Error, ErrorCode};
pub use notification_service::NotificationService;
pub use session_service::{NewAccount, SessionService, SessionTokens};
