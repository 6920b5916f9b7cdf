//! Shared application state injected into every handler.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::{ChallanService, NotificationService, SessionService};

/// Service handles shared by the HTTP layer.
#[derive(Clone)]
pub struct HttpState {
    pub sessions: Arc<SessionService>,
    pub challans: Arc<ChallanService>,
    pub notifications: Arc<NotificationService>,
    pub clock: Arc<dyn Clock>,
}
