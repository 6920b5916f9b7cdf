//! HTTP inbound adapter exposing the REST surface.
//!
//! ```text
//! POST /api/v1/auth/register          Create a citizen account
//! POST /api/v1/auth/login             Open a session
//! POST /api/v1/auth/refresh           Rotate a token pair
//! POST /api/v1/auth/logout            Revoke the refresh token
//! GET  /api/v1/auth/me                The caller's account
//! POST /api/v1/auth/change-password   Change password, revoke refresh
//! POST /api/v1/challans               Issue a citation (staff)
//! GET  /api/v1/challans               List citations
//! GET  /api/v1/challans/{id}          Fetch one citation
//! POST /api/v1/challans/{id}/pay      Settle a citation
//! POST /api/v1/challans/{id}/dispute  Open a dispute
//! POST /api/v1/challans/{id}/waive    Waive a citation (staff)
//! POST /api/v1/challans/{id}/cancel   Cancel a citation (staff)
//! GET  /api/v1/challans/search/{plate} Public outstanding lookup
//! GET  /api/v1/notifications          The caller's inbox
//! POST /api/v1/notifications/{id}/read Mark one as read
//! GET  /health/live, /health/ready    Probes
//! ```

pub mod auth;
pub mod challans;
pub mod error;
pub mod health;
pub mod notifications;
pub mod session;
pub mod state;

use actix_web::web;

pub use error::ErrorBody;
pub use health::HealthState;
pub use state::HttpState;

/// Register every route under `/api/v1`, plus the root-level probes.
///
/// `HttpState` and `HealthState` must be supplied as app data by the
/// caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::live).service(health::ready).service(
        web::scope("/api/v1")
            .service(session::register)
            .service(session::login)
            .service(session::refresh)
            .service(session::logout)
            .service(session::me)
            .service(session::change_password)
            .service(challans::issue)
            .service(challans::list)
            .service(challans::search)
            .service(challans::get)
            .service(challans::pay)
            .service(challans::dispute)
            .service(challans::waive)
            .service(challans::cancel)
            .service(notifications::list)
            .service(notifications::mark_read),
    );
}
