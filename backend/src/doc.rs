//! OpenAPI documentation for the REST surface.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::{challans, error, notifications, session};

/// Adds the bearer token security scheme to the generated document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some(
                        "Access token issued by POST /api/v1/auth/login.",
                    ))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the citation service API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "E-challan backend API",
        description = "Traffic citation issuance, settlement, and dispute handling."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        session::register,
        session::login,
        session::refresh,
        session::logout,
        session::me,
        session::change_password,
        challans::issue,
        challans::list,
        challans::get,
        challans::pay,
        challans::dispute,
        challans::waive,
        challans::cancel,
        challans::search,
        notifications::list,
        notifications::mark_read,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        error::ErrorBody,
        session::RegisterRequest,
        session::LoginRequest,
        session::RefreshRequest,
        session::ChangePasswordRequest,
        session::TokenResponse,
        session::UserResponse,
        challans::IssueChallanRequest,
        challans::PayRequest,
        challans::DisputeRequest,
        challans::ResolutionRequest,
        challans::ChallanResponse,
        challans::ChallanListResponse,
        challans::SearchResponse,
        challans::PaymentView,
        challans::DisputeView,
        notifications::NotificationResponse,
    )),
    tags(
        (name = "auth", description = "Accounts and sessions"),
        (name = "challans", description = "Citation lifecycle"),
        (name = "notifications", description = "Per-user notification inbox"),
        (name = "health", description = "Orchestration probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_references_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/auth/register",
            "/api/v1/auth/login",
            "/api/v1/auth/refresh",
            "/api/v1/challans",
            "/api/v1/challans/{id}/pay",
            "/api/v1/challans/search/{plate}",
            "/api/v1/notifications",
            "/health/ready",
        ] {
            assert!(
                doc.paths.paths.contains_key(path),
                "missing path {path}"
            );
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
