//! Bearer token extraction from the `Authorization` header.

use actix_web::HttpRequest;
use actix_web::http::header;

/// The bearer token presented on `req`, if any.
///
/// Returns `None` for a missing header, a non-ASCII value, or a scheme
/// other than `Bearer`; the session authority turns that into a 401.
#[must_use]
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
