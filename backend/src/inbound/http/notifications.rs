//! Notification inbox handlers.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::bearer_token;
use super::state::HttpState;
use crate::domain::notification::{Notification, NotificationKind, NotificationPriority};
use crate::domain::Error;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_challan_id: Option<Uuid>,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind,
            priority: notification.priority,
            title: notification.title,
            message: notification.message,
            related_challan_id: notification.related_challan.map(|id| id.as_uuid()),
            is_read: notification.is_read,
            read_at: notification.read_at,
            created_at: notification.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    responses(
        (status = 200, description = "The caller's notifications, newest first", body = [NotificationResponse]),
        (status = 401, description = "Not authenticated", body = super::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
#[get("/notifications")]
pub async fn list(state: web::Data<HttpState>, req: HttpRequest) -> Result<HttpResponse, Error> {
    let caller = state.sessions.authorize(bearer_token(&req), &[]).await?;
    let notifications = state.notifications.list(&caller).await?;
    Ok(HttpResponse::Ok().json(
        notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Marked as read"),
        (status = 404, description = "Unknown notification", body = super::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
#[post("/notifications/{id}/read")]
pub async fn mark_read(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, Error> {
    let caller = state.sessions.authorize(bearer_token(&req), &[]).await?;
    state
        .notifications
        .mark_read(&caller, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
