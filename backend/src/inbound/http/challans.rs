//! Citation lifecycle handlers.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::auth::bearer_token;
use super::state::HttpState;
use crate::domain::auth::Role;
use crate::domain::challan::{
    Challan, ChallanId, ChallanRecord, ChallanStatus, PaymentMethod, PaymentStatus,
};
use crate::domain::challan_service::ListQuery;
use crate::domain::ports::{ChallanPage, PageRequest};
use crate::domain::vehicle::PlateNumber;
use crate::domain::Error;

const STAFF: &[Role] = &[Role::Officer, Role::Admin];

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueChallanRequest {
    #[schema(example = "DL01AB1234")]
    pub plate_number: String,
    #[schema(example = "Signal jumping")]
    pub violation: String,
    pub description: Option<String>,
    #[schema(example = 2000)]
    pub fine_amount: u64,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    #[schema(example = "upi")]
    pub method: String,
    /// Reference from the external payment gateway, if any.
    #[schema(example = "TXN123456")]
    pub transaction_ref: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisputeRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    pub note: Option<String>,
}

/// Listing filters and paging, all optional.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub plate: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub receipt_number: String,
    pub method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_ref: Option<String>,
    pub paid_at: chrono::DateTime<chrono::Utc>,
    pub paid_by: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisputeView {
    pub reason: String,
    pub raised_at: chrono::DateTime<chrono::Utc>,
}

/// Wire shape of one citation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallanResponse {
    pub id: Uuid,
    #[schema(example = "ECH26081234")]
    pub citation_number: String,
    pub plate_number: String,
    pub owner_name: String,
    pub violation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fine_amount: u64,
    pub late_fee: u64,
    pub total_amount: u64,
    pub location: String,
    pub issued_at: chrono::DateTime<chrono::Utc>,
    pub due_date: chrono::DateTime<chrono::Utc>,
    pub status: ChallanStatus,
    pub payment_status: PaymentStatus,
    pub is_overdue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute: Option<DisputeView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
}

impl ChallanResponse {
    fn from_record(record: ChallanRecord, now: chrono::DateTime<chrono::Utc>) -> Self {
        let challan = Challan::from_record(record);
        let is_overdue = challan.is_overdue(now);
        let total_amount = challan.total_amount();
        let record = challan.into_record();
        Self {
            id: record.id.as_uuid(),
            citation_number: record.citation_number.as_str().to_owned(),
            plate_number: record.plate.as_str().to_owned(),
            owner_name: record.owner_name,
            violation: record.violation,
            description: record.description,
            fine_amount: record.fine_amount,
            late_fee: record.late_fee,
            total_amount,
            location: record.location,
            issued_at: record.issued_at,
            due_date: record.due_date,
            status: record.status,
            payment_status: record.payment_status,
            is_overdue,
            payment: record.payment.map(|payment| PaymentView {
                receipt_number: payment.receipt.as_str().to_owned(),
                method: payment.method,
                transaction_ref: payment.transaction_ref,
                paid_at: payment.paid_at,
                paid_by: payment.paid_by.as_uuid(),
            }),
            dispute: record.dispute.map(|details| DisputeView {
                reason: details.reason,
                raised_at: details.raised_at,
            }),
            resolution_note: record.resolution_note,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallanListResponse {
    pub items: Vec<ChallanResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl ChallanListResponse {
    fn from_page(page: ChallanPage, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            items: page
                .items
                .into_iter()
                .map(|record| ChallanResponse::from_record(record, now))
                .collect(),
        }
    }
}

/// Public plate lookup result.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub plate_number: String,
    pub items: Vec<ChallanResponse>,
}

fn parse_query(params: ListParams) -> Result<(ListQuery, PageRequest), Error> {
    let status = params
        .status
        .as_deref()
        .map(|raw| {
            ChallanStatus::parse(raw)
                .ok_or_else(|| Error::invalid_request(format!("unknown status {raw:?}")))
        })
        .transpose()?;
    let payment_status = params
        .payment_status
        .as_deref()
        .map(|raw| {
            PaymentStatus::parse(raw)
                .ok_or_else(|| Error::invalid_request(format!("unknown payment status {raw:?}")))
        })
        .transpose()?;
    let plate = params
        .plate
        .as_deref()
        .map(parse_plate)
        .transpose()?;
    let page = PageRequest::new(
        params.page.unwrap_or(1),
        params.page_size.unwrap_or(PageRequest::DEFAULT_SIZE),
    );
    Ok((
        ListQuery {
            status,
            payment_status,
            plate,
        },
        page,
    ))
}

fn parse_plate(raw: &str) -> Result<PlateNumber, Error> {
    PlateNumber::parse(raw).map_err(|_| Error::invalid_request("plate number must not be empty"))
}

fn parse_method(raw: &str) -> Result<PaymentMethod, Error> {
    PaymentMethod::parse(raw)
        .ok_or_else(|| Error::invalid_request(format!("unknown payment method {raw:?}")))
}

#[utoipa::path(
    post,
    path = "/api/v1/challans",
    request_body = IssueChallanRequest,
    responses(
        (status = 201, description = "Citation issued", body = ChallanResponse),
        (status = 403, description = "Caller is not staff", body = super::error::ErrorBody),
        (status = 404, description = "Plate not registered", body = super::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "challans"
)]
#[post("/challans")]
pub async fn issue(
    state: web::Data<HttpState>,
    req: HttpRequest,
    body: web::Json<IssueChallanRequest>,
) -> Result<HttpResponse, Error> {
    let caller = state.sessions.authorize(bearer_token(&req), STAFF).await?;
    let body = body.into_inner();
    let draft = crate::domain::challan::ChallanDraft {
        plate: parse_plate(&body.plate_number)?,
        violation: body.violation,
        description: body.description,
        fine_amount: body.fine_amount,
        location: body.location,
    };
    let record = state.challans.issue(&caller, draft).await?;
    Ok(HttpResponse::Created().json(ChallanResponse::from_record(record, state.clock.utc())))
}

#[utoipa::path(
    get,
    path = "/api/v1/challans",
    params(ListParams),
    responses(
        (status = 200, description = "Citations visible to the caller", body = ChallanListResponse),
        (status = 401, description = "Not authenticated", body = super::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "challans"
)]
#[get("/challans")]
pub async fn list(
    state: web::Data<HttpState>,
    req: HttpRequest,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, Error> {
    let caller = state.sessions.authorize(bearer_token(&req), &[]).await?;
    let (query, page) = parse_query(params.into_inner())?;
    let page = state.challans.list(&caller, query, page).await?;
    Ok(HttpResponse::Ok().json(ChallanListResponse::from_page(page, state.clock.utc())))
}

#[utoipa::path(
    get,
    path = "/api/v1/challans/{id}",
    params(("id" = Uuid, Path, description = "Citation id")),
    responses(
        (status = 200, description = "The citation", body = ChallanResponse),
        (status = 404, description = "Unknown citation", body = super::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "challans"
)]
#[get("/challans/{id}")]
pub async fn get(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, Error> {
    let caller = state.sessions.authorize(bearer_token(&req), &[]).await?;
    let record = state
        .challans
        .get(&caller, ChallanId::from_uuid(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(ChallanResponse::from_record(record, state.clock.utc())))
}

#[utoipa::path(
    post,
    path = "/api/v1/challans/{id}/pay",
    params(("id" = Uuid, Path, description = "Citation id")),
    request_body = PayRequest,
    responses(
        (status = 200, description = "Citation settled", body = ChallanResponse),
        (status = 409, description = "Already paid or not payable", body = super::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "challans"
)]
#[post("/challans/{id}/pay")]
pub async fn pay(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<PayRequest>,
) -> Result<HttpResponse, Error> {
    let caller = state.sessions.authorize(bearer_token(&req), &[]).await?;
    let body = body.into_inner();
    let method = parse_method(&body.method)?;
    let record = state
        .challans
        .pay(
            &caller,
            ChallanId::from_uuid(path.into_inner()),
            method,
            body.transaction_ref,
        )
        .await?;
    Ok(HttpResponse::Ok().json(ChallanResponse::from_record(record, state.clock.utc())))
}

#[utoipa::path(
    post,
    path = "/api/v1/challans/{id}/dispute",
    params(("id" = Uuid, Path, description = "Citation id")),
    request_body = DisputeRequest,
    responses(
        (status = 200, description = "Dispute opened", body = ChallanResponse),
        (status = 409, description = "Citation is not pending", body = super::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "challans"
)]
#[post("/challans/{id}/dispute")]
pub async fn dispute(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<DisputeRequest>,
) -> Result<HttpResponse, Error> {
    let caller = state.sessions.authorize(bearer_token(&req), &[]).await?;
    let record = state
        .challans
        .dispute(
            &caller,
            ChallanId::from_uuid(path.into_inner()),
            body.into_inner().reason,
        )
        .await?;
    Ok(HttpResponse::Ok().json(ChallanResponse::from_record(record, state.clock.utc())))
}

#[utoipa::path(
    post,
    path = "/api/v1/challans/{id}/waive",
    params(("id" = Uuid, Path, description = "Citation id")),
    request_body = ResolutionRequest,
    responses(
        (status = 200, description = "Citation waived", body = ChallanResponse),
        (status = 403, description = "Caller is not staff", body = super::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "challans"
)]
#[post("/challans/{id}/waive")]
pub async fn waive(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<ResolutionRequest>,
) -> Result<HttpResponse, Error> {
    let caller = state.sessions.authorize(bearer_token(&req), STAFF).await?;
    let record = state
        .challans
        .waive(
            &caller,
            ChallanId::from_uuid(path.into_inner()),
            body.into_inner().note,
        )
        .await?;
    Ok(HttpResponse::Ok().json(ChallanResponse::from_record(record, state.clock.utc())))
}

#[utoipa::path(
    post,
    path = "/api/v1/challans/{id}/cancel",
    params(("id" = Uuid, Path, description = "Citation id")),
    request_body = ResolutionRequest,
    responses(
        (status = 200, description = "Citation cancelled", body = ChallanResponse),
        (status = 403, description = "Caller is not staff", body = super::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "challans"
)]
#[post("/challans/{id}/cancel")]
pub async fn cancel(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<ResolutionRequest>,
) -> Result<HttpResponse, Error> {
    let caller = state.sessions.authorize(bearer_token(&req), STAFF).await?;
    let record = state
        .challans
        .cancel(
            &caller,
            ChallanId::from_uuid(path.into_inner()),
            body.into_inner().note,
        )
        .await?;
    Ok(HttpResponse::Ok().json(ChallanResponse::from_record(record, state.clock.utc())))
}

#[utoipa::path(
    get,
    path = "/api/v1/challans/search/{plate}",
    params(("plate" = String, Path, description = "Vehicle plate number")),
    responses(
        (status = 200, description = "Outstanding citations for the plate", body = SearchResponse),
        (status = 400, description = "Malformed plate", body = super::error::ErrorBody),
    ),
    tag = "challans"
)]
#[get("/challans/search/{plate}")]
pub async fn search(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let plate = parse_plate(&path.into_inner())?;
    // Anonymous lookups are fine; an identified caller is recorded for audit.
    if let Some(caller) = state.sessions.optional_authorize(bearer_token(&req)).await {
        tracing::debug!(plate = %plate, user = %caller.id.as_uuid(), "plate lookup");
    }
    let records = state.challans.search_by_plate(&plate).await?;
    let now = state.clock.utc();
    Ok(HttpResponse::Ok().json(SearchResponse {
        plate_number: plate.as_str().to_owned(),
        items: records
            .into_iter()
            .map(|record| ChallanResponse::from_record(record, now))
            .collect(),
    }))
}
