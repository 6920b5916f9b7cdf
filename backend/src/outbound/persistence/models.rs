//! Diesel row structs and their conversions to and from domain types.
//!
//! Enums travel as their canonical string encodings; a row that fails to
//! parse back is reported as a query error rather than silently coerced.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{challans, notifications, users, vehicles};
use crate::domain::auth::Role;
use crate::domain::challan::{
    ChallanId, ChallanRecord, ChallanStatus, CitationNumber, DisputeDetails, PaymentDetails,
    PaymentMethod, PaymentStatus, ReceiptNumber,
};
use crate::domain::notification::{Notification, NotificationKind, NotificationPriority};
use crate::domain::user::{Email, UserAccount, UserId};
use crate::domain::vehicle::{PlateNumber, VehicleRecord};

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub password_hash: String,
    pub role: String,
    pub failed_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub refresh_token_fingerprint: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserAccount> for UserRow {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id.as_uuid(),
            email: account.email.as_str().to_owned(),
            full_name: account.full_name.clone(),
            phone: account.phone.clone(),
            password_hash: account.password_hash.clone(),
            role: account.role.as_str().to_owned(),
            failed_attempts: i32::try_from(account.failed_attempts).unwrap_or(i32::MAX),
            locked_until: account.locked_until,
            is_active: account.is_active,
            refresh_token_fingerprint: account.refresh_token_fingerprint.clone(),
            last_login: account.last_login,
            created_at: account.created_at,
        }
    }
}

impl TryFrom<UserRow> for UserAccount {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| format!("unknown role {:?} on user {}", row.role, row.id))?;
        let email = Email::parse(&row.email)
            .map_err(|_| format!("malformed email on user {}", row.id))?;
        let failed_attempts = u32::try_from(row.failed_attempts)
            .map_err(|_| format!("negative failure counter on user {}", row.id))?;
        Ok(Self {
            id: UserId::from_uuid(row.id),
            email,
            full_name: row.full_name,
            phone: row.phone,
            password_hash: row.password_hash,
            role,
            failed_attempts,
            locked_until: row.locked_until,
            is_active: row.is_active,
            refresh_token_fingerprint: row.refresh_token_fingerprint,
            last_login: row.last_login,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = vehicles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VehicleRow {
    pub id: Uuid,
    pub plate: String,
    pub owner_id: Uuid,
    pub owner_name: String,
    pub owner_phone: String,
    pub vehicle_type: String,
    pub make: Option<String>,
    pub model: Option<String>,
}

impl From<&VehicleRecord> for VehicleRow {
    fn from(vehicle: &VehicleRecord) -> Self {
        Self {
            id: vehicle.id,
            plate: vehicle.plate.as_str().to_owned(),
            owner_id: vehicle.owner_id.as_uuid(),
            owner_name: vehicle.owner_name.clone(),
            owner_phone: vehicle.owner_phone.clone(),
            vehicle_type: vehicle.vehicle_type.clone(),
            make: vehicle.make.clone(),
            model: vehicle.model.clone(),
        }
    }
}

impl TryFrom<VehicleRow> for VehicleRecord {
    type Error = String;

    fn try_from(row: VehicleRow) -> Result<Self, Self::Error> {
        let plate = PlateNumber::parse(&row.plate)
            .map_err(|_| format!("blank plate on vehicle {}", row.id))?;
        Ok(Self {
            id: row.id,
            plate,
            owner_id: UserId::from_uuid(row.owner_id),
            owner_name: row.owner_name,
            owner_phone: row.owner_phone,
            vehicle_type: row.vehicle_type,
            make: row.make,
            model: row.model,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = challans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChallanRow {
    pub id: Uuid,
    pub citation_number: String,
    pub plate: String,
    pub vehicle_id: Uuid,
    pub owner_id: Uuid,
    pub owner_name: String,
    pub owner_phone: String,
    pub violation: String,
    pub description: Option<String>,
    pub fine_amount: i64,
    pub late_fee: i64,
    pub location: String,
    pub issued_by: Uuid,
    pub issued_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: String,
    pub payment_status: String,
    pub payment_receipt: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_ref: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<Uuid>,
    pub dispute_reason: Option<String>,
    pub disputed_at: Option<DateTime<Utc>>,
    pub resolution_note: Option<String>,
}

impl From<&ChallanRecord> for ChallanRow {
    fn from(record: &ChallanRecord) -> Self {
        Self {
            id: record.id.as_uuid(),
            citation_number: record.citation_number.as_str().to_owned(),
            plate: record.plate.as_str().to_owned(),
            vehicle_id: record.vehicle_id,
            owner_id: record.owner_id.as_uuid(),
            owner_name: record.owner_name.clone(),
            owner_phone: record.owner_phone.clone(),
            violation: record.violation.clone(),
            description: record.description.clone(),
            fine_amount: i64::try_from(record.fine_amount).unwrap_or(i64::MAX),
            late_fee: i64::try_from(record.late_fee).unwrap_or(i64::MAX),
            location: record.location.clone(),
            issued_by: record.issued_by.as_uuid(),
            issued_at: record.issued_at,
            due_date: record.due_date,
            status: record.status.as_str().to_owned(),
            payment_status: record.payment_status.as_str().to_owned(),
            payment_receipt: record
                .payment
                .as_ref()
                .map(|p| p.receipt.as_str().to_owned()),
            payment_method: record
                .payment
                .as_ref()
                .map(|p| p.method.as_str().to_owned()),
            transaction_ref: record
                .payment
                .as_ref()
                .and_then(|p| p.transaction_ref.clone()),
            paid_at: record.payment.as_ref().map(|p| p.paid_at),
            paid_by: record.payment.as_ref().map(|p| p.paid_by.as_uuid()),
            dispute_reason: record.dispute.as_ref().map(|d| d.reason.clone()),
            disputed_at: record.dispute.as_ref().map(|d| d.raised_at),
            resolution_note: record.resolution_note.clone(),
        }
    }
}

impl TryFrom<ChallanRow> for ChallanRecord {
    type Error = String;

    fn try_from(row: ChallanRow) -> Result<Self, Self::Error> {
        let status = ChallanStatus::parse(&row.status)
            .ok_or_else(|| format!("unknown status {:?} on citation {}", row.status, row.id))?;
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            format!(
                "unknown payment status {:?} on citation {}",
                row.payment_status, row.id
            )
        })?;
        let plate = PlateNumber::parse(&row.plate)
            .map_err(|_| format!("blank plate on citation {}", row.id))?;
        let fine_amount = u64::try_from(row.fine_amount)
            .map_err(|_| format!("negative fine on citation {}", row.id))?;
        let late_fee = u64::try_from(row.late_fee)
            .map_err(|_| format!("negative late fee on citation {}", row.id))?;

        let payment = match (
            row.payment_receipt,
            row.payment_method,
            row.paid_at,
            row.paid_by,
        ) {
            (Some(receipt), Some(method), Some(paid_at), Some(paid_by)) => {
                let method = PaymentMethod::parse(&method).ok_or_else(|| {
                    format!("unknown payment method {method:?} on citation {}", row.id)
                })?;
                Some(PaymentDetails {
                    receipt: ReceiptNumber::from_raw(receipt),
                    method,
                    transaction_ref: row.transaction_ref,
                    paid_at,
                    paid_by: UserId::from_uuid(paid_by),
                })
            }
            (None, None, None, None) => None,
            _ => return Err(format!("inconsistent payment columns on citation {}", row.id)),
        };
        let dispute = match (row.dispute_reason, row.disputed_at) {
            (Some(reason), Some(raised_at)) => Some(DisputeDetails { reason, raised_at }),
            (None, None) => None,
            _ => return Err(format!("inconsistent dispute columns on citation {}", row.id)),
        };

        Ok(Self {
            id: ChallanId::from_uuid(row.id),
            citation_number: CitationNumber::from_raw(row.citation_number),
            plate,
            vehicle_id: row.vehicle_id,
            owner_id: UserId::from_uuid(row.owner_id),
            owner_name: row.owner_name,
            owner_phone: row.owner_phone,
            violation: row.violation,
            description: row.description,
            fine_amount,
            late_fee,
            location: row.location,
            issued_by: UserId::from_uuid(row.issued_by),
            issued_at: row.issued_at,
            due_date: row.due_date,
            status,
            payment_status,
            payment,
            dispute,
            resolution_note: row.resolution_note,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub priority: String,
    pub title: String,
    pub message: String,
    pub related_challan: Option<Uuid>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationRow {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            user_id: notification.user_id.as_uuid(),
            kind: notification.kind.as_str().to_owned(),
            priority: notification.priority.as_str().to_owned(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            related_challan: notification.related_challan.map(|id| id.as_uuid()),
            is_read: notification.is_read,
            read_at: notification.read_at,
            created_at: notification.created_at,
        }
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = String;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = NotificationKind::parse(&row.kind)
            .ok_or_else(|| format!("unknown kind {:?} on notification {}", row.kind, row.id))?;
        let priority = NotificationPriority::parse(&row.priority).ok_or_else(|| {
            format!(
                "unknown priority {:?} on notification {}",
                row.priority, row.id
            )
        })?;
        Ok(Self {
            id: row.id,
            user_id: UserId::from_uuid(row.user_id),
            kind,
            priority,
            title: row.title,
            message: row.message,
            related_challan: row.related_challan.map(ChallanId::from_uuid),
            is_read: row.is_read,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}
