//! Diesel table definitions, kept in lockstep with `backend/migrations/`.

diesel::table! {
    users (id) {
        id -> Uuid,
        email -> Varchar,
        full_name -> Varchar,
        phone -> Varchar,
        password_hash -> Varchar,
        role -> Varchar,
        failed_attempts -> Int4,
        locked_until -> Nullable<Timestamptz>,
        is_active -> Bool,
        refresh_token_fingerprint -> Nullable<Varchar>,
        last_login -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    vehicles (id) {
        id -> Uuid,
        plate -> Varchar,
        owner_id -> Uuid,
        owner_name -> Varchar,
        owner_phone -> Varchar,
        vehicle_type -> Varchar,
        make -> Nullable<Varchar>,
        model -> Nullable<Varchar>,
    }
}

diesel::table! {
    challans (id) {
        id -> Uuid,
        citation_number -> Varchar,
        plate -> Varchar,
        vehicle_id -> Uuid,
        owner_id -> Uuid,
        owner_name -> Varchar,
        owner_phone -> Varchar,
        violation -> Text,
        description -> Nullable<Text>,
        fine_amount -> Int8,
        late_fee -> Int8,
        location -> Varchar,
        issued_by -> Uuid,
        issued_at -> Timestamptz,
        due_date -> Timestamptz,
        status -> Varchar,
        payment_status -> Varchar,
        payment_receipt -> Nullable<Varchar>,
        payment_method -> Nullable<Varchar>,
        transaction_ref -> Nullable<Varchar>,
        paid_at -> Nullable<Timestamptz>,
        paid_by -> Nullable<Uuid>,
        dispute_reason -> Nullable<Text>,
        disputed_at -> Nullable<Timestamptz>,
        resolution_note -> Nullable<Text>,
    }
}

diesel::table! {
    notifications (id) {
        id -> Uuid,
        user_id -> Uuid,
        kind -> Varchar,
        priority -> Varchar,
        title -> Varchar,
        message -> Text,
        related_challan -> Nullable<Uuid>,
        is_read -> Bool,
        read_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(users, vehicles, challans, notifications);
