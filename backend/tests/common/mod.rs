//! Shared harness for integration tests: a settable clock, a memory-backed
//! server state, and seeding helpers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use uuid::Uuid;
use zeroize::Zeroizing;

use echallan_backend::domain::auth::Role;
use echallan_backend::domain::password::hash_password;
use echallan_backend::domain::ports::{LockoutPolicy, UserRepository, VehicleDirectory};
use echallan_backend::domain::token::TokenCodec;
use echallan_backend::domain::user::{Email, UserAccount, UserId};
use echallan_backend::domain::vehicle::{PlateNumber, VehicleRecord};
use echallan_backend::server::{MemoryBackedState, build_memory_state};

/// Test clock that the harness can move forward between requests.
pub struct MutableClock {
    now: Mutex<DateTime<Utc>>,
}

impl MutableClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

pub struct TestBackend {
    pub state: MemoryBackedState,
    pub clock: Arc<MutableClock>,
}

pub fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 14, 9, 30, 0).single().expect("valid instant")
}

/// Memory-backed state with short token TTLs and the default lockout policy.
pub fn test_backend() -> TestBackend {
    let clock = Arc::new(MutableClock::starting_at(start_instant()));
    let codec = TokenCodec::new(
        Zeroizing::new("integration-access-secret".to_owned()),
        Zeroizing::new("integration-refresh-secret".to_owned()),
        Duration::from_secs(900),
        Duration::from_secs(86_400),
    );
    let state = build_memory_state(codec, LockoutPolicy::default(), clock.clone());
    TestBackend { state, clock }
}

pub async fn seed_user(backend: &TestBackend, email: &str, password: &str, role: Role) -> UserId {
    let id = UserId::random();
    let account = UserAccount {
        id,
        email: Email::parse(email).expect("seed email"),
        full_name: "Seeded User".to_owned(),
        phone: "9876543210".to_owned(),
        password_hash: hash_password(password).expect("seed hash"),
        role,
        failed_attempts: 0,
        locked_until: None,
        is_active: true,
        refresh_token_fingerprint: None,
        last_login: None,
        created_at: start_instant(),
    };
    backend
        .state
        .users
        .insert(account)
        .await
        .expect("seed user");
    id
}

pub async fn seed_vehicle(backend: &TestBackend, plate: &str, owner_id: UserId) {
    backend
        .state
        .vehicles
        .register(VehicleRecord {
            id: Uuid::new_v4(),
            plate: PlateNumber::parse(plate).expect("seed plate"),
            owner_id,
            owner_name: "Amit Kumar".to_owned(),
            owner_phone: "9876543210".to_owned(),
            vehicle_type: "car".to_owned(),
            make: Some("Maruti".to_owned()),
            model: Some("Swift".to_owned()),
        })
        .await
        .expect("seed vehicle");
}

/// Poll until `probe` yields `Some`, or give up after ~2 seconds. Used for
/// effects that land via the async notification writer.
pub async fn eventually<T, F, Fut>(mut probe: F) -> T
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    for _ in 0..200 {
        if let Some(value) = probe().await {
            return value;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
