//! Builders wiring stores, services, and the notification writer into
//! [`HttpState`].

use std::sync::Arc;

use mockable::Clock;
use tokio::task::JoinHandle;

use crate::domain::ports::{
    ChallanRepository, LockoutPolicy, NotificationRepository, UserRepository, VehicleDirectory,
};
use crate::domain::token::TokenCodec;
use crate::domain::{ChallanService, NotificationService, SessionService};
use crate::inbound::http::HttpState;
use crate::outbound::notify::{notification_channel, spawn_notification_writer};
use crate::outbound::persistence::{
    DbPool, DieselChallanRepository, DieselNotificationRepository, DieselUserRepository,
    DieselVehicleDirectory, MemoryChallanRepository, MemoryNotificationRepository,
    MemoryUserRepository, MemoryVehicleDirectory,
};

/// Assembled HTTP state plus the notification writer driving the inbox.
pub struct StateHandles {
    pub http: HttpState,
    pub notification_writer: JoinHandle<()>,
}

/// Store handles behind a memory-backed [`StateHandles`], kept so tests and
/// dev servers can seed data directly.
pub struct MemoryBackedState {
    pub handles: StateHandles,
    pub users: Arc<MemoryUserRepository>,
    pub vehicles: Arc<MemoryVehicleDirectory>,
    pub challans: Arc<MemoryChallanRepository>,
    pub inbox: Arc<MemoryNotificationRepository>,
}

struct Stores {
    users: Arc<dyn UserRepository>,
    vehicles: Arc<dyn VehicleDirectory>,
    challans: Arc<dyn ChallanRepository>,
    inbox: Arc<dyn NotificationRepository>,
}

fn assemble(
    stores: Stores,
    codec: TokenCodec,
    lockout: LockoutPolicy,
    clock: Arc<dyn Clock>,
) -> StateHandles {
    let (sink, rx) = notification_channel();
    let notification_writer = spawn_notification_writer(stores.inbox.clone(), rx, clock.clone());

    let sessions = Arc::new(SessionService::new(
        stores.users,
        Arc::new(codec),
        clock.clone(),
        lockout,
    ));
    let challans = Arc::new(ChallanService::new(
        stores.challans,
        stores.vehicles,
        Arc::new(sink),
        clock.clone(),
    ));
    let notifications = Arc::new(NotificationService::new(stores.inbox, clock.clone()));

    StateHandles {
        http: HttpState {
            sessions,
            challans,
            notifications,
            clock,
        },
        notification_writer,
    }
}

/// Build state over in-memory stores. Used when no database is configured,
/// and by the integration test harness.
#[must_use]
pub fn build_memory_state(
    codec: TokenCodec,
    lockout: LockoutPolicy,
    clock: Arc<dyn Clock>,
) -> MemoryBackedState {
    let users = Arc::new(MemoryUserRepository::new());
    let vehicles = Arc::new(MemoryVehicleDirectory::new());
    let challans = Arc::new(MemoryChallanRepository::new());
    let inbox = Arc::new(MemoryNotificationRepository::new());

    let handles = assemble(
        Stores {
            users: users.clone(),
            vehicles: vehicles.clone(),
            challans: challans.clone(),
            inbox: inbox.clone(),
        },
        codec,
        lockout,
        clock,
    );
    MemoryBackedState {
        handles,
        users,
        vehicles,
        challans,
        inbox,
    }
}

/// Build state over Diesel-backed PostgreSQL stores sharing one pool.
#[must_use]
pub fn build_diesel_state(
    pool: DbPool,
    codec: TokenCodec,
    lockout: LockoutPolicy,
    clock: Arc<dyn Clock>,
) -> StateHandles {
    assemble(
        Stores {
            users: Arc::new(DieselUserRepository::new(pool.clone())),
            vehicles: Arc::new(DieselVehicleDirectory::new(pool.clone())),
            challans: Arc::new(DieselChallanRepository::new(pool.clone())),
            inbox: Arc::new(DieselNotificationRepository::new(pool)),
        },
        codec,
        lockout,
        clock,
    )
}
