//! Server construction and middleware wiring.

mod config;
mod state_builders;

use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};
use mockable::Clock;

pub use config::{AppConfig, ConfigError};
pub use state_builders::{MemoryBackedState, StateHandles, build_diesel_state, build_memory_state};

use crate::domain::token::TokenCodec;
use crate::inbound::http::{self, HealthState};
use crate::middleware::Trace;
use crate::outbound::persistence::{DbPool, PoolConfig};

/// Build the stores per configuration and start the HTTP server.
///
/// With `DATABASE_URL` set the Diesel adapters are used; without it the
/// server runs on in-memory stores, which suits local development only.
///
/// # Errors
/// [`std::io::Error`] when the pool cannot be built or the socket cannot
/// be bound.
pub async fn create_server(
    health_state: web::Data<HealthState>,
    config: AppConfig,
    clock: Arc<dyn Clock>,
) -> std::io::Result<Server> {
    let codec = TokenCodec::new(
        config.access_secret,
        config.refresh_secret,
        config.access_ttl,
        config.refresh_ttl,
    );
    let handles = match &config.database_url {
        Some(url) => {
            let pool = DbPool::connect(&PoolConfig::new(url.clone()))
                .await
                .map_err(std::io::Error::other)?;
            build_diesel_state(pool, codec, config.lockout, clock)
        }
        None => {
            tracing::warn!("no DATABASE_URL configured; using in-memory stores");
            build_memory_state(codec, config.lockout, clock).handles
        }
    };

    let http_state = web::Data::new(handles.http);
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(server_health_state.clone())
            .app_data(http_state.clone())
            .wrap(Trace)
            .configure(http::configure)
    })
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
