//! Service entry-point: loads settings, wires adapters and runs the HTTP
//! server alongside the rating consumers.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use course_service::inbound::amqp::RatingConsumer;
use course_service::inbound::http::auth::TokenVerifier;
use course_service::inbound::http::health::HealthState;
use course_service::outbound::identity::HttpIdentityDirectory;
use course_service::outbound::persistence::DbPool;
use course_service::settings::ServiceSettings;

use server::{Repositories, ServerConfig, build_services, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let mut settings = ServiceSettings::load_from_iter(std::env::args_os())
        .wrap_err("failed to load settings")?;
    info!(?settings, "settings loaded");

    let secret = settings
        .take_jwt_secret()
        .ok_or_else(|| eyre!("COURSE_JWT_SECRET must be set"))?;
    let tokens = Arc::new(
        TokenVerifier::from_base64_secret(secret.as_str())
            .wrap_err("COURSE_JWT_SECRET is not valid base64")?,
    );
    drop(secret);

    let pool_config = settings
        .pool_config()
        .ok_or_else(|| eyre!("COURSE_DATABASE_URL must be set"))?;
    let pool = DbPool::new(pool_config)
        .await
        .wrap_err("failed to build database pool")?;

    let bind_addr = settings.bind_addr().wrap_err("invalid bind address")?;
    let mut config = ServerConfig::new(bind_addr, Repositories::diesel(&pool), tokens)
        .with_breaker(settings.breaker())
        .with_catalogue(settings.catalogue())
        .with_retry_policy(settings.retry_policy());
    match settings.identity_url().wrap_err("invalid identity URL")? {
        Some(base_url) => {
            let directory = HttpIdentityDirectory::new(&base_url, settings.identity_timeout())
                .wrap_err("failed to build identity client")?;
            info!(endpoint = %directory.endpoint(), "identity lookups enabled");
            config = config.with_identity(Arc::new(directory));
        }
        None => warn!("no identity service configured; instructor profiles use the fixture"),
    }

    let graph = build_services(&config);
    let health = Arc::new(HealthState::new());

    let consumers = match settings.amqp_uri.as_deref() {
        Some(uri) => Arc::new(RatingConsumer::new(
            Arc::clone(&graph.ratings),
            Arc::clone(&health),
            settings.prefetch(),
        ))
        .spawn(uri),
        None => {
            warn!("no AMQP broker configured; rating events are not consumed");
            Vec::new()
        }
    };

    let health_data = web::Data::from(Arc::clone(&health));
    let server = create_server(health_data, graph.http_state, &config)
        .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;
    health.mark_ready();
    info!(%bind_addr, "course service listening");

    let outcome = server.await;
    health.mark_unhealthy();
    for handle in consumers {
        handle.abort();
    }
    outcome.wrap_err("HTTP server failed")
}
