use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use darkroom_client::{BrokerClient, GatewayClient, StoreClient, UserClient};

pub mod adapters;
pub mod api;
pub mod config;
pub mod db;
pub mod ports;
pub mod repository;
pub mod service;
pub mod workdir;

#[cfg(test)]
pub mod testutil;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "darkroom_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Darkroom Orchestrator...");

    let config = config::Config::from_env();
    config.validate().expect("Invalid configuration");

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // Wire the orchestrator from its explicit collaborators
    let orchestrator = Arc::new(service::pipeline::Orchestrator::new(
        Arc::new(repository::PgRunStateStore::new(pool.clone())),
        Arc::new(repository::PgProjectStore::new(pool)),
        Arc::new(adapters::StoreArtifacts::new(StoreClient::new(
            &config.store_url,
        ))),
        Arc::new(adapters::BrokerQueue::new(BrokerClient::new(
            &config.broker_url,
        ))),
        Arc::new(adapters::GatewayNotifier::new(GatewayClient::new(
            &config.gateway_url,
        ))),
        Arc::new(adapters::UserEntitlements::new(UserClient::new(
            &config.users_url,
        ))),
        workdir::WorkDirs::new(&config.workdir_root),
    ));

    // Build router with all API endpoints
    let app = api::create_router(orchestrator);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
