//! UNIBUS Backend
//!
//! REST backend for school-bus transportation coordination: routes, student
//! and driver accounts, route subscriptions, and notification dispatch with
//! per-recipient delivery tracking. SQLite persistence.

mod api;
mod auth;
mod config;
mod db;
mod dispatch;
mod errors;
mod models;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use dispatch::DispatchEngine;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub dispatch: Arc<DispatchEngine>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting UNIBUS Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool.clone()));
    let dispatch = Arc::new(DispatchEngine::new(pool));

    // Create application state
    let state = AppState {
        repo,
        dispatch,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Routes
        .route("/routes", post(api::create_route))
        .route("/routes", get(api::list_routes))
        .route(
            "/routes/{route_id}/students/{student_id}",
            get(api::route_detail),
        )
        // Students
        .route("/students", post(api::create_student))
        .route("/students", get(api::list_students))
        .route("/students/login", post(api::student_login))
        // Drivers
        .route("/drivers", post(api::create_driver))
        .route("/drivers", get(api::list_drivers))
        .route("/drivers/{id}", put(api::update_driver))
        .route("/drivers/login", post(api::driver_login))
        // School administrations
        .route("/admins", post(api::create_admin))
        .route("/admins", get(api::list_admins))
        .route("/admins/login", post(api::admin_login))
        // Subscriptions
        .route("/subscriptions", post(api::enroll))
        .route("/subscriptions", delete(api::unenroll))
        .route(
            "/subscriptions/by-route/{route_id}",
            get(api::subscribers_by_route),
        )
        .route(
            "/subscriptions/by-student/{student_id}",
            get(api::routes_by_student),
        )
        // Notifications
        .route("/notifications/send", post(api::send_notification))
        .route("/notifications/inbox/{profile_id}", get(api::inbox))
        .route("/notifications/{delivery_id}/read", put(api::mark_read))
        .route("/notifications/history", get(api::notification_history))
        .route("/notifications/sends/{send_id}", delete(api::delete_send));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
