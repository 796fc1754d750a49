mod api;
mod config;
mod db;
mod lifecycle;
mod rate_limit;
mod session;
mod state;
mod validation;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use rate_limit::RateLimiter;
use state::AppState;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "commontable_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load settings
    let settings = config::Settings::new().expect("Failed to load settings");

    // Initialize database
    let db = db::Database::new(&settings.database.path).expect("Failed to create database");

    db.initialize()
        .expect("Failed to initialize database schema");

    // Always seed test data for development
    db.seed_test_data().expect("Failed to seed test data");
    tracing::info!("Database initialized and seeded");

    // Create application state
    let state = AppState::new(db, settings.auth.email_domain.clone());

    // Run initial session cleanup on startup
    match state.session_manager.cleanup_expired_sessions() {
        Ok(count) if count > 0 => {
            tracing::info!("Cleaned up {} expired sessions on startup", count);
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!("Failed to cleanup expired sessions on startup: {}", e);
        }
    }

    // Background task for periodic session cleanup
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match cleanup_state.session_manager.cleanup_expired_sessions() {
                Ok(count) if count > 0 => {
                    tracing::info!("Periodic cleanup: removed {} expired sessions", count);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Periodic session cleanup failed: {}", e);
                }
            }
        }
    });

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Global rate limiter: 100 requests per minute per session
    let rate_limiter = RateLimiter::new(100, 60);

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Authentication routes
        .route("/auth/signup", post(api::auth::signup))
        .route("/auth/signin", post(api::auth::signin))
        .route("/auth/logout", post(api::auth::logout))
        .route("/auth/validate", get(api::auth::validate_session))
        // Cycle routes
        .route("/cycles/active", get(api::cycles::get_active_cycle))
        .route("/cycles/state", get(api::cycles::get_cycle_state))
        .route("/cycles/answer", post(api::cycles::submit_answer))
        .route("/cycles/skip", post(api::cycles::skip_prompt))
        .route("/cycles/opt-in", post(api::cycles::opt_in))
        .route("/cycles/opt-in", delete(api::cycles::opt_out))
        // Feed routes
        .route("/posts", get(api::posts::get_posts))
        .route("/posts", post(api::posts::create_post))
        .route("/posts/:id/upvote", post(api::posts::toggle_upvote))
        .route("/responses/:id/vote", post(api::posts::toggle_response_vote))
        // Profile routes
        .route("/profile", get(api::profile::get_profile))
        .route("/profile", put(api::profile::upsert_profile))
        // Group routes
        .route("/groups/current", get(api::groups::get_current_group))
        .route("/groups/history", get(api::groups::get_group_history))
        // Admin routes
        .route("/admin/cycles", get(api::admin::list_cycles))
        .route("/admin/cycles", post(api::admin::create_cycle))
        .route("/admin/cycles/test", post(api::admin::create_test_cycle))
        .route("/admin/cycles/:id/active", put(api::admin::set_cycle_active))
        .route("/admin/cycles/:id", delete(api::admin::delete_cycle))
        .route("/admin/cycles/:id/stats", get(api::admin::cycle_stats))
        .with_state(state)
        .layer(middleware::from_fn(rate_limit::rate_limit_middleware))
        .layer(axum::Extension(rate_limiter))
        .layer(cors);

    // Start server
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .expect("Failed to parse server address");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}

async fn health_check() -> &'static str {
    "OK"
}
