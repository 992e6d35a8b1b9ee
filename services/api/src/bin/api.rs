//! services/api/src/bin/api.rs

use api_lib::{
    adapters::DbAdapter,
    config::Config,
    error::ApiError,
    web::{admin, auth, middleware, require_auth, rest, state::AppState, ws_handler, ChangeFeed},
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Shared AppState ---
    // The change feed is created here, once: one publish side shared by every
    // handler, one subscription per dashboard connection.
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        feed: ChangeFeed::new(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/contact", post(rest::submit_contact_handler));

    // Routes any authenticated session may use, regardless of role.
    let session_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/me/active", put(auth::update_active_handler))
        .route("/ws", get(ws_handler));

    // One router per dashboard, each behind its role gate.
    let donor_routes = Router::new()
        .route("/donations", post(rest::create_donation_handler))
        .route("/donations/mine", get(rest::my_donations_handler))
        .layer(axum_middleware::from_fn(middleware::require_donor));

    let ngo_routes = Router::new()
        .route("/donations/available", get(rest::available_donations_handler))
        .route("/donations/accepted", get(rest::accepted_donations_handler))
        .route("/donations/{id}/accept", post(rest::accept_donation_handler))
        .layer(axum_middleware::from_fn(middleware::require_ngo));

    let volunteer_routes = Router::new()
        .route("/pickups/available", get(rest::claimable_donations_handler))
        .route("/deliveries/mine", get(rest::my_deliveries_handler))
        .route("/donations/{id}/claim", post(rest::claim_donation_handler))
        .route("/donations/{id}/deliver", post(rest::deliver_donation_handler))
        .layer(axum_middleware::from_fn(middleware::require_volunteer));

    let admin_routes = Router::new()
        .route("/admin/donations", get(admin::list_donations_handler))
        .route("/admin/donations/{id}", delete(admin::delete_donation_handler))
        .route("/admin/stats", get(admin::donation_stats_handler))
        .route("/admin/users", get(admin::list_users_handler))
        .route("/admin/users/{id}/active", put(admin::set_user_active_handler))
        .route("/admin/messages", get(admin::list_messages_handler))
        .route("/admin/messages/{id}/resolve", post(admin::resolve_message_handler))
        .layer(axum_middleware::from_fn(middleware::require_admin));

    // Protected routes (auth required); the session middleware runs before
    // the per-role gates above.
    let protected_routes = Router::new()
        .merge(session_routes)
        .merge(donor_routes)
        .merge(ngo_routes)
        .merge(volunteer_routes)
        .merge(admin_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
