// Define data modules
mod error; // API error taxonomy (NotFound / Validation / Storage)
mod game; // Core progression and badge-award logic
mod models; // Data structures (Task, Settings, Badge, Db)
mod routes_stats; // HTTP handlers for stats & badges APIs
mod routes_tasks; // HTTP handlers for task & settings APIs
mod store; // Persistent storage (load/save db.json)

// Import axum routing utilities and Router
use axum::{
    Router,
    routing::{get, patch}, // HTTP method helpers
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::store::Store;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let data_path =
        std::env::var("DATA_PATH").unwrap_or_else(|_| store::DEFAULT_DB_PATH.to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let store = Arc::new(Store::open(&data_path).expect("failed to open task database"));

    let api = Router::new()
        // tasks
        .route(
            "/tasks",
            get(routes_tasks::get_tasks).post(routes_tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes_tasks::get_task)
                .put(routes_tasks::update_task)
                .delete(routes_tasks::delete_task),
        )
        .route("/tasks/:id/reminder", patch(routes_tasks::set_reminder))
        .route("/tasks/:id/complete", patch(routes_tasks::complete_task))
        // settings
        .route(
            "/settings",
            get(routes_tasks::get_settings).put(routes_tasks::put_settings),
        )
        // gamification
        .route("/stats", get(routes_stats::get_stats))
        .route("/badges", get(routes_stats::get_badges));

    let app = Router::new()
        .nest("/api", api)
        .nest_service("/", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(store);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    info!("server running at http://{addr}");
    info!("api base: http://{addr}/api");
    info!("database: {data_path}");

    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind failed");

    axum::serve(listener, app).await.expect("server error");
}
