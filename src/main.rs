//! Taskboard Backend
//!
//! REST backend for shared project boards: SQLite persistence, role-based
//! access control, ordered lists and tasks, and Tantivy full-text search.

mod access;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod search;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::JwtSessions;
use config::Config;
use db::Repository;
use search::{IndexChange, SearchIndex};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub sessions: Arc<JwtSessions>,
}

impl AppState {
    pub fn new(repo: Repository, search: SearchIndex, config: &Config) -> Self {
        let sessions = JwtSessions::new(
            config.jwt_secret.as_bytes(),
            chrono::Duration::minutes(config.access_ttl_minutes),
            chrono::Duration::days(config.refresh_ttl_days),
        );
        Self {
            repo: Arc::new(repo),
            search: Arc::new(search),
            sessions: Arc::new(sessions),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Taskboard Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if !config.jwt_secret_configured {
        tracing::warn!(
            "No JWT secret configured (TASKBOARD_JWT_SECRET). Using the development secret!"
        );
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Repository::new(pool);

    // Initialize search index
    let search = SearchIndex::open(&config.index_path)?;

    tracing::info!("Building search index...");
    let mut documents = Vec::new();
    for task_id in repo.all_task_ids().await? {
        if let Some(text) = repo.task_search_text(&task_id).await? {
            documents.push(text);
        }
    }
    search.apply(IndexChange::Reset(documents)).await?;

    let state = AppState::new(repo, search, &config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Open endpoints: obtaining a session
    let public_routes = Router::new()
        .route("/auth/register", post(api::register))
        .route("/auth/login", post(api::login))
        .route("/auth/token/refresh", post(api::refresh_token));

    let protected_routes = Router::new()
        // Identity
        .route("/auth/logout", post(api::logout))
        .route(
            "/auth/profile",
            get(api::get_profile).patch(api::update_profile),
        )
        .route("/auth/change-password", post(api::change_password))
        // Projects
        .route(
            "/projects",
            get(api::list_projects).post(api::create_project),
        )
        .route("/projects/my_projects", get(api::my_projects))
        .route("/projects/shared_with_me", get(api::shared_with_me))
        .route(
            "/projects/{id}",
            get(api::get_project)
                .put(api::replace_project)
                .patch(api::update_project)
                .delete(api::delete_project),
        )
        .route("/projects/{id}/add_member", post(api::add_member))
        .route("/projects/{id}/members", get(api::list_members))
        .route(
            "/projects/{id}/members/{user_id}",
            axum::routing::delete(api::remove_member),
        )
        .route(
            "/projects/{id}/members/{user_id}/role",
            patch(api::update_member_role),
        )
        // Task lists
        .route(
            "/task-lists",
            get(api::list_task_lists).post(api::create_task_list),
        )
        .route(
            "/task-lists/{id}",
            get(api::get_task_list)
                .put(api::replace_task_list)
                .patch(api::update_task_list)
                .delete(api::delete_task_list),
        )
        .route("/task-lists/{id}/reorder", post(api::reorder_task_list))
        // Tasks
        .route("/tasks", get(api::list_tasks).post(api::create_task))
        .route("/tasks/bulk_update", post(api::bulk_update_tasks))
        .route(
            "/tasks/{id}",
            get(api::get_task)
                .put(api::replace_task)
                .patch(api::update_task)
                .delete(api::delete_task),
        )
        .route("/tasks/{id}/move", post(api::move_task))
        .route("/tasks/{id}/complete", post(api::complete_task))
        .route("/tasks/{id}/archive", post(api::archive_task))
        // Comments
        .route(
            "/task-comments",
            get(api::list_comments).post(api::create_comment),
        )
        .route(
            "/task-comments/{id}",
            get(api::get_comment)
                .put(api::update_comment)
                .patch(api::update_comment)
                .delete(api::delete_comment),
        )
        // Search
        .route("/search", get(api::search_tasks))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
