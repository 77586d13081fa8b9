//! HTTP server and routes.

pub(crate) mod handlers;
mod state;

pub use handlers::SESSION_COOKIE;
pub use state::AppState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Multipart framing allowance on top of the avatar size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();
    let storage = &config.storage;
    let avatar_limit = config.limits.avatar_max_bytes + MULTIPART_OVERHEAD;

    let catalog_routes = Router::new()
        .route("/manga", get(handlers::manga_catalog))
        .route("/manga/{series_id}", get(handlers::manga_series));

    let auth_routes = Router::new()
        .route("/me", get(handlers::me))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/account", delete(handlers::delete_account));

    let profile_routes = Router::new()
        .route("/profile", post(handlers::update_profile))
        .route(
            "/avatar",
            post(handlers::upload_avatar).layer(DefaultBodyLimit::max(avatar_limit)),
        )
        .route("/users/batch", post(handlers::users_batch))
        .route("/users/{id}", get(handlers::user_profile));

    let reading_routes = Router::new()
        // Favorites
        .route(
            "/favorites",
            get(handlers::get_favorites).post(handlers::add_favorite),
        )
        .route("/favorites/{series_id}", delete(handlers::remove_favorite))
        // Recently viewed
        .route(
            "/recent",
            get(handlers::get_recent)
                .post(handlers::track_recent)
                .delete(handlers::clear_recent),
        )
        // Reading position
        .route(
            "/leftoff",
            get(handlers::get_left_off)
                .post(handlers::save_left_off)
                .delete(handlers::clear_left_off),
        )
        // Comments
        .route(
            "/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        .route("/comments/{id}", delete(handlers::delete_comment));

    let api_routes = Router::new()
        .merge(catalog_routes)
        .merge(auth_routes)
        .merge(profile_routes)
        .merge(reading_routes);

    let page_routes = Router::new()
        .route("/", get(handlers::page_manga))
        .route("/manga", get(handlers::page_manga))
        .route("/chapters", get(handlers::page_chapters))
        .route("/reader", get(handlers::page_reader))
        .route("/auth", get(handlers::page_auth))
        .route("/profile", get(handlers::page_profile))
        .route("/account", get(handlers::page_account))
        .route("/login", get(handlers::redirect_login))
        .route("/register", get(handlers::redirect_register));

    Router::new()
        .merge(page_routes)
        .nest("/api", api_routes)
        .nest_service(
            &storage.content_mount(),
            ServeDir::new(&storage.content_dir),
        )
        .nest_service("/uploads", ServeDir::new(&storage.uploads_dir))
        .nest_service("/assets", ServeDir::new(&storage.assets_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
