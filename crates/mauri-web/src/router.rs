//! Axum router: maps all URL paths to handlers.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::auth::session_middleware;
use crate::handlers::{admin, auth, pests, site, submissions};
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);
    let body_limit = shared.config.submissions.body_limit();

    Router::new()
        // Pages
        .route("/",                    get(site::home))
        .route("/search",              get(site::search))
        .route("/pest/{title}",        get(site::pest_detail))
        .route("/pest/{title}/observations", post(site::submit_observation))
        .route("/about",               get(site::about))
        .route("/healthz",             get(site::healthz))

        // Admin pages
        .route("/admin",               get(admin::dashboard))
        .route("/admin/submissions",   get(admin::submissions_page))
        .route("/admin/submissions/{id}/delete", post(admin::delete_submission))
        .route("/admin/pests",         get(admin::pests_page))
        .route("/admin/pests/{id}/delete", post(admin::delete_pest))
        .route("/admin/pests/{id}/toggle", post(admin::toggle_pest))

        // API: pests
        .route("/api/pests",           get(pests::list).post(pests::create))
        .route("/api/pests/search",    get(pests::search))
        .route("/api/pests/filter",    get(pests::filter))
        .route("/api/pests/facets",    get(pests::facets))
        .route("/api/pests/by-title/{title}", get(pests::get_by_title))
        .route("/api/pests/{id}",      get(pests::get_by_id).patch(pests::update).delete(pests::delete))

        // API: submissions
        .route("/api/submissions",     get(submissions::list).post(submissions::create))
        .route("/api/submissions/{id}", get(submissions::get_by_id).delete(submissions::delete))

        // API: admin and auth
        .route("/api/admin/stats",     get(admin::stats))
        .route("/api/auth/me",         get(auth::me))
        .route("/api/auth/logout",     post(auth::logout))

        // Static files
        .nest_service("/static", ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static")))
        .fallback(site::not_found)

        // Middleware
        .layer(middleware::from_fn_with_state(shared.clone(), session_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
