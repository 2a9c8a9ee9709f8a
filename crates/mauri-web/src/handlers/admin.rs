//! Admin console: the stats procedure and the HTML admin pages.
//!
//! Pages check the caller themselves so a refusal renders as an HTML 403
//! page rather than a JSON error.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use mauri_common::{Pest, PestPatch, Submission};
use mauri_db::{Backend, DatabaseStats};
use serde::{Deserialize, Serialize};

use crate::auth::{AdminCaller, Caller};
use crate::error::ApiError;
use crate::state::SharedState;

/// GET /api/admin/stats
pub async fn stats(
    State(state): State<SharedState>,
    _admin: AdminCaller,
) -> Result<Json<DatabaseStats>, ApiError> {
    Ok(Json(state.db.stats().await?))
}

#[derive(Serialize)]
struct DashboardPage {
    stats: DatabaseStats,
    backend: Backend,
}

/// GET /admin
pub async fn dashboard(State(state): State<SharedState>, caller: Caller) -> Response {
    let page = async {
        caller.require_admin()?;
        let stats = state.db.stats().await?;
        state
            .pages
            .render("admin_dashboard.html", &caller, DashboardPage { stats, backend: state.db.backend() })
    };
    state.pages.respond(&caller, page.await)
}

#[derive(Serialize)]
struct SubmissionsPage {
    submissions: Vec<Submission>,
}

/// GET /admin/submissions
pub async fn submissions_page(State(state): State<SharedState>, caller: Caller) -> Response {
    let page = async {
        caller.require_admin()?;
        let submissions = state.db.submissions().list().await?;
        state.pages.render("admin_submissions.html", &caller, SubmissionsPage { submissions })
    };
    state.pages.respond(&caller, page.await)
}

#[derive(Serialize)]
struct PestsPage {
    hidden: usize,
    pests: Vec<Pest>,
}

/// GET /admin/pests, hidden pests included.
pub async fn pests_page(State(state): State<SharedState>, caller: Caller) -> Response {
    let page = async {
        caller.require_admin()?;
        let pests = state.db.pests().list_all().await?;
        let hidden = pests.iter().filter(|p| !p.visible).count();
        state.pages.render("admin_pests.html", &caller, PestsPage { hidden, pests })
    };
    state.pages.respond(&caller, page.await)
}

/// POST /admin/submissions/{id}/delete
pub async fn delete_submission(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Response {
    let outcome = async {
        let admin = caller.require_admin()?;
        let affected = state.db.submissions().delete(id).await?;
        tracing::info!(id, affected, by = %admin.open_id, "submission deleted");
        Ok::<_, ApiError>(())
    };
    match outcome.await {
        Ok(()) => Redirect::to("/admin/submissions").into_response(),
        Err(err) => state.pages.error_page(&caller, &err),
    }
}

/// POST /admin/pests/{id}/delete
pub async fn delete_pest(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Response {
    let outcome = async {
        let admin = caller.require_admin()?;
        let affected = state.db.pests().delete(id).await?;
        tracing::info!(id, affected, by = %admin.open_id, "pest deleted");
        Ok::<_, ApiError>(())
    };
    match outcome.await {
        Ok(()) => Redirect::to("/admin/pests").into_response(),
        Err(err) => state.pages.error_page(&caller, &err),
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub field: String,
}

/// Patch that flips one flag of `pest`.
fn toggle_patch(pest: &Pest, field: &str) -> Result<PestPatch, ApiError> {
    let mut patch = PestPatch::default();
    match field {
        "visible" => patch.visible = Some(!pest.visible),
        "alert" => patch.alert = Some(!pest.alert),
        "pinned" => patch.pinned = Some(!pest.pinned),
        other => return Err(ApiError::Validation(format!("Unknown flag '{other}'"))),
    }
    Ok(patch)
}

/// POST /admin/pests/{id}/toggle
pub async fn toggle_pest(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<i64>,
    Form(form): Form<ToggleForm>,
) -> Response {
    let outcome = async {
        let admin = caller.require_admin()?;
        let pest = state
            .db
            .pests()
            .get_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Pest"))?;
        let patch = toggle_patch(&pest, &form.field)?;
        state.db.pests().update(id, patch).await?;
        tracing::info!(id, field = %form.field, by = %admin.open_id, "pest flag toggled");
        Ok::<_, ApiError>(())
    };
    match outcome.await {
        Ok(()) => Redirect::to("/admin/pests").into_response(),
        Err(err) => state.pages.error_page(&caller, &err),
    }
}
