//! Public HTML pages and the health check.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use axum_extra::extract::{Form, FormRejection, Query};
use mauri_common::{FacetSet, Pest, PestQuery};
use mauri_db::Backend;
use serde::Serialize;

use super::pests::{Facets, FilterParams};
use crate::auth::Caller;
use crate::error::ApiError;
use crate::intake::{self, ClientMeta, ObservationPayload};
use crate::state::SharedState;
use crate::workflow::{ObservationForm, ObservationValues};

const FEATURED: usize = 3;

/// Pinned pests first, then alphabetical.
fn featured(mut pests: Vec<Pest>) -> Vec<Pest> {
    pests.sort_by(|a, b| b.pinned.cmp(&a.pinned).then_with(|| a.title.cmp(&b.title)));
    pests.truncate(FEATURED);
    pests
}

#[derive(Serialize)]
struct HomePage {
    species_count: usize,
    featured: Vec<Pest>,
}

/// GET /
pub async fn home(State(state): State<SharedState>, caller: Caller) -> Response {
    let page = async {
        let pests = state.db.pests().list_visible().await?;
        let species_count = pests.len();
        let page = HomePage { species_count, featured: featured(pests) };
        state.pages.render("home.html", &caller, page)
    };
    state.pages.respond(&caller, page.await)
}

#[derive(Serialize)]
struct SearchPage {
    query: PestQuery,
    active: bool,
    groups: Vec<String>,
    types: Vec<String>,
    results: Vec<Pest>,
}

/// GET /search
pub async fn search(
    State(state): State<SharedState>,
    caller: Caller,
    Query(params): Query<FilterParams>,
) -> Response {
    let page = async {
        let query = params.into_query();
        let pests = state.db.pests().list_visible().await?;
        let Facets { groups, types, .. } = Facets::of(&pests);
        let results = query.apply(&pests);
        let page = SearchPage { active: query.is_active(), query, groups, types, results };
        state.pages.render("search.html", &caller, page)
    };
    state.pages.respond(&caller, page.await)
}

#[derive(Serialize)]
struct DetailPage {
    keywords: FacetSet,
    pest: Pest,
    form: ObservationForm,
}

/// Hidden pests are only shown to admins.
async fn visible_pest(state: &SharedState, caller: &Caller, title: &str) -> Result<Pest, ApiError> {
    match state.db.pests().get_by_title(title).await? {
        Some(pest) if pest.visible || caller.is_admin() => Ok(pest),
        _ => Err(ApiError::not_found("Pest")),
    }
}

fn render_detail(state: &SharedState, caller: &Caller, pest: Pest, form: ObservationForm) -> Response {
    let page = DetailPage { keywords: pest.keyword_list(), pest, form };
    state.pages.respond(caller, state.pages.render("pest_detail.html", caller, page))
}

/// GET /pest/{title}
pub async fn pest_detail(
    State(state): State<SharedState>,
    caller: Caller,
    Path(title): Path<String>,
) -> Response {
    match visible_pest(&state, &caller, &title).await {
        Ok(pest) => render_detail(&state, &caller, pest, ObservationForm::default()),
        Err(err) => state.pages.error_page(&caller, &err),
    }
}

/// POST /pest/{title}/observations
pub async fn submit_observation(
    State(state): State<SharedState>,
    caller: Caller,
    client: ClientMeta,
    Path(title): Path<String>,
    form: Result<Form<ObservationPayload>, FormRejection>,
) -> Response {
    let pest = match visible_pest(&state, &caller, &title).await {
        Ok(pest) => pest,
        Err(err) => return state.pages.error_page(&caller, &err),
    };
    let mut payload = match form {
        Ok(Form(payload)) => payload,
        Err(rejection) => {
            tracing::debug!(pest = %pest.title, error = %rejection, "observation form unreadable");
            let form = ObservationForm::default().complete(Err::<String, _>(rejection));
            return render_detail(&state, &caller, pest, form);
        }
    };
    payload.pest_id = pest.id;
    payload.pest_title = pest.title.clone();

    let values = ObservationValues::from(&payload);
    let outcome = intake::accept(
        &state.db,
        state.photos.as_ref(),
        &state.config.submissions,
        payload,
        client,
    )
    .await
    .map(|stored| stored.pest_title);
    let form = ObservationForm::draft(values).complete(outcome);
    if let ObservationForm::Draft { error: Some(error), .. } = &form {
        tracing::debug!(pest = %pest.title, %error, "observation rejected");
    }
    render_detail(&state, &caller, pest, form)
}

#[derive(Serialize)]
struct Empty {}

/// GET /about
pub async fn about(State(state): State<SharedState>, caller: Caller) -> Response {
    state.pages.respond(&caller, state.pages.render("about.html", &caller, Empty {}))
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub backend: Backend,
    pub database_configured: bool,
}

/// GET /healthz
pub async fn healthz(State(state): State<SharedState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        backend: state.db.backend(),
        database_configured: state.db.is_configured(),
    })
}

/// Fallback for unknown paths.
pub async fn not_found(State(state): State<SharedState>, caller: Caller) -> Response {
    state.pages.error_page(&caller, &ApiError::NotFound("Page not found".to_string()))
}
