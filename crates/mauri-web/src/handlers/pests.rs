//! `pests.*` procedures.

use axum::extract::{Query, State};
use axum::Json;
use axum_extra::extract::Query as MultiQuery;
use mauri_common::facets::vocabulary;
use mauri_common::{FacetSet, NewPest, Pest, PestPatch, PestQuery};
use serde::{Deserialize, Deserializer, Serialize};

use super::{Ack, ApiJson, ApiPath};
use crate::auth::AdminCaller;
use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

/// Filter query string. `group` and `type` may repeat or be comma-joined.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub text: String,
    #[serde(rename = "group")]
    pub groups: Vec<String>,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    #[serde(deserialize_with = "flag")]
    pub alert_only: bool,
}

impl FilterParams {
    pub fn into_query(self) -> PestQuery {
        let split = |values: Vec<String>| {
            let mut set = FacetSet::new();
            for value in &values {
                for part in FacetSet::parse(value).iter() {
                    set.insert(part);
                }
            }
            set
        };
        PestQuery::text(self.text.trim())
            .with_groups(split(self.groups))
            .with_types(split(self.types))
            .alerts_only(self.alert_only)
    }
}

/// Checkbox-style boolean: `true`, `on`, `1` and `yes` are set.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "on" | "1" | "yes"))
}

#[derive(Debug, Serialize)]
pub struct Facets {
    pub groups: Vec<String>,
    pub types: Vec<String>,
    pub management_approaches: Vec<String>,
}

impl Facets {
    pub fn of(pests: &[Pest]) -> Self {
        Self {
            groups: vocabulary(pests, |p| &p.pest_groups),
            types: vocabulary(pests, |p| &p.pest_types),
            management_approaches: vocabulary(pests, |p| &p.management_approaches),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    pub data: PestPatch,
}

/// GET /api/pests
pub async fn list(State(state): State<SharedState>) -> Result<Json<Vec<Pest>>, ApiError> {
    Ok(Json(state.db.pests().list_visible().await?))
}

/// GET /api/pests/search?query=
pub async fn search(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Pest>>, ApiError> {
    Ok(Json(state.db.pests().search(&params.query).await?))
}

/// GET /api/pests/filter
pub async fn filter(
    State(state): State<SharedState>,
    MultiQuery(params): MultiQuery<FilterParams>,
) -> Result<Json<Vec<Pest>>, ApiError> {
    let query = params.into_query();
    let pests = state.db.pests().list_visible().await?;
    Ok(Json(query.apply(&pests)))
}

/// GET /api/pests/facets
pub async fn facets(State(state): State<SharedState>) -> Result<Json<Facets>, ApiError> {
    let pests = state.db.pests().list_visible().await?;
    Ok(Json(Facets::of(&pests)))
}

/// GET /api/pests/{id}
pub async fn get_by_id(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Pest>, ApiError> {
    state
        .db
        .pests()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Pest"))
}

/// GET /api/pests/by-title/{title}
pub async fn get_by_title(
    State(state): State<SharedState>,
    ApiPath(title): ApiPath<String>,
) -> Result<Json<Pest>, ApiError> {
    state
        .db
        .pests()
        .get_by_title(&title)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Pest"))
}

/// POST /api/pests
pub async fn create(
    State(state): State<SharedState>,
    AdminCaller(admin): AdminCaller,
    ApiJson(pest): ApiJson<NewPest>,
) -> Result<Json<Ack>, ApiError> {
    let created = state.db.pests().create(pest).await?;
    tracing::info!(id = created.id, title = %created.title, by = %admin.open_id, "pest created");
    Ok(Json(Ack::created(created.id)))
}

/// PATCH /api/pests/{id}
pub async fn update(
    State(state): State<SharedState>,
    AdminCaller(admin): AdminCaller,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateBody>,
) -> Result<Json<Ack>, ApiError> {
    body.data.validate()?;
    let affected = state.db.pests().update(id, body.data).await?;
    tracing::info!(id, affected, by = %admin.open_id, "pest updated");
    Ok(Json(Ack::affected(affected)))
}

/// DELETE /api/pests/{id}
pub async fn delete(
    State(state): State<SharedState>,
    AdminCaller(admin): AdminCaller,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Ack>, ApiError> {
    let affected = state.db.pests().delete(id).await?;
    tracing::info!(id, affected, by = %admin.open_id, "pest deleted");
    Ok(Json(Ack::affected(affected)))
}
