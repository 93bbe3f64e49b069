use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{error::Result, state::AppState};

use super::{
    dto::{CompositionDraft, CompositionPatchRequest, CompositionResponse},
    CompositionService,
};

/// Picks the service a route set talks to.
pub trait KindRoutes: Send + Sync + 'static {
    fn service(state: &AppState) -> &CompositionService;
}

pub struct Mixtures;
pub struct Salads;

impl KindRoutes for Mixtures {
    fn service(state: &AppState) -> &CompositionService {
        &state.mixtures
    }
}

impl KindRoutes for Salads {
    fn service(state: &AppState) -> &CompositionService {
        &state.salads
    }
}

pub fn routes<K: KindRoutes>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<K>).post(create::<K>))
        .route("/:extid", get(fetch::<K>).put(update::<K>).delete(remove::<K>))
        .route("/user/:user_extid", get(list_by_user::<K>))
}

fn respond(items: Vec<super::Composition>) -> Json<Vec<CompositionResponse>> {
    Json(items.into_iter().map(CompositionResponse::from).collect())
}

#[instrument(skip(state, draft))]
pub async fn create<K: KindRoutes>(
    State(state): State<AppState>,
    Json(draft): Json<CompositionDraft>,
) -> Result<(StatusCode, Json<CompositionResponse>)> {
    let created = K::service(&state).create(draft).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[instrument(skip(state))]
pub async fn list<K: KindRoutes>(State(state): State<AppState>) -> Result<Json<Vec<CompositionResponse>>> {
    Ok(respond(K::service(&state).list_active().await?))
}

#[instrument(skip(state))]
pub async fn list_by_user<K: KindRoutes>(
    State(state): State<AppState>,
    Path(user_extid): Path<String>,
) -> Result<Json<Vec<CompositionResponse>>> {
    Ok(respond(K::service(&state).list_by_user(&user_extid).await?))
}

#[instrument(skip(state))]
pub async fn fetch<K: KindRoutes>(
    State(state): State<AppState>,
    Path(extid): Path<String>,
) -> Result<Json<CompositionResponse>> {
    Ok(Json(K::service(&state).get(&extid).await?.into()))
}

#[instrument(skip(state, body))]
pub async fn update<K: KindRoutes>(
    State(state): State<AppState>,
    Path(extid): Path<String>,
    Json(body): Json<CompositionPatchRequest>,
) -> Result<Json<CompositionResponse>> {
    Ok(Json(K::service(&state).update(&extid, body).await?.into()))
}

#[instrument(skip(state))]
pub async fn remove<K: KindRoutes>(State(state): State<AppState>, Path(extid): Path<String>) -> Result<StatusCode> {
    K::service(&state).delete(&extid).await?;
    Ok(StatusCode::NO_CONTENT)
}
