use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::{error::Result, state::AppState};

use super::{CatalogItem, CatalogService, Company, Food, Nutrition};

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .nest("/foods", item_routes::<Food>())
        .nest("/nutrition", item_routes::<Nutrition>())
        .nest("/companies", item_routes::<Company>())
}

fn item_routes<E>() -> Router<AppState>
where
    E: CatalogItem,
    E::Draft: DeserializeOwned,
    E::Patch: DeserializeOwned,
    CatalogService<E>: FromRef<AppState>,
{
    Router::new()
        .route("/", get(list::<E>).post(create::<E>))
        .route("/:extid", get(fetch::<E>).put(update::<E>).delete(remove::<E>))
}

#[instrument(skip_all, fields(entity = E::NAME))]
pub async fn create<E>(State(items): State<CatalogService<E>>, Json(draft): Json<E::Draft>) -> Result<(StatusCode, Json<E>)>
where
    E: CatalogItem,
    E::Draft: DeserializeOwned,
{
    let created = items.create(draft).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip_all, fields(entity = E::NAME))]
pub async fn list<E: CatalogItem>(State(items): State<CatalogService<E>>) -> Result<Json<Vec<E>>> {
    Ok(Json(items.list_active().await?))
}

#[instrument(skip(items), fields(entity = E::NAME))]
pub async fn fetch<E: CatalogItem>(State(items): State<CatalogService<E>>, Path(extid): Path<String>) -> Result<Json<E>> {
    Ok(Json(items.get(&extid).await?))
}

#[instrument(skip(items, patch), fields(entity = E::NAME))]
pub async fn update<E>(
    State(items): State<CatalogService<E>>,
    Path(extid): Path<String>,
    Json(patch): Json<E::Patch>,
) -> Result<Json<E>>
where
    E: CatalogItem,
    E::Patch: DeserializeOwned,
{
    Ok(Json(items.update(&extid, patch).await?))
}

#[instrument(skip(items), fields(entity = E::NAME))]
pub async fn remove<E: CatalogItem>(State(items): State<CatalogService<E>>, Path(extid): Path<String>) -> Result<StatusCode> {
    items.delete(&extid).await?;
    Ok(StatusCode::NO_CONTENT)
}
