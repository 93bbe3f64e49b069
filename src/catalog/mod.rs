pub mod domain;
pub mod dto;
pub mod handlers;
pub mod repo;
mod repo_types;
pub mod services;

use axum::Router;
use serde::Serialize;

use crate::{
    codes::{CodeLookup, CodeSource},
    error::Result,
    lifecycle::{Entity, Store},
    state::AppState,
};

pub use domain::{Company, Food, Nutrition};
pub use services::CatalogService;

/// A catalog entry: lifecycle entity with a short unique code.
pub trait CatalogItem: Entity + Serialize {
    type Draft: Send;

    fn from_draft(draft: Self::Draft) -> Result<Self>;
    fn check_patch(patch: &Self::Patch) -> Result<()>;

    fn code(&self) -> &str;
    fn set_code(&mut self, code: String);
    /// Text the code is generated from when none is supplied.
    fn code_source(&self) -> CodeSource<'_>;
}

/// Store of one catalog; `code_exists` only sees non-deleted rows.
pub trait CatalogStore<E: CatalogItem>: Store<E> + CodeLookup {}

impl<E: CatalogItem, T: Store<E> + CodeLookup> CatalogStore<E> for T {}

pub fn router() -> Router<AppState> {
    handlers::catalog_routes()
}
