pub mod domain;
pub mod dto;
pub mod handlers;
pub mod repo;
mod repo_types;
pub mod services;
pub mod totals;
pub mod validate;

use async_trait::async_trait;
use axum::Router;

use crate::{lifecycle::Store, state::AppState};

pub use domain::{Composition, CompositionKind, CompositionPatch, Ingredient};
pub use services::CompositionService;
pub use validate::{FoodResolver, IngredientInput};

/// Composition persistence, scoped to a single kind.
#[async_trait]
pub trait CompositionStore: Store<Composition> {
    /// Active compositions owned by `user_extid`.
    async fn list_active_by_user(&self, user_extid: &str) -> anyhow::Result<Vec<Composition>>;
}

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/mixtures", handlers::routes::<handlers::Mixtures>())
        .nest("/salads", handlers::routes::<handlers::Salads>())
}
