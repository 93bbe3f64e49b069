use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    catalog::{
        repo::{PgCompanyStore, PgFoodStore, PgNutritionStore},
        CatalogService, CatalogStore, Company, Food, Nutrition,
    },
    compositions::{repo::PgCompositionStore, CompositionKind, CompositionService, CompositionStore, FoodResolver},
    config::AppConfig,
    lifecycle::{Clock, IdGenerator, SystemClock, UuidV4},
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub foods: CatalogService<Food>,
    pub nutrition: CatalogService<Nutrition>,
    pub companies: CatalogService<Company>,
    pub mixtures: CompositionService,
    pub salads: CompositionService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        Ok(Self::from_parts(db, config))
    }

    /// Wires Postgres-backed services with the system clock and UUID v4 ids.
    pub fn from_parts(db: PgPool, config: Arc<AppConfig>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ids: Arc<dyn IdGenerator> = Arc::new(UuidV4);
        let food_store = Arc::new(PgFoodStore::new(db.clone()));

        let composition = |kind| {
            CompositionService::new(
                kind,
                Arc::new(PgCompositionStore::new(db.clone(), kind)) as Arc<dyn CompositionStore>,
                food_store.clone() as Arc<dyn FoodResolver>,
                clock.clone(),
                ids.clone(),
            )
        };
        let mixtures = composition(CompositionKind::Mixture);
        let salads = composition(CompositionKind::Salad);

        Self {
            foods: CatalogService::new(food_store.clone() as Arc<dyn CatalogStore<Food>>, clock.clone(), ids.clone()),
            nutrition: CatalogService::new(
                Arc::new(PgNutritionStore::new(db.clone())) as Arc<dyn CatalogStore<Nutrition>>,
                clock.clone(),
                ids.clone(),
            ),
            companies: CatalogService::new(
                Arc::new(PgCompanyStore::new(db.clone())) as Arc<dyn CatalogStore<Company>>,
                clock,
                ids,
            ),
            mixtures,
            salads,
            db,
            config,
        }
    }
}

impl FromRef<AppState> for CatalogService<Food> {
    fn from_ref(state: &AppState) -> Self {
        state.foods.clone()
    }
}

impl FromRef<AppState> for CatalogService<Nutrition> {
    fn from_ref(state: &AppState) -> Self {
        state.nutrition.clone()
    }
}

impl FromRef<AppState> for CatalogService<Company> {
    fn from_ref(state: &AppState) -> Self {
        state.companies.clone()
    }
}
