use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::lifecycle::{Active, Change};

use super::{
    domain::{Composition, CompositionKind, Ingredient},
    totals::{self, FlavorTotals, NutritionTotals},
    validate::IngredientInput,
};

#[derive(Debug, Deserialize)]
pub struct CompositionDraft {
    /// Missing reads as blank.
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub user_extid: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompositionPatchRequest {
    pub name: Change<String>,
    pub description: Change<String>,
    /// When set, replaces the whole ingredient set.
    pub ingredients: Change<Vec<IngredientInput>>,
}

#[derive(Debug, Serialize)]
pub struct IngredientResponse {
    pub extid: String,
    pub food_extid: String,
    pub food_name: Option<String>,
    pub grams: i32,
}

impl From<&Ingredient> for IngredientResponse {
    fn from(i: &Ingredient) -> Self {
        Self {
            extid: i.record.extid.clone(),
            food_extid: i.food_extid.clone(),
            food_name: i.food.as_ref().map(|f| f.name.clone()),
            grams: i.grams,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompositionResponse {
    pub extid: String,
    pub kind: CompositionKind,
    pub name: String,
    pub description: Option<String>,
    pub user_extid: Option<String>,
    pub ingredients: Vec<IngredientResponse>,
    pub total_nutrition: Option<NutritionTotals>,
    pub flavor: Option<FlavorTotals>,
    pub total_grams: i64,
    pub active: Active,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl From<Composition> for CompositionResponse {
    fn from(c: Composition) -> Self {
        let portions = c.portions();
        let total_nutrition = totals::nutrition_totals(&portions);
        let flavor = totals::flavor_totals(&portions);
        let total_grams = totals::total_grams(&portions);
        let ingredients = c.ingredients.iter().map(IngredientResponse::from).collect();

        Self {
            extid: c.record.extid,
            kind: c.kind,
            name: c.name,
            description: c.description,
            user_extid: c.user_extid,
            ingredients,
            total_nutrition,
            flavor,
            total_grams,
            active: c.record.active,
            created_at: c.record.created_at,
            updated_at: c.record.updated_at,
            deleted_at: c.record.deleted_at,
        }
    }
}
