use sqlx::FromRow;
use time::OffsetDateTime;

use crate::lifecycle::{Active, Record};

use super::domain::{Company, Food, Nutrition};

#[derive(Debug, FromRow)]
pub struct NutritionRow {
    pub extid: String,
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub carbohydrate: Option<i32>,
    pub fat: Option<i32>,
    pub protein: Option<i32>,
    pub sugar: Option<i32>,
    pub fiber: Option<i32>,
    pub vitamin_d: Option<i32>,
    pub vitamin_e: Option<i32>,
    pub active: i16,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, FromRow)]
pub struct FoodRow {
    pub extid: String,
    pub code: Option<String>,
    pub name: String,
    pub category: String,
    pub subcategory: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub crunch: Option<i32>,
    pub punch: Option<i32>,
    pub sweet: Option<i32>,
    pub savory: Option<i32>,
    pub nutrition_extid: Option<String>,
    pub typical_serving_grams: Option<i32>,
    pub foundation: bool,
    pub mixable: bool,
    pub active: i16,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, FromRow)]
pub struct CompanyRow {
    pub extid: String,
    pub code: Option<String>,
    pub name: String,
    pub description: String,
    pub active: i16,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

fn record(
    extid: String,
    active: i16,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    deleted_at: Option<OffsetDateTime>,
) -> Record {
    Record {
        extid,
        active: Active::from_i16(active),
        created_at,
        updated_at,
        deleted_at,
    }
}

impl From<NutritionRow> for Nutrition {
    fn from(r: NutritionRow) -> Self {
        Self {
            record: record(r.extid, r.active, r.created_at, r.updated_at, r.deleted_at),
            code: r.code.unwrap_or_default(),
            name: r.name,
            description: r.description,
            notes: r.notes,
            carbohydrate: r.carbohydrate,
            fat: r.fat,
            protein: r.protein,
            sugar: r.sugar,
            fiber: r.fiber,
            vitamin_d: r.vitamin_d,
            vitamin_e: r.vitamin_e,
        }
    }
}

/// Nutrition is attached separately, see `PgFoodStore::fetch`.
impl From<FoodRow> for Food {
    fn from(r: FoodRow) -> Self {
        Self {
            record: record(r.extid, r.active, r.created_at, r.updated_at, r.deleted_at),
            code: r.code.unwrap_or_default(),
            name: r.name,
            category: r.category,
            subcategory: r.subcategory,
            description: r.description,
            notes: r.notes,
            crunch: r.crunch,
            punch: r.punch,
            sweet: r.sweet,
            savory: r.savory,
            nutrition_extid: r.nutrition_extid,
            nutrition: None,
            typical_serving_grams: r.typical_serving_grams,
            foundation: r.foundation,
            mixable: r.mixable,
        }
    }
}

impl From<CompanyRow> for Company {
    fn from(r: CompanyRow) -> Self {
        Self {
            record: record(r.extid, r.active, r.created_at, r.updated_at, r.deleted_at),
            code: r.code.unwrap_or_default(),
            name: r.name,
            description: r.description,
        }
    }
}
