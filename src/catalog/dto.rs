use serde::Deserialize;

use crate::lifecycle::Change;

/// POST /foods
#[derive(Debug, Deserialize)]
pub struct FoodDraft {
    #[serde(default)]
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
    #[serde(default)]
    pub foundation: bool,
    #[serde(default)]
    pub mixable: bool,
}

/// PUT /foods/:extid
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FoodPatch {
    pub name: Change<String>,
    pub category: Change<String>,
    pub subcategory: Change<String>,
    pub description: Change<String>,
    pub notes: Change<String>,
    pub crunch: Change<i32>,
    pub punch: Change<i32>,
    pub sweet: Change<i32>,
    pub savory: Change<i32>,
    pub nutrition_extid: Change<String>,
    pub typical_serving_grams: Change<i32>,
    pub foundation: Change<bool>,
    pub mixable: Change<bool>,
}

/// POST /nutrition
#[derive(Debug, Deserialize)]
pub struct NutritionDraft {
    #[serde(default)]
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
}

/// PUT /nutrition/:extid
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NutritionPatch {
    pub name: Change<String>,
    pub description: Change<String>,
    pub notes: Change<String>,
    pub carbohydrate: Change<i32>,
    pub fat: Change<i32>,
    pub protein: Change<i32>,
    pub sugar: Change<i32>,
    pub fiber: Change<i32>,
    pub vitamin_d: Change<i32>,
    pub vitamin_e: Change<i32>,
}

/// POST /companies
#[derive(Debug, Deserialize)]
pub struct CompanyDraft {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// PUT /companies/:extid
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompanyPatch {
    pub name: Change<String>,
    pub description: Change<String>,
}
