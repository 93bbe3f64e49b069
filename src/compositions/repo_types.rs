use sqlx::FromRow;
use time::OffsetDateTime;

use crate::lifecycle::{Active, Record};

use super::domain::{Composition, CompositionKind, Ingredient};

#[derive(Debug, FromRow)]
pub struct CompositionRow {
    pub id: i64,
    pub extid: String,
    pub name: String,
    pub description: Option<String>,
    pub user_extid: Option<String>,
    pub active: i16,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, FromRow)]
pub struct IngredientRow {
    pub composition_id: i64,
    pub extid: String,
    pub food_extid: String,
    pub grams: i32,
    pub active: i16,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl CompositionRow {
    /// Ingredients are attached by the store after a batch query.
    pub fn into_domain(self, kind: CompositionKind) -> Composition {
        Composition {
            record: Record {
                extid: self.extid,
                active: Active::from_i16(self.active),
                created_at: self.created_at,
                updated_at: self.updated_at,
                deleted_at: self.deleted_at,
            },
            kind,
            name: self.name,
            description: self.description,
            user_extid: self.user_extid,
            ingredients: Vec::new(),
        }
    }
}

impl From<IngredientRow> for Ingredient {
    fn from(r: IngredientRow) -> Self {
        Self {
            record: Record {
                extid: r.extid,
                active: Active::from_i16(r.active),
                created_at: r.created_at,
                updated_at: r.updated_at,
                deleted_at: r.deleted_at,
            },
            food_extid: r.food_extid,
            grams: r.grams,
            food: None,
        }
    }
}
