use serde::{Deserialize, Serialize};

use crate::{
    catalog::Food,
    lifecycle::{Change, ChildWrite, Entity, Record, Stamper},
};

use super::totals::Portion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompositionKind {
    Mixture,
    Salad,
}

impl CompositionKind {
    pub fn name(self) -> &'static str {
        match self {
            CompositionKind::Mixture => "Mixture",
            CompositionKind::Salad => "Salad",
        }
    }

    /// Value of the `kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            CompositionKind::Mixture => "MIXTURE",
            CompositionKind::Salad => "SALAD",
        }
    }
}

/// One weighted food in a composition. Owned by its parent and replaced
/// together with the parent's whole ingredient set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub record: Record,
    pub food_extid: String,
    pub grams: i32,
    /// Resolved food, when the reader loaded it.
    pub food: Option<Food>,
}

impl Ingredient {
    pub fn new(food_extid: String, grams: i32, food: Option<Food>) -> Self {
        Self {
            record: Record::unsaved(),
            food_extid,
            grams,
            food,
        }
    }

    pub fn portion(&self) -> Portion<'_> {
        Portion {
            grams: self.grams,
            food: self.food.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub record: Record,
    pub kind: CompositionKind,
    pub name: String,
    pub description: Option<String>,
    /// `None` for system-seeded compositions.
    pub user_extid: Option<String>,
    pub ingredients: Vec<Ingredient>,
}

impl Composition {
    pub fn portions(&self) -> Vec<Portion<'_>> {
        self.ingredients.iter().map(Ingredient::portion).collect()
    }
}

/// Validated partial update. Ingredients, when set, have already passed
/// the composition rules.
#[derive(Debug, Default)]
pub struct CompositionPatch {
    pub name: Change<String>,
    pub description: Change<String>,
    pub ingredients: Change<Vec<Ingredient>>,
}

impl Entity for Composition {
    type Patch = CompositionPatch;
    const NAME: &'static str = "Composition";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn stamp_children(&mut self, stamper: &Stamper<'_>) {
        for ingredient in &mut self.ingredients {
            ingredient.record = stamper.fresh();
        }
    }

    fn apply_patch(&mut self, patch: CompositionPatch, stamper: &Stamper<'_>) -> ChildWrite {
        patch.name.apply_to(&mut self.name);
        patch.description.apply_to_option(&mut self.description);

        match patch.ingredients {
            Change::Keep => ChildWrite::Keep,
            Change::Set(mut fresh) => {
                for ingredient in &mut fresh {
                    ingredient.record = stamper.fresh();
                }
                self.ingredients = fresh;
                ChildWrite::Replace
            }
        }
    }
}
