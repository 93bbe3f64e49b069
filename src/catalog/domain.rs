use serde::Serialize;

use crate::{
    codes::CodeSource,
    error::{Error, Result},
    lifecycle::{ChildWrite, Entity, Record, Stamper},
};

use super::dto::{CompanyDraft, CompanyPatch, FoodDraft, FoodPatch, NutritionDraft, NutritionPatch};
use super::CatalogItem;

/// Flavor attributes live on a fixed 1..=5 scale.
pub const FLAVOR_RANGE: std::ops::RangeInclusive<i32> = 1..=5;

/// Per-100 g macro values. Calories are derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Nutrition {
    #[serde(flatten)]
    pub record: Record,
    pub code: String,
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Food {
    #[serde(flatten)]
    pub record: Record,
    pub code: String,
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
    /// Resolved on reads; never written back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
    pub typical_serving_grams: Option<i32>,
    /// Usable as a salad base.
    pub foundation: bool,
    /// Allowed in mixtures.
    pub mixable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Company {
    #[serde(flatten)]
    pub record: Record,
    pub code: String,
    pub name: String,
    pub description: String,
}

fn required(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid(field, "cannot be blank"));
    }
    Ok(())
}

fn flavor(field: &'static str, value: Option<i32>) -> Result<()> {
    match value {
        Some(v) if !FLAVOR_RANGE.contains(&v) => Err(Error::invalid(
            field,
            format!("must be between {} and {}, got {v}", FLAVOR_RANGE.start(), FLAVOR_RANGE.end()),
        )),
        _ => Ok(()),
    }
}

fn non_negative(field: &'static str, value: Option<i32>) -> Result<()> {
    match value {
        Some(v) if v < 0 => Err(Error::invalid(field, format!("cannot be negative, got {v}"))),
        _ => Ok(()),
    }
}

fn positive(field: &'static str, value: Option<i32>) -> Result<()> {
    match value {
        Some(v) if v <= 0 => Err(Error::invalid(field, format!("must be greater than 0, got {v}"))),
        _ => Ok(()),
    }
}

impl Entity for Food {
    type Patch = FoodPatch;
    const NAME: &'static str = "Food";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn apply_patch(&mut self, p: FoodPatch, _stamper: &Stamper<'_>) -> ChildWrite {
        if p.nutrition_extid.is_set() {
            self.nutrition = None;
        }
        p.name.apply_to(&mut self.name);
        p.category.apply_to(&mut self.category);
        p.subcategory.apply_to(&mut self.subcategory);
        p.description.apply_to_option(&mut self.description);
        p.notes.apply_to_option(&mut self.notes);
        p.crunch.apply_to_option(&mut self.crunch);
        p.punch.apply_to_option(&mut self.punch);
        p.sweet.apply_to_option(&mut self.sweet);
        p.savory.apply_to_option(&mut self.savory);
        p.nutrition_extid.apply_to_option(&mut self.nutrition_extid);
        p.typical_serving_grams.apply_to_option(&mut self.typical_serving_grams);
        p.foundation.apply_to(&mut self.foundation);
        p.mixable.apply_to(&mut self.mixable);
        ChildWrite::Keep
    }
}

impl CatalogItem for Food {
    type Draft = FoodDraft;

    fn from_draft(d: FoodDraft) -> Result<Self> {
        required("name", &d.name)?;
        required("category", &d.category)?;
        required("subcategory", &d.subcategory)?;
        flavor("crunch", d.crunch)?;
        flavor("punch", d.punch)?;
        flavor("sweet", d.sweet)?;
        flavor("savory", d.savory)?;
        positive("typical_serving_grams", d.typical_serving_grams)?;
        Ok(Food {
            record: Record::unsaved(),
            code: d.code.unwrap_or_default(),
            name: d.name,
            category: d.category,
            subcategory: d.subcategory,
            description: d.description,
            notes: d.notes,
            crunch: d.crunch,
            punch: d.punch,
            sweet: d.sweet,
            savory: d.savory,
            nutrition_extid: d.nutrition_extid,
            nutrition: None,
            typical_serving_grams: d.typical_serving_grams,
            foundation: d.foundation,
            mixable: d.mixable,
        })
    }

    fn check_patch(p: &FoodPatch) -> Result<()> {
        for (field, value) in [
            ("name", &p.name),
            ("category", &p.category),
            ("subcategory", &p.subcategory),
        ] {
            if let Some(v) = value.as_set() {
                required(field, v)?;
            }
        }
        flavor("crunch", p.crunch.as_set().copied())?;
        flavor("punch", p.punch.as_set().copied())?;
        flavor("sweet", p.sweet.as_set().copied())?;
        flavor("savory", p.savory.as_set().copied())?;
        positive("typical_serving_grams", p.typical_serving_grams.as_set().copied())
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn set_code(&mut self, code: String) {
        self.code = code;
    }

    fn code_source(&self) -> CodeSource<'_> {
        CodeSource::Categorized {
            name: &self.name,
            category: &self.category,
            subcategory: &self.subcategory,
        }
    }
}

impl Entity for Nutrition {
    type Patch = NutritionPatch;
    const NAME: &'static str = "Nutrition";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn apply_patch(&mut self, p: NutritionPatch, _stamper: &Stamper<'_>) -> ChildWrite {
        p.name.apply_to(&mut self.name);
        p.description.apply_to_option(&mut self.description);
        p.notes.apply_to_option(&mut self.notes);
        p.carbohydrate.apply_to_option(&mut self.carbohydrate);
        p.fat.apply_to_option(&mut self.fat);
        p.protein.apply_to_option(&mut self.protein);
        p.sugar.apply_to_option(&mut self.sugar);
        p.fiber.apply_to_option(&mut self.fiber);
        p.vitamin_d.apply_to_option(&mut self.vitamin_d);
        p.vitamin_e.apply_to_option(&mut self.vitamin_e);
        ChildWrite::Keep
    }
}

impl CatalogItem for Nutrition {
    type Draft = NutritionDraft;

    fn from_draft(d: NutritionDraft) -> Result<Self> {
        required("name", &d.name)?;
        let n = Nutrition {
            record: Record::unsaved(),
            code: d.code.unwrap_or_default(),
            name: d.name,
            description: d.description,
            notes: d.notes,
            carbohydrate: d.carbohydrate,
            fat: d.fat,
            protein: d.protein,
            sugar: d.sugar,
            fiber: d.fiber,
            vitamin_d: d.vitamin_d,
            vitamin_e: d.vitamin_e,
        };
        for (field, value) in n.macros() {
            non_negative(field, value)?;
        }
        Ok(n)
    }

    fn check_patch(p: &NutritionPatch) -> Result<()> {
        if let Some(name) = p.name.as_set() {
            required("name", name)?;
        }
        for (field, value) in [
            ("carbohydrate", &p.carbohydrate),
            ("fat", &p.fat),
            ("protein", &p.protein),
            ("sugar", &p.sugar),
            ("fiber", &p.fiber),
            ("vitamin_d", &p.vitamin_d),
            ("vitamin_e", &p.vitamin_e),
        ] {
            non_negative(field, value.as_set().copied())?;
        }
        Ok(())
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn set_code(&mut self, code: String) {
        self.code = code;
    }

    fn code_source(&self) -> CodeSource<'_> {
        CodeSource::Named { name: &self.name }
    }
}

impl Nutrition {
    fn macros(&self) -> [(&'static str, Option<i32>); 7] {
        [
            ("carbohydrate", self.carbohydrate),
            ("fat", self.fat),
            ("protein", self.protein),
            ("sugar", self.sugar),
            ("fiber", self.fiber),
            ("vitamin_d", self.vitamin_d),
            ("vitamin_e", self.vitamin_e),
        ]
    }
}

impl Entity for Company {
    type Patch = CompanyPatch;
    const NAME: &'static str = "Company";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn apply_patch(&mut self, p: CompanyPatch, _stamper: &Stamper<'_>) -> ChildWrite {
        p.name.apply_to(&mut self.name);
        p.description.apply_to(&mut self.description);
        ChildWrite::Keep
    }
}

impl CatalogItem for Company {
    type Draft = CompanyDraft;

    fn from_draft(d: CompanyDraft) -> Result<Self> {
        required("name", &d.name)?;
        Ok(Company {
            record: Record::unsaved(),
            code: d.code.unwrap_or_default(),
            name: d.name,
            description: d.description,
        })
    }

    fn check_patch(p: &CompanyPatch) -> Result<()> {
        if let Some(name) = p.name.as_set() {
            required("name", name)?;
        }
        Ok(())
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn set_code(&mut self, code: String) {
        self.code = code;
    }

    fn code_source(&self) -> CodeSource<'_> {
        CodeSource::Named { name: &self.name }
    }
}
