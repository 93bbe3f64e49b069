use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::{
    codes::CodeLookup,
    compositions::FoodResolver,
    lifecycle::{ChildWrite, Store},
};

use super::domain::{Company, Food, Nutrition};
use super::repo_types::{CompanyRow, FoodRow, NutritionRow};

// ---- Nutrition ----

const NUTRITION_COLUMNS: &str = r#"
    extid, code, name, description, notes,
    carbohydrate, fat, protein, sugar, fiber, vitamin_d, vitamin_e,
    active, created_at, updated_at, deleted_at
"#;

#[derive(Clone)]
pub struct PgNutritionStore {
    db: PgPool,
}

impl PgNutritionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Batch lookup, any state.
    pub async fn fetch(&self, extids: &[String]) -> anyhow::Result<Vec<Nutrition>> {
        if extids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {NUTRITION_COLUMNS} FROM nutrition WHERE extid = ANY($1)");
        let rows = sqlx::query_as::<_, NutritionRow>(&sql)
            .bind(extids)
            .fetch_all(&self.db)
            .await
            .context("fetch nutrition by extids")?;
        Ok(rows.into_iter().map(Nutrition::from).collect())
    }
}

#[async_trait]
impl Store<Nutrition> for PgNutritionStore {
    async fn insert(&self, n: &Nutrition) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO nutrition (
                extid, code, name, description, notes,
                carbohydrate, fat, protein, sugar, fiber, vitamin_d, vitamin_e,
                active, created_at, updated_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(&n.record.extid)
        .bind(&n.code)
        .bind(&n.name)
        .bind(&n.description)
        .bind(&n.notes)
        .bind(n.carbohydrate)
        .bind(n.fat)
        .bind(n.protein)
        .bind(n.sugar)
        .bind(n.fiber)
        .bind(n.vitamin_d)
        .bind(n.vitamin_e)
        .bind(n.record.active.as_i16())
        .bind(n.record.created_at)
        .bind(n.record.updated_at)
        .bind(n.record.deleted_at)
        .execute(&self.db)
        .await
        .context("insert nutrition")?;
        Ok(())
    }

    async fn find_by_extid(&self, extid: &str) -> anyhow::Result<Option<Nutrition>> {
        let sql = format!("SELECT {NUTRITION_COLUMNS} FROM nutrition WHERE extid = $1");
        let row = sqlx::query_as::<_, NutritionRow>(&sql)
            .bind(extid)
            .fetch_optional(&self.db)
            .await
            .context("find nutrition by extid")?;
        Ok(row.map(Nutrition::from))
    }

    async fn save(&self, n: &Nutrition, _children: ChildWrite) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE nutrition
               SET name = $2, description = $3, notes = $4,
                   carbohydrate = $5, fat = $6, protein = $7, sugar = $8,
                   fiber = $9, vitamin_d = $10, vitamin_e = $11,
                   active = $12, updated_at = $13, deleted_at = $14
             WHERE extid = $1
            "#,
        )
        .bind(&n.record.extid)
        .bind(&n.name)
        .bind(&n.description)
        .bind(&n.notes)
        .bind(n.carbohydrate)
        .bind(n.fat)
        .bind(n.protein)
        .bind(n.sugar)
        .bind(n.fiber)
        .bind(n.vitamin_d)
        .bind(n.vitamin_e)
        .bind(n.record.active.as_i16())
        .bind(n.record.updated_at)
        .bind(n.record.deleted_at)
        .execute(&self.db)
        .await
        .context("update nutrition")?;
        Ok(())
    }

    async fn list_active(&self) -> anyhow::Result<Vec<Nutrition>> {
        let sql = format!("SELECT {NUTRITION_COLUMNS} FROM nutrition WHERE active = 1 ORDER BY name");
        let rows = sqlx::query_as::<_, NutritionRow>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list active nutrition")?;
        Ok(rows.into_iter().map(Nutrition::from).collect())
    }
}

#[async_trait]
impl CodeLookup for PgNutritionStore {
    async fn code_exists(&self, code: &str) -> anyhow::Result<bool> {
        code_exists(&self.db, "nutrition", code).await
    }
}

// ---- Food ----

fn food_select(filter: &str) -> String {
    format!(
        r#"
        SELECT f.extid, f.code, f.name, f.category, f.subcategory, f.description, f.notes,
               f.crunch, f.punch, f.sweet, f.savory,
               n.extid AS nutrition_extid,
               f.typical_serving_grams, f.foundation, f.mixable,
               f.active, f.created_at, f.updated_at, f.deleted_at
          FROM food f
          LEFT JOIN nutrition n ON n.id = f.nutrition_id
         WHERE {filter}
         ORDER BY f.name
        "#
    )
}

#[derive(Clone)]
pub struct PgFoodStore {
    db: PgPool,
    nutrition: PgNutritionStore,
}

impl PgFoodStore {
    pub fn new(db: PgPool) -> Self {
        Self {
            nutrition: PgNutritionStore::new(db.clone()),
            db,
        }
    }

    /// Batch lookup with nutrition attached. One query for foods, one for
    /// their nutrition records.
    pub async fn fetch(&self, extids: &[String], active_only: bool) -> anyhow::Result<Vec<Food>> {
        if extids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = food_select("f.extid = ANY($1) AND ($2 = FALSE OR f.active = 1)");
        let rows = sqlx::query_as::<_, FoodRow>(&sql)
            .bind(extids)
            .bind(active_only)
            .fetch_all(&self.db)
            .await
            .context("fetch foods by extids")?;
        self.with_nutrition(rows).await
    }

    async fn with_nutrition(&self, rows: Vec<FoodRow>) -> anyhow::Result<Vec<Food>> {
        let mut foods: Vec<Food> = rows.into_iter().map(Food::from).collect();
        let wanted: Vec<String> = foods.iter().filter_map(|f| f.nutrition_extid.clone()).collect();

        let by_extid: HashMap<String, Nutrition> = self
            .nutrition
            .fetch(&wanted)
            .await?
            .into_iter()
            .map(|n| (n.record.extid.clone(), n))
            .collect();

        for food in &mut foods {
            if let Some(extid) = &food.nutrition_extid {
                food.nutrition = by_extid.get(extid).cloned();
            }
        }
        Ok(foods)
    }
}

#[async_trait]
impl Store<Food> for PgFoodStore {
    async fn insert(&self, f: &Food) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO food (
                extid, code, name, category, subcategory, description, notes,
                crunch, punch, sweet, savory, nutrition_id,
                typical_serving_grams, foundation, mixable,
                active, created_at, updated_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    (SELECT id FROM nutrition WHERE extid = $12),
                    $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(&f.record.extid)
        .bind(&f.code)
        .bind(&f.name)
        .bind(&f.category)
        .bind(&f.subcategory)
        .bind(&f.description)
        .bind(&f.notes)
        .bind(f.crunch)
        .bind(f.punch)
        .bind(f.sweet)
        .bind(f.savory)
        .bind(&f.nutrition_extid)
        .bind(f.typical_serving_grams)
        .bind(f.foundation)
        .bind(f.mixable)
        .bind(f.record.active.as_i16())
        .bind(f.record.created_at)
        .bind(f.record.updated_at)
        .bind(f.record.deleted_at)
        .execute(&self.db)
        .await
        .context("insert food")?;
        Ok(())
    }

    async fn find_by_extid(&self, extid: &str) -> anyhow::Result<Option<Food>> {
        let sql = food_select("f.extid = $1");
        let row = sqlx::query_as::<_, FoodRow>(&sql)
            .bind(extid)
            .fetch_optional(&self.db)
            .await
            .context("find food by extid")?;
        match row {
            Some(row) => Ok(self.with_nutrition(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn save(&self, f: &Food, _children: ChildWrite) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE food
               SET name = $2, category = $3, subcategory = $4, description = $5, notes = $6,
                   crunch = $7, punch = $8, sweet = $9, savory = $10,
                   nutrition_id = (SELECT id FROM nutrition WHERE extid = $11),
                   typical_serving_grams = $12, foundation = $13, mixable = $14,
                   active = $15, updated_at = $16, deleted_at = $17
             WHERE extid = $1
            "#,
        )
        .bind(&f.record.extid)
        .bind(&f.name)
        .bind(&f.category)
        .bind(&f.subcategory)
        .bind(&f.description)
        .bind(&f.notes)
        .bind(f.crunch)
        .bind(f.punch)
        .bind(f.sweet)
        .bind(f.savory)
        .bind(&f.nutrition_extid)
        .bind(f.typical_serving_grams)
        .bind(f.foundation)
        .bind(f.mixable)
        .bind(f.record.active.as_i16())
        .bind(f.record.updated_at)
        .bind(f.record.deleted_at)
        .execute(&self.db)
        .await
        .context("update food")?;
        Ok(())
    }

    async fn list_active(&self) -> anyhow::Result<Vec<Food>> {
        let sql = food_select("f.active = 1");
        let rows = sqlx::query_as::<_, FoodRow>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list active foods")?;
        self.with_nutrition(rows).await
    }
}

#[async_trait]
impl CodeLookup for PgFoodStore {
    async fn code_exists(&self, code: &str) -> anyhow::Result<bool> {
        code_exists(&self.db, "food", code).await
    }
}

/// New compositions may only reference live foods.
#[async_trait]
impl FoodResolver for PgFoodStore {
    async fn resolve_foods(&self, extids: &[String]) -> anyhow::Result<Vec<Food>> {
        let foods = self.fetch(extids, true).await?;
        debug!(requested = extids.len(), found = foods.len(), "resolved foods");
        Ok(foods)
    }
}

// ---- Company ----

const COMPANY_COLUMNS: &str = "extid, code, name, description, active, created_at, updated_at, deleted_at";

#[derive(Clone)]
pub struct PgCompanyStore {
    db: PgPool,
}

impl PgCompanyStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store<Company> for PgCompanyStore {
    async fn insert(&self, c: &Company) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO company (extid, code, name, description, active, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&c.record.extid)
        .bind(&c.code)
        .bind(&c.name)
        .bind(&c.description)
        .bind(c.record.active.as_i16())
        .bind(c.record.created_at)
        .bind(c.record.updated_at)
        .bind(c.record.deleted_at)
        .execute(&self.db)
        .await
        .context("insert company")?;
        Ok(())
    }

    async fn find_by_extid(&self, extid: &str) -> anyhow::Result<Option<Company>> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM company WHERE extid = $1");
        let row = sqlx::query_as::<_, CompanyRow>(&sql)
            .bind(extid)
            .fetch_optional(&self.db)
            .await
            .context("find company by extid")?;
        Ok(row.map(Company::from))
    }

    async fn save(&self, c: &Company, _children: ChildWrite) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE company
               SET name = $2, description = $3, active = $4, updated_at = $5, deleted_at = $6
             WHERE extid = $1
            "#,
        )
        .bind(&c.record.extid)
        .bind(&c.name)
        .bind(&c.description)
        .bind(c.record.active.as_i16())
        .bind(c.record.updated_at)
        .bind(c.record.deleted_at)
        .execute(&self.db)
        .await
        .context("update company")?;
        Ok(())
    }

    async fn list_active(&self) -> anyhow::Result<Vec<Company>> {
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM company WHERE active = 1 ORDER BY name");
        let rows = sqlx::query_as::<_, CompanyRow>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list active companies")?;
        Ok(rows.into_iter().map(Company::from).collect())
    }
}

#[async_trait]
impl CodeLookup for PgCompanyStore {
    async fn code_exists(&self, code: &str) -> anyhow::Result<bool> {
        code_exists(&self.db, "company", code).await
    }
}

async fn code_exists(db: &PgPool, table: &'static str, code: &str) -> anyhow::Result<bool> {
    let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE code = $1 AND deleted_at IS NULL)");
    let exists = sqlx::query_scalar::<_, bool>(&sql)
        .bind(code)
        .fetch_one(db)
        .await
        .with_context(|| format!("check {table} code {code}"))?;
    Ok(exists)
}
