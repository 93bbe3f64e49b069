use std::collections::{HashMap, HashSet};

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::{
    catalog::{repo::PgFoodStore, Food},
    lifecycle::{ChildWrite, Store},
};

use super::{
    domain::{Composition, CompositionKind, Ingredient},
    repo_types::{CompositionRow, IngredientRow},
    CompositionStore,
};

const COMPOSITION_COLUMNS: &str = r#"
    id, extid, name, description, user_extid,
    active, created_at, updated_at, deleted_at
"#;

/// Postgres store for one composition kind. Mixtures and salads share the
/// `composition` table and are told apart by its `kind` column.
#[derive(Clone)]
pub struct PgCompositionStore {
    db: PgPool,
    kind: CompositionKind,
    foods: PgFoodStore,
}

impl PgCompositionStore {
    pub fn new(db: PgPool, kind: CompositionKind) -> Self {
        Self {
            foods: PgFoodStore::new(db.clone()),
            db,
            kind,
        }
    }

    async fn select(&self, filter: &str, arg: Option<&str>) -> anyhow::Result<Vec<Composition>> {
        let sql = format!(
            "SELECT {COMPOSITION_COLUMNS} FROM composition WHERE kind = $1 AND {filter} ORDER BY name, id"
        );
        let mut query = sqlx::query_as::<_, CompositionRow>(&sql).bind(self.kind.as_str());
        if let Some(arg) = arg {
            query = query.bind(arg);
        }
        let rows = query
            .fetch_all(&self.db)
            .await
            .with_context(|| format!("select {} rows", self.kind.as_str()))?;
        self.hydrate(rows).await
    }

    /// Loads every row's ingredients in one query and their foods in one
    /// more. Foods are attached in any state so old compositions still show
    /// what they were made of.
    async fn hydrate(&self, rows: Vec<CompositionRow>) -> anyhow::Result<Vec<Composition>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

        let ingredient_rows = sqlx::query_as::<_, IngredientRow>(
            r#"
            SELECT ci.composition_id, ci.extid, f.extid AS food_extid, ci.grams,
                   ci.active, ci.created_at, ci.updated_at, ci.deleted_at
              FROM composition_ingredient ci
              JOIN food f ON f.id = ci.food_id
             WHERE ci.composition_id = ANY($1)
             ORDER BY ci.composition_id, ci.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await
        .context("fetch composition ingredients")?;

        let food_ids: Vec<String> = {
            let mut seen = HashSet::new();
            ingredient_rows
                .iter()
                .filter(|r| seen.insert(r.food_extid.as_str()))
                .map(|r| r.food_extid.clone())
                .collect()
        };
        let foods: HashMap<String, Food> = self
            .foods
            .fetch(&food_ids, false)
            .await?
            .into_iter()
            .map(|f| (f.record.extid.clone(), f))
            .collect();

        let mut by_parent: HashMap<i64, Vec<Ingredient>> = HashMap::new();
        for row in ingredient_rows {
            let parent = row.composition_id;
            let mut ingredient = Ingredient::from(row);
            ingredient.food = foods.get(&ingredient.food_extid).cloned();
            by_parent.entry(parent).or_default().push(ingredient);
        }
        debug!(
            compositions = rows.len(),
            foods = foods.len(),
            "hydrated {} rows",
            self.kind.name()
        );

        Ok(rows
            .into_iter()
            .map(|row| {
                let ingredients = by_parent.remove(&row.id).unwrap_or_default();
                let mut composition = row.into_domain(self.kind);
                composition.ingredients = ingredients;
                composition
            })
            .collect())
    }
}

async fn insert_ingredients_tx(
    tx: &mut Transaction<'_, Postgres>,
    composition_id: i64,
    ingredients: &[Ingredient],
) -> anyhow::Result<()> {
    for i in ingredients {
        sqlx::query(
            r#"
            INSERT INTO composition_ingredient (
                composition_id, extid, food_id, grams,
                active, created_at, updated_at, deleted_at
            )
            VALUES ($1, $2, (SELECT id FROM food WHERE extid = $3), $4, $5, $6, $7, $8)
            "#,
        )
        .bind(composition_id)
        .bind(&i.record.extid)
        .bind(&i.food_extid)
        .bind(i.grams)
        .bind(i.record.active.as_i16())
        .bind(i.record.created_at)
        .bind(i.record.updated_at)
        .bind(i.record.deleted_at)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("insert ingredient for food {}", i.food_extid))?;
    }
    Ok(())
}

#[async_trait]
impl Store<Composition> for PgCompositionStore {
    async fn insert(&self, c: &Composition) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO composition (
                extid, kind, name, description, user_extid,
                active, created_at, updated_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&c.record.extid)
        .bind(self.kind.as_str())
        .bind(&c.name)
        .bind(&c.description)
        .bind(&c.user_extid)
        .bind(c.record.active.as_i16())
        .bind(c.record.created_at)
        .bind(c.record.updated_at)
        .bind(c.record.deleted_at)
        .fetch_one(&mut *tx)
        .await
        .context("insert composition")?;

        insert_ingredients_tx(&mut tx, id, &c.ingredients).await?;
        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn find_by_extid(&self, extid: &str) -> anyhow::Result<Option<Composition>> {
        Ok(self.select("extid = $2", Some(extid)).await?.pop())
    }

    /// Parent update and, for `ChildWrite::Replace`, delete-all plus
    /// insert-all of the ingredient rows, in one transaction.
    async fn save(&self, c: &Composition, children: ChildWrite) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let id: i64 = sqlx::query_scalar(
            r#"
            UPDATE composition
               SET name = $3, description = $4,
                   active = $5, updated_at = $6, deleted_at = $7
             WHERE extid = $1 AND kind = $2
            RETURNING id
            "#,
        )
        .bind(&c.record.extid)
        .bind(self.kind.as_str())
        .bind(&c.name)
        .bind(&c.description)
        .bind(c.record.active.as_i16())
        .bind(c.record.updated_at)
        .bind(c.record.deleted_at)
        .fetch_one(&mut *tx)
        .await
        .context("update composition")?;

        if children == ChildWrite::Replace {
            let removed = sqlx::query("DELETE FROM composition_ingredient WHERE composition_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("delete composition ingredients")?
                .rows_affected();
            insert_ingredients_tx(&mut tx, id, &c.ingredients).await?;
            debug!(removed, inserted = c.ingredients.len(), "replaced ingredients");
        }

        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn list_active(&self) -> anyhow::Result<Vec<Composition>> {
        self.select("active = 1", None).await
    }
}

#[async_trait]
impl CompositionStore for PgCompositionStore {
    async fn list_active_by_user(&self, user_extid: &str) -> anyhow::Result<Vec<Composition>> {
        self.select("active = 1 AND user_extid = $2", Some(user_extid)).await
    }
}
