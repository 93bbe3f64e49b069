use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    catalog::Food,
    error::{Error, Result},
    lifecycle::{Change, Clock, IdGenerator, LifecycleManager, Record},
};

use super::{
    domain::{Composition, CompositionKind, CompositionPatch, Ingredient},
    dto::{CompositionDraft, CompositionPatchRequest},
    validate::{self, FoodResolver, IngredientInput},
    CompositionStore,
};

#[derive(Clone)]
pub struct CompositionService {
    kind: CompositionKind,
    lifecycle: LifecycleManager<Composition, dyn CompositionStore>,
    foods: Arc<dyn FoodResolver>,
}

impl CompositionService {
    pub fn new(
        kind: CompositionKind,
        store: Arc<dyn CompositionStore>,
        foods: Arc<dyn FoodResolver>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            kind,
            lifecycle: LifecycleManager::new(store, clock, ids),
            foods,
        }
    }

    pub fn kind(&self) -> CompositionKind {
        self.kind
    }

    /// Validates the ingredient list and turns it into unsaved rows that
    /// carry their resolved food.
    async fn ingredients(&self, inputs: &[IngredientInput]) -> Result<Vec<Ingredient>> {
        let foods: HashMap<String, Food> = validate::validate(self.kind, inputs, self.foods.as_ref())
            .await?
            .into_iter()
            .map(|f| (f.record.extid.clone(), f))
            .collect();

        let rows = inputs
            .iter()
            .filter_map(|input| {
                let extid = input.food_extid.as_deref()?.trim();
                let food = foods.get(extid).cloned();
                Some(Ingredient::new(extid.to_string(), input.grams?, food))
            })
            .collect::<Vec<_>>();
        debug!(rows = rows.len(), distinct_foods = foods.len(), "ingredients validated");
        Ok(rows)
    }

    #[instrument(skip_all, fields(kind = self.kind.name()))]
    pub async fn create(&self, draft: CompositionDraft) -> Result<Composition> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(Error::invalid("name", "must not be blank"));
        }
        if draft.user_extid.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(Error::invalid("user_extid", "must not be blank"));
        }

        let ingredients = self.ingredients(&draft.ingredients).await?;
        let composition = Composition {
            record: Record::unsaved(),
            kind: self.kind,
            name: name.to_string(),
            description: draft.description,
            user_extid: draft.user_extid.map(|u| u.trim().to_string()),
            ingredients,
        };
        self.lifecycle.create(composition).await
    }

    /// Partial update. A set ingredient list is validated like on create and
    /// replaces every existing ingredient row.
    #[instrument(skip_all, fields(kind = self.kind.name(), %extid))]
    pub async fn update(&self, extid: &str, req: CompositionPatchRequest) -> Result<Composition> {
        if req.name.as_set().is_some_and(|n| n.trim().is_empty()) {
            return Err(Error::invalid("name", "must not be blank"));
        }

        let ingredients = match &req.ingredients {
            Change::Set(inputs) => Change::Set(self.ingredients(inputs).await?),
            Change::Keep => Change::Keep,
        };
        let patch = CompositionPatch {
            name: match req.name {
                Change::Set(n) => Change::Set(n.trim().to_string()),
                Change::Keep => Change::Keep,
            },
            description: req.description,
            ingredients,
        };

        self.lifecycle
            .update(extid, patch)
            .await
            .map_err(|e| e.for_entity(self.kind.name()))
    }

    pub async fn delete(&self, extid: &str) -> Result<Composition> {
        self.lifecycle
            .delete(extid)
            .await
            .map_err(|e| e.for_entity(self.kind.name()))
    }

    pub async fn get(&self, extid: &str) -> Result<Composition> {
        self.lifecycle
            .get(extid)
            .await
            .map_err(|e| e.for_entity(self.kind.name()))
    }

    pub async fn list_active(&self) -> Result<Vec<Composition>> {
        self.lifecycle.list_active().await
    }

    pub async fn list_by_user(&self, user_extid: &str) -> Result<Vec<Composition>> {
        Ok(self.lifecycle.store().list_active_by_user(user_extid).await?)
    }
}
