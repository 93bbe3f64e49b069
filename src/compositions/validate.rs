use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    catalog::Food,
    error::{Error, Result},
};

use super::domain::CompositionKind;

/// Salads need at least this many distinct foundation foods.
pub const MIN_SALAD_FOUNDATIONS: usize = 1;

/// Batch food lookup used by composition validation.
#[async_trait]
pub trait FoodResolver: Send + Sync {
    /// Returns the active foods among `extids`, in no particular order.
    /// Ids that do not resolve are simply absent from the result.
    async fn resolve_foods(&self, extids: &[String]) -> anyhow::Result<Vec<Food>>;
}

/// One ingredient as submitted by a client, before any checks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientInput {
    pub food_extid: Option<String>,
    pub grams: Option<i32>,
}

/// Checks a submitted ingredient list against the rules of `kind` and
/// returns the distinct resolved foods in first-seen order.
///
/// Shape checks run per row, in order, before any lookup. All distinct food
/// ids are then resolved with a single resolver call.
pub async fn validate<R>(kind: CompositionKind, inputs: &[IngredientInput], foods: &R) -> Result<Vec<Food>>
where
    R: FoodResolver + ?Sized,
{
    if inputs.is_empty() {
        return Err(Error::EmptyComposition);
    }

    let mut wanted: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for (index, input) in inputs.iter().enumerate() {
        let extid = match input.food_extid.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => return Err(Error::MissingFoodReference { index }),
        };
        match input.grams {
            Some(g) if g > 0 => {}
            grams => return Err(Error::InvalidQuantity { index, grams }),
        }
        if seen.insert(extid) {
            wanted.push(extid.to_string());
        }
    }

    let mut by_extid: HashMap<String, Food> = foods
        .resolve_foods(&wanted)
        .await?
        .into_iter()
        .map(|f| (f.record.extid.clone(), f))
        .collect();

    let missing: Vec<String> = wanted
        .iter()
        .filter(|id| !by_extid.contains_key(id.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(Error::FoodNotFound { extids: missing });
    }

    let resolved: Vec<Food> = wanted
        .iter()
        .filter_map(|id| by_extid.remove(id.as_str()))
        .collect();

    match kind {
        CompositionKind::Mixture => {
            if let Some(food) = resolved.iter().find(|f| !f.mixable) {
                return Err(Error::NonMixableFood {
                    extid: food.record.extid.clone(),
                    name: food.name.clone(),
                });
            }
        }
        CompositionKind::Salad => {
            let found = resolved.iter().filter(|f| f.foundation).count();
            if found < MIN_SALAD_FOUNDATIONS {
                return Err(Error::InsufficientFoundation {
                    found,
                    required: MIN_SALAD_FOUNDATIONS,
                });
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::lifecycle::{Active, Record};
    use crate::testing::MemoryStore;

    fn food(extid: &str, mixable: bool, foundation: bool) -> Food {
        Food {
            record: Record {
                extid: extid.into(),
                ..Record::unsaved()
            },
            code: extid.to_uppercase(),
            name: format!("{extid} name"),
            category: "Nuts".into(),
            subcategory: "Raw".into(),
            description: None,
            notes: None,
            crunch: None,
            punch: None,
            sweet: None,
            savory: None,
            nutrition_extid: None,
            nutrition: None,
            typical_serving_grams: None,
            foundation,
            mixable,
        }
    }

    fn row(extid: &str, grams: i32) -> IngredientInput {
        IngredientInput {
            food_extid: Some(extid.into()),
            grams: Some(grams),
        }
    }

    fn pantry() -> Arc<MemoryStore<Food>> {
        let mut gone = food("gone", true, true);
        gone.record.active = Active::Inactive;
        Arc::new(MemoryStore::with(vec![
            food("almond", true, false),
            food("raisin", true, false),
            food("lettuce", false, true),
            food("tomato", false, false),
            gone,
        ]))
    }

    #[tokio::test]
    async fn empty_list_is_rejected() {
        let err = validate(CompositionKind::Mixture, &[], pantry().as_ref())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyComposition));
    }

    #[tokio::test]
    async fn row_shape_is_checked_in_order_before_lookup() {
        let store = pantry();
        let inputs = [
            row("almond", 10),
            IngredientInput {
                food_extid: Some("raisin".into()),
                grams: Some(0),
            },
            IngredientInput {
                food_extid: Some("  ".into()),
                grams: Some(5),
            },
        ];
        let err = validate(CompositionKind::Mixture, &inputs, store.as_ref())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuantity { index: 1, grams: Some(0) }));
        assert_eq!(store.lookups(), 0);

        let missing_grams = [IngredientInput {
            food_extid: Some("almond".into()),
            grams: None,
        }];
        let err = validate(CompositionKind::Mixture, &missing_grams, store.as_ref())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuantity { index: 0, grams: None }));

        let no_food = [IngredientInput::default()];
        let err = validate(CompositionKind::Mixture, &no_food, store.as_ref())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingFoodReference { index: 0 }));
    }

    #[tokio::test]
    async fn distinct_ids_are_resolved_in_one_call() {
        let store = pantry();
        let inputs = [row("almond", 10), row("raisin", 20), row("almond", 5)];
        let foods = validate(CompositionKind::Mixture, &inputs, store.as_ref())
            .await
            .unwrap();
        assert_eq!(store.lookups(), 1);
        let ids: Vec<&str> = foods.iter().map(|f| f.record.extid.as_str()).collect();
        assert_eq!(ids, vec!["almond", "raisin"]);
    }

    #[tokio::test]
    async fn long_lists_with_repeats_keep_first_seen_order() {
        let inputs: Vec<IngredientInput> = (0..5_000)
            .map(|i| row(["raisin", "almond"][i % 2], 1))
            .collect();
        let foods = validate(CompositionKind::Mixture, &inputs, pantry().as_ref())
            .await
            .unwrap();
        let ids: Vec<&str> = foods.iter().map(|f| f.record.extid.as_str()).collect();
        assert_eq!(ids, vec!["raisin", "almond"]);
    }

    #[tokio::test]
    async fn every_missing_id_is_reported_once() {
        let inputs = [row("ghost", 1), row("almond", 1), row("gone", 1), row("ghost", 2)];
        let err = validate(CompositionKind::Mixture, &inputs, pantry().as_ref())
            .await
            .unwrap_err();
        match err {
            Error::FoodNotFound { extids } => assert_eq!(extids, vec!["ghost", "gone"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn mixtures_only_take_mixable_foods() {
        let inputs = [row("almond", 30), row("tomato", 10), row("lettuce", 10)];
        let err = validate(CompositionKind::Mixture, &inputs, pantry().as_ref())
            .await
            .unwrap_err();
        match err {
            Error::NonMixableFood { extid, name } => {
                assert_eq!(extid, "tomato");
                assert_eq!(name, "tomato name");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn salads_need_a_foundation() {
        let store = pantry();
        let err = validate(CompositionKind::Salad, &[row("tomato", 80)], store.as_ref())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFoundation { found: 0, required: 1 }));

        let ok = validate(
            CompositionKind::Salad,
            &[row("lettuce", 100), row("tomato", 80), row("lettuce", 20)],
            store.as_ref(),
        )
        .await
        .unwrap();
        assert_eq!(ok.len(), 2);
    }

    #[tokio::test]
    async fn resolver_failure_is_a_store_failure() {
        struct Down;

        #[async_trait]
        impl FoodResolver for Down {
            async fn resolve_foods(&self, _extids: &[String]) -> anyhow::Result<Vec<Food>> {
                anyhow::bail!("pool timed out")
            }
        }

        let err = validate(CompositionKind::Salad, &[row("lettuce", 1)], &Down)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StoreFailure(_)));
    }
}
