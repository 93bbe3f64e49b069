//! Nutrition and flavor totals of a composition.
//!
//! Stored values are per 100 g. Each ingredient contributes
//! `value * grams / 100`, truncated per ingredient, and the contributions
//! are summed. This is deliberately not `sum(value * grams) / 100`: the two
//! differ whenever several rows have a fractional part.

use serde::Serialize;

use crate::catalog::Food;

const KCAL_PER_GRAM_CARBOHYDRATE: i64 = 4;
const KCAL_PER_GRAM_PROTEIN: i64 = 4;
const KCAL_PER_GRAM_FAT: i64 = 9;

/// Weighted food, as seen by the aggregators.
#[derive(Debug, Clone, Copy)]
pub struct Portion<'a> {
    pub grams: i32,
    pub food: Option<&'a Food>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NutritionTotals {
    pub calories: i64,
    pub carbohydrate: i64,
    pub fat: i64,
    pub protein: i64,
    pub sugar: i64,
    pub fiber: i64,
    pub vitamin_d: i64,
    pub vitamin_e: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlavorTotals {
    pub crunch: i64,
    pub punch: i64,
    pub sweet: i64,
    pub savory: i64,
}

/// A single `i32 * i32` product always fits in `i64`; only the running
/// sums and the calorie factors can leave the range, so those saturate.
fn scale(per_100g: Option<i32>, grams: i32) -> i64 {
    per_100g.map_or(0, |v| i64::from(v) * i64::from(grams) / 100)
}

fn add(total: &mut i64, per_100g: Option<i32>, grams: i32) {
    *total = total.saturating_add(scale(per_100g, grams));
}

/// `None` when there is nothing to aggregate, so callers can tell
/// "no ingredients" apart from "all zero".
pub fn nutrition_totals(portions: &[Portion<'_>]) -> Option<NutritionTotals> {
    if portions.is_empty() {
        return None;
    }

    let mut t = NutritionTotals::default();
    for p in portions {
        let Some(n) = p.food.and_then(|f| f.nutrition.as_ref()) else {
            continue;
        };
        add(&mut t.carbohydrate, n.carbohydrate, p.grams);
        add(&mut t.fat, n.fat, p.grams);
        add(&mut t.protein, n.protein, p.grams);
        add(&mut t.sugar, n.sugar, p.grams);
        add(&mut t.fiber, n.fiber, p.grams);
        add(&mut t.vitamin_d, n.vitamin_d, p.grams);
        add(&mut t.vitamin_e, n.vitamin_e, p.grams);
    }
    t.calories = t
        .carbohydrate
        .saturating_mul(KCAL_PER_GRAM_CARBOHYDRATE)
        .saturating_add(t.protein.saturating_mul(KCAL_PER_GRAM_PROTEIN))
        .saturating_add(t.fat.saturating_mul(KCAL_PER_GRAM_FAT));
    Some(t)
}

pub fn flavor_totals(portions: &[Portion<'_>]) -> Option<FlavorTotals> {
    if portions.is_empty() {
        return None;
    }

    let mut t = FlavorTotals::default();
    for p in portions {
        let Some(f) = p.food else { continue };
        add(&mut t.crunch, f.crunch, p.grams);
        add(&mut t.punch, f.punch, p.grams);
        add(&mut t.sweet, f.sweet, p.grams);
        add(&mut t.savory, f.savory, p.grams);
    }
    Some(t)
}

pub fn total_grams(portions: &[Portion<'_>]) -> i64 {
    portions
        .iter()
        .fold(0i64, |sum, p| sum.saturating_add(i64::from(p.grams)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Nutrition;
    use crate::lifecycle::Record;

    fn nutrition(carbohydrate: i32, fat: i32, protein: i32) -> Nutrition {
        Nutrition {
            record: Record::unsaved(),
            code: "N".into(),
            name: "n".into(),
            description: None,
            notes: None,
            carbohydrate: Some(carbohydrate),
            fat: Some(fat),
            protein: Some(protein),
            sugar: None,
            fiber: None,
            vitamin_d: None,
            vitamin_e: None,
        }
    }

    fn food(nutrition: Option<Nutrition>) -> Food {
        Food {
            record: Record::unsaved(),
            code: "F".into(),
            name: "f".into(),
            category: "c".into(),
            subcategory: "s".into(),
            description: None,
            notes: None,
            crunch: Some(4),
            punch: Some(1),
            sweet: None,
            savory: Some(3),
            nutrition_extid: None,
            nutrition,
            typical_serving_grams: None,
            foundation: false,
            mixable: true,
        }
    }

    #[test]
    fn nothing_to_aggregate_is_none() {
        assert_eq!(nutrition_totals(&[]), None);
        assert_eq!(flavor_totals(&[]), None);
    }

    #[test]
    fn single_hundred_gram_portion_and_calories() {
        let f = food(Some(nutrition(50, 10, 20)));
        let t = nutrition_totals(&[Portion { grams: 100, food: Some(&f) }]).unwrap();
        assert_eq!(t.carbohydrate, 50);
        assert_eq!(t.fat, 10);
        assert_eq!(t.protein, 20);
        assert_eq!(t.calories, 50 * 4 + 20 * 4 + 10 * 9);
        assert_eq!(t.calories, 370);
        assert_eq!(t.sugar, 0);
    }

    #[test]
    fn rows_are_summed() {
        let a = food(Some(nutrition(50, 0, 0)));
        let b = food(Some(nutrition(30, 0, 0)));
        let t = nutrition_totals(&[
            Portion { grams: 100, food: Some(&a) },
            Portion { grams: 100, food: Some(&b) },
        ])
        .unwrap();
        assert_eq!(t.carbohydrate, 80);
    }

    #[test]
    fn truncation_happens_per_row() {
        // 15 * 5 / 100 = 0.75 -> 0 on each row; pooled would give 1.
        let f = food(Some(nutrition(15, 0, 0)));
        let portions = [
            Portion { grams: 5, food: Some(&f) },
            Portion { grams: 5, food: Some(&f) },
        ];
        assert_eq!(nutrition_totals(&portions).unwrap().carbohydrate, 0);
        let pooled = (15 * 5 + 15 * 5) / 100;
        assert_eq!(pooled, 1);
    }

    #[test]
    fn missing_nutrition_or_food_counts_as_zero_but_not_none() {
        let bare = food(None);
        let t = nutrition_totals(&[
            Portion { grams: 250, food: Some(&bare) },
            Portion { grams: 100, food: None },
        ])
        .unwrap();
        assert_eq!(t, NutritionTotals::default());
    }

    #[test]
    fn flavor_uses_the_same_scaling() {
        let f = food(None);
        let t = flavor_totals(&[
            Portion { grams: 50, food: Some(&f) },
            Portion { grams: 150, food: Some(&f) },
        ])
        .unwrap();
        // crunch 4: 2 + 6, punch 1: 0 + 1, sweet missing, savory 3: 1 + 4
        assert_eq!(
            t,
            FlavorTotals {
                crunch: 8,
                punch: 1,
                sweet: 0,
                savory: 5
            }
        );
    }

    #[test]
    fn large_quantities_do_not_overflow() {
        let f = food(Some(nutrition(i32::MAX, 0, 0)));
        let t = nutrition_totals(&[Portion { grams: i32::MAX, food: Some(&f) }]).unwrap();
        assert_eq!(t.carbohydrate, i64::from(i32::MAX) * i64::from(i32::MAX) / 100);
    }

    #[test]
    fn many_extreme_rows_saturate_instead_of_wrapping() {
        let mut n = nutrition(0, i32::MAX, 0);
        n.sugar = Some(i32::MAX);
        let mut f = food(Some(n));
        f.crunch = Some(i32::MAX);
        // each row adds about 4.6e16, so 250 rows pass i64::MAX
        let portions = vec![Portion { grams: i32::MAX, food: Some(&f) }; 250];

        let t = nutrition_totals(&portions).unwrap();
        assert_eq!(t.fat, i64::MAX);
        assert_eq!(t.sugar, i64::MAX);
        assert_eq!(t.calories, i64::MAX);
        assert_eq!(t.carbohydrate, 0);

        assert_eq!(flavor_totals(&portions).unwrap().crunch, i64::MAX);
    }

    #[test]
    fn calories_saturate_even_when_sums_fit() {
        // 25 rows keep `fat` near 1.15e18, but `fat * 9` would not fit
        let f = food(Some(nutrition(0, i32::MAX, 0)));
        let portions = vec![Portion { grams: i32::MAX, food: Some(&f) }; 25];
        let t = nutrition_totals(&portions).unwrap();
        assert!(t.fat < i64::MAX);
        assert!(t.fat.checked_mul(9).is_none());
        assert_eq!(t.calories, i64::MAX);
    }

    #[test]
    fn grams_add_up() {
        let f = food(None);
        let portions = [
            Portion { grams: 30, food: Some(&f) },
            Portion { grams: 45, food: None },
        ];
        assert_eq!(total_grams(&portions), 75);
    }
}
