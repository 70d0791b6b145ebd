//! Pricing engine
//!
//! Pure, side-effect-free price computation for one meal selection plus the
//! coupon and tax arithmetic used at checkout. Catalog rows are read-only
//! snapshots passed in by the caller, so everything here is safe to call
//! concurrently without coordination.

use rust_decimal::Decimal;
use shared::order::{MealSelection, PricedAddon, PricedLineItem};
use thiserror::Error;

use crate::db::models::{AddonOption, Coupon, Meal};
use crate::pricing::money::{round_money, to_decimal, to_f64};

/// Pricing failures
#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Invalid meal in order: {0}")]
    InvalidMeal(String),

    #[error("Invalid quantity {quantity} for meal {meal_id}")]
    InvalidQuantity { meal_id: String, quantity: i32 },
}

/// Upper bound on a single line's quantity
const MAX_QUANTITY: i32 = 9999;

/// Addon options resolved from the catalog, aligned index-for-index with
/// the id lists in the selection.
///
/// `None` marks an option that was not found or is unavailable. Such
/// entries are dropped from the priced result, but they still occupy their
/// position when the free allowance is counted.
#[derive(Debug, Default)]
pub struct ResolvedAddons {
    pub sauces: Vec<Option<AddonOption>>,
    pub drinks: Vec<Option<AddonOption>>,
    pub sides: Vec<Option<AddonOption>>,
}

/// Price one meal selection into an immutable line item.
///
/// The base price is the combo price when the selection is a combo,
/// otherwise the à la carte price. Per addon category independently, the
/// first `quantity` chosen options are free and every later one is charged
/// its listed price.
pub fn price_meal_selection(
    meal: Option<&Meal>,
    selection: &MealSelection,
    addons: &ResolvedAddons,
) -> Result<PricedLineItem, PricingError> {
    let meal = match meal {
        Some(m) if !m.is_deleted => m,
        _ => return Err(PricingError::InvalidMeal(selection.meal_id.clone())),
    };
    if selection.quantity < 1 || selection.quantity > MAX_QUANTITY {
        return Err(PricingError::InvalidQuantity {
            meal_id: selection.meal_id.clone(),
            quantity: selection.quantity,
        });
    }

    let unit_price = if selection.is_combo {
        meal.final_combo_price
    } else {
        meal.final_price
    };
    let quantity = Decimal::from(selection.quantity);
    let base_total = to_decimal(unit_price) * quantity;

    // One free unit per meal quantity, per category.
    let free_count = selection.quantity as usize;
    let (sauces, sauce_charges) = charge_category(&meal.title, "sauce", &addons.sauces, free_count);
    let (drinks, drink_charges) = charge_category(&meal.title, "drink", &addons.drinks, free_count);
    let (sides, side_charges) = charge_category(&meal.title, "side", &addons.sides, free_count);

    let line_total = round_money(base_total + sauce_charges + drink_charges + side_charges);

    Ok(PricedLineItem {
        meal_id: meal.meal_id.clone(),
        title: meal.title.clone(),
        description: meal.description.clone(),
        unit_price,
        quantity: selection.quantity,
        is_combo: selection.is_combo,
        sauces,
        drinks,
        sides,
        line_total: to_f64(line_total),
    })
}

/// Walk one category's resolved options in selection order, tagging each
/// with its charged price. Returns the kept addons and the charged sum.
fn charge_category(
    meal_title: &str,
    kind: &str,
    options: &[Option<AddonOption>],
    free_count: usize,
) -> (Vec<PricedAddon>, Decimal) {
    let mut priced = Vec::new();
    let mut charged = Decimal::ZERO;

    for (index, option) in options.iter().enumerate() {
        let Some(option) = option else {
            // Option missing or unavailable: drop it. It still used up its
            // slot in the free allowance (index keeps counting).
            tracing::warn!(
                meal = %meal_title,
                kind = %kind,
                index = index,
                "Addon option not found or unavailable, dropping from selection"
            );
            continue;
        };

        let price = if index < free_count {
            0.0
        } else {
            charged += to_decimal(option.price);
            option.price
        };

        priced.push(PricedAddon {
            option_id: option.option_id.clone(),
            name: option.name.clone(),
            price,
        });
    }

    (priced, charged)
}

/// Coupon discount on a subtotal: `subtotal * amount / 100`, 2 dp.
///
/// Absent coupon means no discount.
pub fn apply_coupon(subtotal: Decimal, coupon: Option<&Coupon>) -> Decimal {
    match coupon {
        Some(c) => round_money(subtotal * to_decimal(c.amount) / Decimal::ONE_HUNDRED),
        None => Decimal::ZERO,
    }
}

/// Tax on the discounted amount: `amount * rate / 100`, 2 dp.
pub fn compute_tax(amount_after_discount: Decimal, tax_rate_percent: f64) -> Decimal {
    round_money(amount_after_discount * to_decimal(tax_rate_percent) / Decimal::ONE_HUNDRED)
}

/// Order-level totals, each step rounded independently.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub discount: f64,
    pub discounted_subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

/// Roll a line-item subtotal up into the order's money fields.
pub fn compute_totals(subtotal: Decimal, coupon: Option<&Coupon>, tax_rate: f64) -> OrderTotals {
    let discount = apply_coupon(subtotal, coupon);
    let discounted = round_money(subtotal - discount);
    let tax = compute_tax(discounted, tax_rate);
    let total = round_money(discounted + tax);

    OrderTotals {
        subtotal: to_f64(subtotal),
        discount: to_f64(discount),
        discounted_subtotal: to_f64(discounted),
        tax: to_f64(tax),
        total: to_f64(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::AddonKind;

    fn make_meal(final_price: f64, final_combo_price: f64) -> Meal {
        Meal {
            meal_id: "meal-1".into(),
            title: "Crispy Bucket".into(),
            description: Some("8 pieces".into()),
            final_price,
            final_combo_price,
            is_combo: true,
            is_available: true,
            is_deleted: false,
            wish_users: vec![],
            created_at: 0,
        }
    }

    fn make_option(id: &str, price: f64) -> AddonOption {
        AddonOption {
            option_id: id.into(),
            kind: AddonKind::Sauce,
            name: format!("Sauce {id}"),
            price,
            is_available: true,
            is_deleted: false,
            created_at: 0,
        }
    }

    fn make_selection(quantity: i32, is_combo: bool, sauce_ids: &[&str]) -> MealSelection {
        MealSelection {
            meal_id: "meal-1".into(),
            quantity,
            is_combo,
            sauces: sauce_ids.iter().map(|s| s.to_string()).collect(),
            drinks: vec![],
            sides: vec![],
        }
    }

    fn make_coupon(amount: f64) -> Coupon {
        Coupon {
            coupon_id: "cpn-1".into(),
            name: "SAVE".into(),
            amount,
            expire_at: i64::MAX,
            used_by: vec![],
            is_deleted: false,
            created_by: None,
            updated_by: None,
            created_at: 0,
        }
    }

    #[test]
    fn combo_price_first_n_free() {
        // $10 base, quantity 2, combo, 3 sauces at $1: first 2 free,
        // 3rd charged -> 2 * 10 + 1 = 21
        let meal = make_meal(8.0, 10.0);
        let selection = make_selection(2, true, &["s1", "s2", "s3"]);
        let addons = ResolvedAddons {
            sauces: vec![
                Some(make_option("s1", 1.0)),
                Some(make_option("s2", 1.0)),
                Some(make_option("s3", 1.0)),
            ],
            ..Default::default()
        };

        let item = price_meal_selection(Some(&meal), &selection, &addons).unwrap();
        assert_eq!(item.unit_price, 10.0);
        assert_eq!(item.line_total, 21.0);
        assert_eq!(item.sauces[0].price, 0.0);
        assert_eq!(item.sauces[1].price, 0.0);
        assert_eq!(item.sauces[2].price, 1.0);
    }

    #[test]
    fn non_combo_uses_a_la_carte_price() {
        let meal = make_meal(8.0, 10.0);
        let selection = make_selection(3, false, &[]);
        let item =
            price_meal_selection(Some(&meal), &selection, &ResolvedAddons::default()).unwrap();
        assert_eq!(item.unit_price, 8.0);
        assert_eq!(item.line_total, 24.0);
        assert!(!item.is_combo);
    }

    #[test]
    fn free_allowance_is_min_of_quantity_and_chosen() {
        // quantity 5, only 2 sauces chosen: both free
        let meal = make_meal(8.0, 10.0);
        let selection = make_selection(5, true, &["s1", "s2"]);
        let addons = ResolvedAddons {
            sauces: vec![Some(make_option("s1", 1.5)), Some(make_option("s2", 2.0))],
            ..Default::default()
        };
        let item = price_meal_selection(Some(&meal), &selection, &addons).unwrap();
        assert!(item.sauces.iter().all(|s| s.price == 0.0));
        assert_eq!(item.line_total, 50.0);
    }

    #[test]
    fn allowance_counts_per_category_independently() {
        let meal = make_meal(8.0, 10.0);
        let mut selection = make_selection(1, true, &["s1", "s2"]);
        selection.drinks = vec!["d1".into(), "d2".into()];
        let addons = ResolvedAddons {
            sauces: vec![Some(make_option("s1", 1.0)), Some(make_option("s2", 1.0))],
            drinks: vec![Some(make_option("d1", 2.0)), Some(make_option("d2", 2.0))],
            sides: vec![],
        };
        let item = price_meal_selection(Some(&meal), &selection, &addons).unwrap();
        // One free per category: charged = 1.0 (2nd sauce) + 2.0 (2nd drink)
        assert_eq!(item.line_total, 13.0);
    }

    #[test]
    fn missing_option_is_dropped_but_consumes_allowance() {
        // quantity 1: slot 0 is the free one. The unresolved option sits at
        // slot 0, so the surviving option at slot 1 gets charged.
        let meal = make_meal(8.0, 10.0);
        let selection = make_selection(1, true, &["gone", "s2"]);
        let addons = ResolvedAddons {
            sauces: vec![None, Some(make_option("s2", 1.0))],
            ..Default::default()
        };
        let item = price_meal_selection(Some(&meal), &selection, &addons).unwrap();
        assert_eq!(item.sauces.len(), 1);
        assert_eq!(item.sauces[0].price, 1.0);
        assert_eq!(item.line_total, 11.0);
    }

    #[test]
    fn deleted_meal_is_invalid() {
        let mut meal = make_meal(8.0, 10.0);
        meal.is_deleted = true;
        let selection = make_selection(1, false, &[]);
        let err = price_meal_selection(Some(&meal), &selection, &ResolvedAddons::default())
            .unwrap_err();
        assert!(matches!(err, PricingError::InvalidMeal(_)));

        let err =
            price_meal_selection(None, &selection, &ResolvedAddons::default()).unwrap_err();
        assert!(matches!(err, PricingError::InvalidMeal(_)));
    }

    #[test]
    fn zero_quantity_rejected() {
        let meal = make_meal(8.0, 10.0);
        let selection = make_selection(0, false, &[]);
        let err = price_meal_selection(Some(&meal), &selection, &ResolvedAddons::default())
            .unwrap_err();
        assert!(matches!(err, PricingError::InvalidQuantity { .. }));
    }

    #[test]
    fn line_total_recomputable_from_snapshot() {
        let meal = make_meal(9.99, 12.49);
        let selection = make_selection(3, true, &["s1", "s2", "s3", "s4"]);
        let addons = ResolvedAddons {
            sauces: vec![
                Some(make_option("s1", 0.75)),
                Some(make_option("s2", 0.75)),
                Some(make_option("s3", 0.75)),
                Some(make_option("s4", 0.75)),
            ],
            ..Default::default()
        };
        let item = price_meal_selection(Some(&meal), &selection, &addons).unwrap();

        let recomputed = to_f64(
            to_decimal(item.unit_price) * Decimal::from(item.quantity)
                + item
                    .addons()
                    .map(|a| to_decimal(a.price))
                    .sum::<Decimal>(),
        );
        assert_eq!(item.line_total, recomputed);
    }

    #[test]
    fn coupon_discount_and_tax_example() {
        // Subtotal $50, coupon 10% -> $5.00 discount; 7% tax on $45 ->
        // $3.15; total $48.15
        let coupon = make_coupon(10.0);
        let totals = compute_totals(to_decimal(50.0), Some(&coupon), 7.0);
        assert_eq!(totals.discount, 5.0);
        assert_eq!(totals.discounted_subtotal, 45.0);
        assert_eq!(totals.tax, 3.15);
        assert_eq!(totals.total, 48.15);
    }

    #[test]
    fn no_coupon_means_no_discount() {
        let totals = compute_totals(to_decimal(20.0), None, 7.0);
        assert_eq!(totals.discount, 0.0);
        assert_eq!(totals.discounted_subtotal, 20.0);
        assert_eq!(totals.tax, 1.4);
        assert_eq!(totals.total, 21.4);
    }

    #[test]
    fn per_step_rounding() {
        // 33.335 * 10% = 3.3335 -> discount 3.33 (rounded on its own),
        // discounted 30.01 (not 30.0015)
        let coupon = make_coupon(10.0);
        let totals = compute_totals(to_decimal(33.335), Some(&coupon), 0.0);
        assert_eq!(totals.discount, 3.33);
        assert_eq!(totals.discounted_subtotal, 30.01);
        assert_eq!(totals.total, 30.01);
    }

    #[test]
    fn totals_identity_holds() {
        // total == round2(subtotal - discount) + round2(that * rate / 100)
        let coupon = make_coupon(15.0);
        let totals = compute_totals(to_decimal(123.45), Some(&coupon), 8.25);
        let discounted = to_decimal(totals.subtotal) - to_decimal(totals.discount);
        let expected =
            to_f64(round_money(discounted) + compute_tax(round_money(discounted), 8.25));
        assert_eq!(totals.total, expected);
    }
}
