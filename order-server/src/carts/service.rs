//! Cart Aggregator
//!
//! CRUD over a user's pending selections plus on-demand subtotal
//! computation for display. Cart mutations for a single user serialize on a
//! keyed lock; quantity increments are read-modify-write.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use shared::order::{AddonKind, MealSelection, PricedLineItem};

use crate::db::models::{Cart, CartExtra};
use crate::db::repository::{AddonRepository, CartRepository, MealRepository, RepoError};
use crate::pricing::money::{round_money, to_decimal, to_f64};
use crate::pricing::{ResolvedAddons, price_meal_selection};
use crate::utils::KeyedMutex;

/// Cart operation failures
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Invalid meal id: {0}")]
    InvalidMeal(String),

    #[error("This meal cannot be purchased right now")]
    MealUnavailable(String),

    #[error("This {} is not available", .kind.as_str())]
    OptionUnavailable { kind: AddonKind, option_id: String },

    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<CartError> for crate::utils::AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Repo(e) => e.into(),
            other => crate::utils::AppError::Validation(other.to_string()),
        }
    }
}

/// Priced view of one standalone addon entry
#[derive(Debug, Clone, Serialize)]
pub struct CartExtraView {
    pub kind: AddonKind,
    pub option_id: String,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub item_subtotal: f64,
}

/// Priced view of the whole cart
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub user_id: String,
    pub meals: Vec<PricedLineItem>,
    pub extras: Vec<CartExtraView>,
    pub cart_subtotal: f64,
}

impl CartView {
    fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            meals: Vec::new(),
            extras: Vec::new(),
            cart_subtotal: 0.0,
        }
    }
}

#[derive(Clone)]
pub struct CartService {
    carts: CartRepository,
    meals: MealRepository,
    addons: AddonRepository,
    locks: Arc<KeyedMutex>,
}

impl CartService {
    pub fn new(
        carts: CartRepository,
        meals: MealRepository,
        addons: AddonRepository,
        locks: Arc<KeyedMutex>,
    ) -> Self {
        Self {
            carts,
            meals,
            addons,
            locks,
        }
    }

    /// Add a meal selection to the user's cart.
    ///
    /// An unavailable meal records the user as an interested party
    /// (wish-list) before failing. An equivalent entry (same meal, same
    /// combo configuration) has its quantity incremented instead of being
    /// duplicated.
    pub async fn add_meal(
        &self,
        user_id: &str,
        mut selection: MealSelection,
    ) -> Result<Cart, CartError> {
        if selection.quantity < 1 {
            return Err(CartError::InvalidQuantity(selection.quantity));
        }

        let meal = self
            .meals
            .find_by_id(&selection.meal_id)
            .await?
            .ok_or_else(|| CartError::InvalidMeal(selection.meal_id.clone()))?;

        if !meal.is_orderable() {
            self.meals.add_wish_user(&meal.meal_id, user_id).await?;
            return Err(CartError::MealUnavailable(meal.meal_id));
        }

        // Addon choices only make sense on combos.
        if !selection.is_combo {
            selection.sauces.clear();
            selection.drinks.clear();
            selection.sides.clear();
        }

        let lock = self.locks.get(user_id);
        let _guard = lock.lock().await;

        let mut cart = self.load_or_create(user_id).await?;
        match cart.meals.iter_mut().find(|m| m.merges_with(&selection)) {
            Some(existing) => existing.quantity += selection.quantity,
            None => cart.meals.push(selection),
        }
        Ok(self.carts.save_items(&cart).await?)
    }

    /// Add a standalone addon purchase (outside any meal).
    pub async fn add_standalone_addon(
        &self,
        user_id: &str,
        kind: AddonKind,
        option_id: &str,
        quantity: i32,
    ) -> Result<Cart, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let option = self
            .addons
            .find_active_of_kind(kind, option_id)
            .await?
            .filter(|o| o.is_orderable())
            .ok_or_else(|| CartError::OptionUnavailable {
                kind,
                option_id: option_id.to_string(),
            })?;

        let lock = self.locks.get(user_id);
        let _guard = lock.lock().await;

        let mut cart = self.load_or_create(user_id).await?;
        match cart
            .extras
            .iter_mut()
            .find(|e| e.kind == kind && e.option_id == option.option_id)
        {
            Some(existing) => existing.quantity += quantity,
            None => cart.extras.push(CartExtra {
                kind,
                option_id: option.option_id.clone(),
                quantity,
            }),
        }
        Ok(self.carts.save_items(&cart).await?)
    }

    /// Priced view of the user's cart.
    ///
    /// A missing or empty cart yields a zero-subtotal empty view, never an
    /// error. Entries whose meal disappeared from the catalog are skipped.
    pub async fn get_cart(&self, user_id: &str) -> Result<CartView, CartError> {
        let Some(cart) = self.carts.find_active_by_user(user_id).await? else {
            return Ok(CartView::empty(user_id));
        };
        if cart.is_empty() {
            return Ok(CartView::empty(user_id));
        }

        let mut subtotal = rust_decimal::Decimal::ZERO;
        let mut meals = Vec::new();

        for selection in &cart.meals {
            let meal = self.meals.find_by_id(&selection.meal_id).await?;
            let resolved = self.resolve_addons(selection).await?;
            match price_meal_selection(meal.as_ref(), selection, &resolved) {
                Ok(item) => {
                    subtotal += to_decimal(item.line_total);
                    meals.push(item);
                }
                Err(e) => {
                    tracing::warn!(
                        user = %user_id,
                        meal = %selection.meal_id,
                        error = %e,
                        "Skipping unpriceable cart entry"
                    );
                }
            }
        }

        let mut extras = Vec::new();
        for extra in &cart.extras {
            let view = match self.addons.find_active(&extra.option_id).await? {
                Some(option) => {
                    let item_subtotal = to_f64(
                        to_decimal(option.price) * rust_decimal::Decimal::from(extra.quantity),
                    );
                    subtotal += to_decimal(item_subtotal);
                    CartExtraView {
                        kind: extra.kind,
                        option_id: extra.option_id.clone(),
                        name: option.name,
                        unit_price: option.price,
                        quantity: extra.quantity,
                        item_subtotal,
                    }
                }
                // Stale option id: show it as unavailable at zero rather
                // than failing the whole view.
                None => CartExtraView {
                    kind: extra.kind,
                    option_id: extra.option_id.clone(),
                    name: "Unavailable".to_string(),
                    unit_price: 0.0,
                    quantity: extra.quantity,
                    item_subtotal: 0.0,
                },
            };
            extras.push(view);
        }

        Ok(CartView {
            user_id: user_id.to_string(),
            meals,
            extras,
            cart_subtotal: to_f64(round_money(subtotal)),
        })
    }

    /// The raw persisted cart, if any.
    pub async fn find_cart(&self, user_id: &str) -> Result<Option<Cart>, CartError> {
        Ok(self.carts.find_active_by_user(user_id).await?)
    }

    /// Remove everything from the user's cart.
    pub async fn clear_all(&self, user_id: &str) -> Result<(), CartError> {
        let lock = self.locks.get(user_id);
        let _guard = lock.lock().await;
        self.carts.clear_all(user_id).await?;
        Ok(())
    }

    /// Remove only the given meals from the user's cart.
    pub async fn clear_items(&self, user_id: &str, meal_ids: &[String]) -> Result<(), CartError> {
        let lock = self.locks.get(user_id);
        let _guard = lock.lock().await;
        self.carts.clear_meals(user_id, meal_ids).await?;
        Ok(())
    }

    /// Resolve a selection's addon id lists against the catalog, keeping
    /// index alignment (missing/unavailable -> None).
    pub async fn resolve_addons(
        &self,
        selection: &MealSelection,
    ) -> Result<ResolvedAddons, CartError> {
        let mut resolved = ResolvedAddons::default();
        for id in &selection.sauces {
            resolved
                .sauces
                .push(self.lookup_orderable(id).await?);
        }
        for id in &selection.drinks {
            resolved
                .drinks
                .push(self.lookup_orderable(id).await?);
        }
        for id in &selection.sides {
            resolved
                .sides
                .push(self.lookup_orderable(id).await?);
        }
        Ok(resolved)
    }

    async fn lookup_orderable(
        &self,
        option_id: &str,
    ) -> Result<Option<crate::db::models::AddonOption>, CartError> {
        Ok(self
            .addons
            .find_active(option_id)
            .await?
            .filter(|o| o.is_orderable()))
    }

    async fn load_or_create(&self, user_id: &str) -> Result<Cart, CartError> {
        match self.carts.find_active_by_user(user_id).await? {
            Some(cart) => Ok(cart),
            None => {
                let now = shared::util::now_millis();
                let cart = Cart {
                    cart_id: shared::util::next_id("crt"),
                    user_id: user_id.to_string(),
                    meals: Vec::new(),
                    extras: Vec::new(),
                    is_deleted: false,
                    created_at: now,
                    updated_at: now,
                };
                Ok(self.carts.create(&cart).await?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::{AddonOption, Meal};

    async fn setup() -> (CartService, MealRepository, AddonRepository) {
        let db = db::connect_in_memory().await.unwrap();
        let meals = MealRepository::new(db.clone());
        let addons = AddonRepository::new(db.clone());
        let service = CartService::new(
            CartRepository::new(db.clone()),
            meals.clone(),
            addons.clone(),
            Arc::new(KeyedMutex::new()),
        );
        (service, meals, addons)
    }

    fn make_meal(id: &str, price: f64, combo_price: f64, available: bool) -> Meal {
        Meal {
            meal_id: id.into(),
            title: format!("Meal {id}"),
            description: None,
            final_price: price,
            final_combo_price: combo_price,
            is_combo: true,
            is_available: available,
            is_deleted: false,
            wish_users: vec![],
            created_at: 0,
        }
    }

    fn make_option(id: &str, kind: AddonKind, price: f64) -> AddonOption {
        AddonOption {
            option_id: id.into(),
            kind,
            name: format!("Option {id}"),
            price,
            is_available: true,
            is_deleted: false,
            created_at: 0,
        }
    }

    fn selection(meal_id: &str, quantity: i32) -> MealSelection {
        MealSelection {
            meal_id: meal_id.into(),
            quantity,
            is_combo: false,
            sauces: vec![],
            drinks: vec![],
            sides: vec![],
        }
    }

    #[tokio::test]
    async fn equivalent_entries_merge_by_incrementing_quantity() {
        let (service, meals, _) = setup().await;
        meals.create(&make_meal("m1", 8.0, 10.0, true)).await.unwrap();

        service.add_meal("user-1", selection("m1", 1)).await.unwrap();
        let cart = service.add_meal("user-1", selection("m1", 2)).await.unwrap();

        assert_eq!(cart.meals.len(), 1);
        assert_eq!(cart.meals[0].quantity, 3);
    }

    #[tokio::test]
    async fn combo_with_different_addons_gets_its_own_entry() {
        let (service, meals, _) = setup().await;
        meals.create(&make_meal("m1", 8.0, 10.0, true)).await.unwrap();

        let mut combo_a = selection("m1", 1);
        combo_a.is_combo = true;
        combo_a.sauces = vec!["s1".into()];
        let mut combo_b = selection("m1", 1);
        combo_b.is_combo = true;
        combo_b.sauces = vec!["s2".into()];

        service.add_meal("user-1", combo_a).await.unwrap();
        let cart = service.add_meal("user-1", combo_b).await.unwrap();
        assert_eq!(cart.meals.len(), 2);
    }

    #[tokio::test]
    async fn unavailable_meal_records_wishlist_interest() {
        let (service, meals, _) = setup().await;
        meals.create(&make_meal("m1", 8.0, 10.0, false)).await.unwrap();

        let err = service
            .add_meal("user-1", selection("m1", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::MealUnavailable(_)));

        let stored = meals.find_by_id("m1").await.unwrap().unwrap();
        assert_eq!(stored.wish_users, vec!["user-1".to_string()]);
    }

    #[tokio::test]
    async fn unknown_meal_is_invalid() {
        let (service, _, _) = setup().await;
        let err = service
            .add_meal("user-1", selection("ghost", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidMeal(_)));
    }

    #[tokio::test]
    async fn standalone_addons_merge_by_kind_and_option() {
        let (service, _, addons) = setup().await;
        addons
            .create(&make_option("d1", AddonKind::Drink, 2.5))
            .await
            .unwrap();

        service
            .add_standalone_addon("user-1", AddonKind::Drink, "d1", 1)
            .await
            .unwrap();
        let cart = service
            .add_standalone_addon("user-1", AddonKind::Drink, "d1", 2)
            .await
            .unwrap();

        assert_eq!(cart.extras.len(), 1);
        assert_eq!(cart.extras[0].quantity, 3);
    }

    #[tokio::test]
    async fn empty_cart_yields_zero_view() {
        let (service, _, _) = setup().await;
        let view = service.get_cart("user-1").await.unwrap();
        assert!(view.meals.is_empty());
        assert!(view.extras.is_empty());
        assert_eq!(view.cart_subtotal, 0.0);
    }

    #[tokio::test]
    async fn cart_view_prices_meals_and_extras() {
        let (service, meals, addons) = setup().await;
        meals.create(&make_meal("m1", 8.0, 10.0, true)).await.unwrap();
        addons
            .create(&make_option("s1", AddonKind::Sauce, 1.0))
            .await
            .unwrap();
        addons
            .create(&make_option("s2", AddonKind::Sauce, 1.0))
            .await
            .unwrap();

        // Combo, quantity 1, two sauces: one free, one charged.
        let mut combo = selection("m1", 1);
        combo.is_combo = true;
        combo.sauces = vec!["s1".into(), "s2".into()];
        service.add_meal("user-1", combo).await.unwrap();

        // Plus two standalone sauces.
        service
            .add_standalone_addon("user-1", AddonKind::Sauce, "s1", 2)
            .await
            .unwrap();

        let view = service.get_cart("user-1").await.unwrap();
        // 10.0 (combo base) + 1.0 (second sauce) + 2 * 1.0 (extras)
        assert_eq!(view.cart_subtotal, 13.0);
        assert_eq!(view.meals[0].line_total, 11.0);
        assert_eq!(view.extras[0].item_subtotal, 2.0);
    }

    #[tokio::test]
    async fn clear_items_removes_only_named_meals() {
        let (service, meals, _) = setup().await;
        meals.create(&make_meal("m1", 8.0, 10.0, true)).await.unwrap();
        meals.create(&make_meal("m2", 6.0, 7.5, true)).await.unwrap();

        service.add_meal("user-1", selection("m1", 1)).await.unwrap();
        service.add_meal("user-1", selection("m2", 1)).await.unwrap();

        service
            .clear_items("user-1", &["m1".to_string()])
            .await
            .unwrap();

        let cart = service.find_cart("user-1").await.unwrap().unwrap();
        assert_eq!(cart.meals.len(), 1);
        assert_eq!(cart.meals[0].meal_id, "m2");

        service.clear_all("user-1").await.unwrap();
        let cart = service.find_cart("user-1").await.unwrap().unwrap();
        assert!(cart.is_empty());
    }
}
