//! Cart Repository
//!
//! One active cart per user (UNIQUE index on `user_id`). Mutations replace
//! the whole selection arrays; the per-user keyed lock in the service layer
//! makes the read-modify-write safe.

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::Cart;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct CartRepository {
    base: BaseRepository,
}

impl CartRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Fetch a user's active cart, excluding soft-deleted rows.
    pub async fn find_active_by_user(&self, user_id: &str) -> RepoResult<Option<Cart>> {
        let cart: Option<Cart> = self
            .base
            .db()
            .query(
                "SELECT * FROM cart \
                 WHERE user_id = $user_id AND is_deleted = false LIMIT 1",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(cart)
    }

    pub async fn create(&self, cart: &Cart) -> RepoResult<Cart> {
        let created: Option<Cart> = self
            .base
            .db()
            .query("CREATE cart CONTENT $data RETURN AFTER")
            .bind(("data", cart.clone()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        created.ok_or_else(|| RepoError::Database("cart create returned nothing".into()))
    }

    /// Persist updated selections for an existing cart.
    pub async fn save_items(&self, cart: &Cart) -> RepoResult<Cart> {
        let updated: Option<Cart> = self
            .base
            .db()
            .query(
                "UPDATE cart SET \
                    meals = $meals, \
                    extras = $extras, \
                    updated_at = $updated_at \
                 WHERE cart_id = $cart_id RETURN AFTER",
            )
            .bind(("cart_id", cart.cart_id.clone()))
            .bind(("meals", cart.meals.clone()))
            .bind(("extras", cart.extras.clone()))
            .bind(("updated_at", shared::util::now_millis()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        updated.ok_or_else(|| RepoError::NotFound(format!("cart {}", cart.cart_id)))
    }

    /// Wholesale removal of every selection in the user's cart.
    pub async fn clear_all(&self, user_id: &str) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE cart SET meals = [], extras = [], updated_at = $updated_at \
                 WHERE user_id = $user_id AND is_deleted = false",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("updated_at", shared::util::now_millis()))
            .await
            .map_err(RepoError::from)?;
        Ok(())
    }

    /// Remove only the meal entries whose meal id is in `meal_ids`.
    pub async fn clear_meals(&self, user_id: &str, meal_ids: &[String]) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE cart SET \
                    meals = meals[WHERE meal_id NOT IN $meal_ids], \
                    updated_at = $updated_at \
                 WHERE user_id = $user_id AND is_deleted = false",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("meal_ids", meal_ids.to_vec()))
            .bind(("updated_at", shared::util::now_millis()))
            .await
            .map_err(RepoError::from)?;
        Ok(())
    }
}
