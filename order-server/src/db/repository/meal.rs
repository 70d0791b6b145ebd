//! Meal Repository

use super::{BaseRepository, RepoResult};
use crate::db::models::Meal;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct MealRepository {
    base: BaseRepository,
}

impl MealRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, meal: &Meal) -> RepoResult<Meal> {
        let created: Option<Meal> = self
            .base
            .db()
            .query("CREATE meal CONTENT $data RETURN AFTER")
            .bind(("data", meal.clone()))
            .await
            .map_err(super::RepoError::from)?
            .take(0)
            .map_err(super::RepoError::from)?;
        created.ok_or_else(|| super::RepoError::Database("meal create returned nothing".into()))
    }

    /// Look up a meal regardless of its soft-delete flag.
    ///
    /// Pricing needs the deleted row to distinguish "never existed" from
    /// "was removed from the menu".
    pub async fn find_by_id(&self, meal_id: &str) -> RepoResult<Option<Meal>> {
        let meal: Option<Meal> = self
            .base
            .db()
            .query("SELECT * FROM meal WHERE meal_id = $meal_id LIMIT 1")
            .bind(("meal_id", meal_id.to_string()))
            .await
            .map_err(super::RepoError::from)?
            .take(0)
            .map_err(super::RepoError::from)?;
        Ok(meal)
    }

    /// Look up a meal, excluding soft-deleted rows.
    pub async fn find_active(&self, meal_id: &str) -> RepoResult<Option<Meal>> {
        let meal: Option<Meal> = self
            .base
            .db()
            .query("SELECT * FROM meal WHERE meal_id = $meal_id AND is_deleted = false LIMIT 1")
            .bind(("meal_id", meal_id.to_string()))
            .await
            .map_err(super::RepoError::from)?
            .take(0)
            .map_err(super::RepoError::from)?;
        Ok(meal)
    }

    /// Record a customer's interest in a currently unavailable meal.
    ///
    /// Set semantics: adding the same user twice has no extra effect.
    pub async fn add_wish_user(&self, meal_id: &str, user_id: &str) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE meal SET wish_users = array::union(wish_users, [$user_id]) \
                 WHERE meal_id = $meal_id",
            )
            .bind(("meal_id", meal_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(super::RepoError::from)?;
        Ok(())
    }
}
