//! Coupon Repository
//!
//! Coupon names carry a UNIQUE index; `used_by` is maintained with array
//! set operations so concurrent marks stay idempotent.

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::Coupon;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct CouponRepository {
    base: BaseRepository,
}

impl CouponRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Create a coupon; a duplicate name maps to [`RepoError::Duplicate`].
    pub async fn create(&self, coupon: &Coupon) -> RepoResult<Coupon> {
        let result = self
            .base
            .db()
            .query("CREATE coupon CONTENT $data RETURN AFTER")
            .bind(("data", coupon.clone()))
            .await;

        match result {
            Ok(mut response) => {
                let created: Option<Coupon> =
                    response.take(0).map_err(|e| {
                        if RepoError::is_unique_violation(&e) {
                            RepoError::Duplicate(format!("coupon name {}", coupon.name))
                        } else {
                            RepoError::from(e)
                        }
                    })?;
                created.ok_or_else(|| RepoError::Database("coupon create returned nothing".into()))
            }
            Err(e) if RepoError::is_unique_violation(&e) => {
                Err(RepoError::Duplicate(format!("coupon name {}", coupon.name)))
            }
            Err(e) => Err(RepoError::from(e)),
        }
    }

    pub async fn find_all(&self) -> RepoResult<Vec<Coupon>> {
        let coupons: Vec<Coupon> = self
            .base
            .db()
            .query("SELECT * FROM coupon WHERE is_deleted = false ORDER BY created_at DESC")
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(coupons)
    }

    pub async fn find_by_id(&self, coupon_id: &str) -> RepoResult<Option<Coupon>> {
        let coupon: Option<Coupon> = self
            .base
            .db()
            .query("SELECT * FROM coupon WHERE coupon_id = $coupon_id LIMIT 1")
            .bind(("coupon_id", coupon_id.to_string()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(coupon)
    }

    /// Look up a live coupon by (already upper-cased) name.
    pub async fn find_active_by_name(&self, name: &str) -> RepoResult<Option<Coupon>> {
        let coupon: Option<Coupon> = self
            .base
            .db()
            .query("SELECT * FROM coupon WHERE name = $name AND is_deleted = false LIMIT 1")
            .bind(("name", name.to_string()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(coupon)
    }

    /// Apply admin edits (name assumed upper-cased by the caller).
    pub async fn update(&self, coupon: &Coupon) -> RepoResult<Coupon> {
        let updated: Option<Coupon> = self
            .base
            .db()
            .query(
                "UPDATE coupon SET \
                    name = $name, \
                    amount = $amount, \
                    expire_at = $expire_at, \
                    updated_by = $updated_by \
                 WHERE coupon_id = $coupon_id RETURN AFTER",
            )
            .bind(("coupon_id", coupon.coupon_id.clone()))
            .bind(("name", coupon.name.clone()))
            .bind(("amount", coupon.amount))
            .bind(("expire_at", coupon.expire_at))
            .bind(("updated_by", coupon.updated_by.clone()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        updated.ok_or_else(|| RepoError::NotFound(format!("coupon {}", coupon.coupon_id)))
    }

    /// Soft-delete a coupon.
    pub async fn delete(&self, coupon_id: &str) -> RepoResult<bool> {
        let deleted: Option<Coupon> = self
            .base
            .db()
            .query(
                "UPDATE coupon SET is_deleted = true \
                 WHERE coupon_id = $coupon_id RETURN AFTER",
            )
            .bind(("coupon_id", coupon_id.to_string()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(deleted.is_some())
    }

    /// Record that a user consumed the coupon (set semantics, idempotent).
    pub async fn mark_used(&self, coupon_id: &str, user_id: &str) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE coupon SET used_by = array::union(used_by, [$user_id]) \
                 WHERE coupon_id = $coupon_id",
            )
            .bind(("coupon_id", coupon_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(RepoError::from)?;
        Ok(())
    }

    /// Restore a user's eligibility after their order was cancelled.
    pub async fn release(&self, coupon_id: &str, user_id: &str) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE coupon SET used_by -= $user_id \
                 WHERE coupon_id = $coupon_id",
            )
            .bind(("coupon_id", coupon_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(RepoError::from)?;
        Ok(())
    }
}
