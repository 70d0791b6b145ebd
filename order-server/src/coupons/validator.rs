//! Coupon Validator
//!
//! Checks a coupon's validity at checkout and maintains its `used_by` set.
//! A coupon is consumed only after an order is successfully created, and a
//! cancellation releases the usage again.

use thiserror::Error;

use crate::db::models::Coupon;
use crate::db::repository::{CouponRepository, RepoError};

/// Coupon validation failures
#[derive(Debug, Error)]
pub enum CouponError {
    #[error("Invalid or expired coupon")]
    InvalidOrExpired,

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<CouponError> for crate::utils::AppError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::InvalidOrExpired => {
                crate::utils::AppError::Validation("Invalid or expired coupon".into())
            }
            CouponError::Repo(e) => e.into(),
        }
    }
}

#[derive(Clone)]
pub struct CouponValidator {
    coupons: CouponRepository,
}

impl CouponValidator {
    pub fn new(coupons: CouponRepository) -> Self {
        Self { coupons }
    }

    /// Resolve a usable coupon for this user.
    ///
    /// The name is case-normalized to upper. Fails when no live coupon has
    /// that name, when this user already consumed it, or when it expired.
    pub async fn validate(&self, name: &str, user_id: &str) -> Result<Coupon, CouponError> {
        let normalized = name.to_uppercase();
        let coupon = self
            .coupons
            .find_active_by_name(&normalized)
            .await?
            .ok_or(CouponError::InvalidOrExpired)?;

        if coupon.is_used_by(user_id) || coupon.is_expired(shared::util::now_millis()) {
            return Err(CouponError::InvalidOrExpired);
        }

        Ok(coupon)
    }

    /// Record consumption by a user. Idempotent (set semantics).
    pub async fn mark_used(&self, coupon_id: &str, user_id: &str) -> Result<(), CouponError> {
        self.coupons.mark_used(coupon_id, user_id).await?;
        Ok(())
    }

    /// Restore a user's eligibility after cancellation of the order that
    /// consumed the coupon.
    pub async fn release(&self, coupon_id: &str, user_id: &str) -> Result<(), CouponError> {
        self.coupons.release(coupon_id, user_id).await?;
        tracing::info!(coupon = %coupon_id, user = %user_id, "Coupon usage released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn setup() -> (CouponValidator, CouponRepository) {
        let db = db::connect_in_memory().await.unwrap();
        let repo = CouponRepository::new(db);
        (CouponValidator::new(repo.clone()), repo)
    }

    fn make_coupon(name: &str, amount: f64, expire_at: i64) -> Coupon {
        Coupon {
            coupon_id: shared::util::next_id("cpn"),
            name: name.to_string(),
            amount,
            expire_at,
            used_by: vec![],
            is_deleted: false,
            created_by: None,
            updated_by: None,
            created_at: shared::util::now_millis(),
        }
    }

    #[tokio::test]
    async fn validate_normalizes_name_case() {
        let (validator, repo) = setup().await;
        repo.create(&make_coupon("SAVE10", 10.0, i64::MAX))
            .await
            .unwrap();

        let coupon = validator.validate("save10", "user-1").await.unwrap();
        assert_eq!(coupon.name, "SAVE10");
        assert_eq!(coupon.amount, 10.0);
    }

    #[tokio::test]
    async fn validate_rejects_unknown_and_expired() {
        let (validator, repo) = setup().await;
        repo.create(&make_coupon("OLD", 20.0, shared::util::now_millis() - 1000))
            .await
            .unwrap();

        let err = validator.validate("NOPE", "user-1").await.unwrap_err();
        assert!(matches!(err, CouponError::InvalidOrExpired));

        let err = validator.validate("OLD", "user-1").await.unwrap_err();
        assert!(matches!(err, CouponError::InvalidOrExpired));
    }

    #[tokio::test]
    async fn single_use_per_user_until_released() {
        let (validator, repo) = setup().await;
        let coupon = repo
            .create(&make_coupon("SAVE10", 10.0, i64::MAX))
            .await
            .unwrap();

        // First use succeeds, then the user is blocked.
        validator.validate("SAVE10", "user-1").await.unwrap();
        validator.mark_used(&coupon.coupon_id, "user-1").await.unwrap();
        let err = validator.validate("SAVE10", "user-1").await.unwrap_err();
        assert!(matches!(err, CouponError::InvalidOrExpired));

        // A different user is unaffected.
        validator.validate("SAVE10", "user-2").await.unwrap();

        // Release restores eligibility.
        validator.release(&coupon.coupon_id, "user-1").await.unwrap();
        validator.validate("SAVE10", "user-1").await.unwrap();
    }

    #[tokio::test]
    async fn mark_used_is_idempotent() {
        let (validator, repo) = setup().await;
        let coupon = repo
            .create(&make_coupon("SAVE10", 10.0, i64::MAX))
            .await
            .unwrap();

        validator.mark_used(&coupon.coupon_id, "user-1").await.unwrap();
        validator.mark_used(&coupon.coupon_id, "user-1").await.unwrap();

        let stored = repo.find_by_id(&coupon.coupon_id).await.unwrap().unwrap();
        assert_eq!(stored.used_by, vec!["user-1".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let (_, repo) = setup().await;
        repo.create(&make_coupon("SAVE10", 10.0, i64::MAX))
            .await
            .unwrap();
        let err = repo
            .create(&make_coupon("SAVE10", 15.0, i64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }
}
