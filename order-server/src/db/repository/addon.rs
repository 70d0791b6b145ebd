//! Addon Option Repository
//!
//! Sauces, drinks, and sides share one table, discriminated by `kind`.

use super::{BaseRepository, RepoResult};
use crate::db::models::AddonOption;
use shared::order::AddonKind;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct AddonRepository {
    base: BaseRepository,
}

impl AddonRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, option: &AddonOption) -> RepoResult<AddonOption> {
        let created: Option<AddonOption> = self
            .base
            .db()
            .query("CREATE addon_option CONTENT $data RETURN AFTER")
            .bind(("data", option.clone()))
            .await
            .map_err(super::RepoError::from)?
            .take(0)
            .map_err(super::RepoError::from)?;
        created
            .ok_or_else(|| super::RepoError::Database("addon create returned nothing".into()))
    }

    /// Look up an option by id, any kind, excluding soft-deleted rows.
    pub async fn find_active(&self, option_id: &str) -> RepoResult<Option<AddonOption>> {
        let option: Option<AddonOption> = self
            .base
            .db()
            .query(
                "SELECT * FROM addon_option \
                 WHERE option_id = $option_id AND is_deleted = false LIMIT 1",
            )
            .bind(("option_id", option_id.to_string()))
            .await
            .map_err(super::RepoError::from)?
            .take(0)
            .map_err(super::RepoError::from)?;
        Ok(option)
    }

    /// Look up an option of a specific kind (standalone cart extras name
    /// their category explicitly).
    pub async fn find_active_of_kind(
        &self,
        kind: AddonKind,
        option_id: &str,
    ) -> RepoResult<Option<AddonOption>> {
        let option: Option<AddonOption> = self
            .base
            .db()
            .query(
                "SELECT * FROM addon_option \
                 WHERE option_id = $option_id AND kind = $kind AND is_deleted = false LIMIT 1",
            )
            .bind(("option_id", option_id.to_string()))
            .bind(("kind", kind))
            .await
            .map_err(super::RepoError::from)?
            .take(0)
            .map_err(super::RepoError::from)?;
        Ok(option)
    }
}
