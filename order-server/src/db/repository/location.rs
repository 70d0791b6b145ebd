//! Location Repository

use super::{BaseRepository, RepoResult};
use crate::db::models::Location;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct LocationRepository {
    base: BaseRepository,
}

impl LocationRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, location: &Location) -> RepoResult<Location> {
        let created: Option<Location> = self
            .base
            .db()
            .query("CREATE location CONTENT $data RETURN AFTER")
            .bind(("data", location.clone()))
            .await
            .map_err(super::RepoError::from)?
            .take(0)
            .map_err(super::RepoError::from)?;
        created
            .ok_or_else(|| super::RepoError::Database("location create returned nothing".into()))
    }

    /// Look up a location, excluding soft-deleted rows.
    pub async fn find_active(&self, location_id: &str) -> RepoResult<Option<Location>> {
        let location: Option<Location> = self
            .base
            .db()
            .query(
                "SELECT * FROM location \
                 WHERE location_id = $location_id AND is_deleted = false LIMIT 1",
            )
            .bind(("location_id", location_id.to_string()))
            .await
            .map_err(super::RepoError::from)?
            .take(0)
            .map_err(super::RepoError::from)?;
        Ok(location)
    }
}
