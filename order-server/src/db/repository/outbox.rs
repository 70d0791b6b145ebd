//! Notification Outbox Repository

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{OutboxRecord, OutboxStatus};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct OutboxRepository {
    base: BaseRepository,
}

impl OutboxRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn enqueue(&self, record: &OutboxRecord) -> RepoResult<OutboxRecord> {
        let created: Option<OutboxRecord> = self
            .base
            .db()
            .query("CREATE notification CONTENT $data RETURN AFTER")
            .bind(("data", record.clone()))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        created.ok_or_else(|| RepoError::Database("notification enqueue returned nothing".into()))
    }

    /// Oldest-first batch of undelivered records.
    pub async fn fetch_pending(&self, limit: i64) -> RepoResult<Vec<OutboxRecord>> {
        let records: Vec<OutboxRecord> = self
            .base
            .db()
            .query(
                "SELECT * FROM notification WHERE status = $status \
                 ORDER BY created_at ASC LIMIT $limit",
            )
            .bind(("status", OutboxStatus::Pending))
            .bind(("limit", limit))
            .await
            .map_err(RepoError::from)?
            .take(0)
            .map_err(RepoError::from)?;
        Ok(records)
    }

    pub async fn mark_sent(&self, record_id: &str) -> RepoResult<()> {
        self.set_status(record_id, OutboxStatus::Sent).await
    }

    /// Bump the attempt counter; flip to Failed after `max_attempts`.
    pub async fn mark_attempt_failed(&self, record_id: &str, max_attempts: i32) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE notification SET \
                    attempts = attempts + 1, \
                    status = IF attempts + 1 >= $max THEN $failed ELSE $pending END, \
                    updated_at = $updated_at \
                 WHERE record_id = $record_id",
            )
            .bind(("record_id", record_id.to_string()))
            .bind(("max", max_attempts))
            .bind(("failed", OutboxStatus::Failed))
            .bind(("pending", OutboxStatus::Pending))
            .bind(("updated_at", shared::util::now_millis()))
            .await
            .map_err(RepoError::from)?;
        Ok(())
    }

    async fn set_status(&self, record_id: &str, status: OutboxStatus) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "UPDATE notification SET status = $status, updated_at = $updated_at \
                 WHERE record_id = $record_id",
            )
            .bind(("record_id", record_id.to_string()))
            .bind(("status", status))
            .bind(("updated_at", shared::util::now_millis()))
            .await
            .map_err(RepoError::from)?;
        Ok(())
    }
}
