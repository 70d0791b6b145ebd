//! Database Module
//!
//! Embedded SurrealDB bootstrap: opens the datastore, selects the
//! namespace, and declares the unique indexes the domain relies on.

pub mod models;
pub mod repository;

use crate::utils::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

const NAMESPACE: &str = "storefront";
const DATABASE: &str = "storefront";

/// Open the on-disk datastore under `work_dir`.
pub async fn connect(work_dir: &str) -> Result<Surreal<Db>, AppError> {
    let path = format!("{}/data", work_dir);
    let db = Surreal::new::<RocksDb>(path.as_str())
        .await
        .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;
    initialize(&db).await?;
    tracing::info!(path = %path, "Database connection established");
    Ok(db)
}

/// Open an in-memory datastore (tests).
pub async fn connect_in_memory() -> Result<Surreal<Db>, AppError> {
    let db = Surreal::new::<Mem>(())
        .await
        .map_err(|e| AppError::database(format!("Failed to open in-memory database: {e}")))?;
    initialize(&db).await?;
    Ok(db)
}

async fn initialize(db: &Surreal<Db>) -> Result<(), AppError> {
    db.use_ns(NAMESPACE)
        .use_db(DATABASE)
        .await
        .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

    // Uniqueness the domain depends on:
    //   - one coupon per name
    //   - one wallet and one cart per user
    //   - business ids are primary lookups everywhere
    db.query(
        "
        DEFINE INDEX IF NOT EXISTS meal_id_unique ON TABLE meal FIELDS meal_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS addon_id_unique ON TABLE addon_option FIELDS option_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS location_id_unique ON TABLE location FIELDS location_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS coupon_id_unique ON TABLE coupon FIELDS coupon_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS coupon_name_unique ON TABLE coupon FIELDS name UNIQUE;
        DEFINE INDEX IF NOT EXISTS cart_user_unique ON TABLE cart FIELDS user_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS order_id_unique ON TABLE order FIELDS order_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS order_user_idx ON TABLE order FIELDS user_id;
        DEFINE INDEX IF NOT EXISTS order_location_idx ON TABLE order FIELDS location_id;
        DEFINE INDEX IF NOT EXISTS wallet_user_unique ON TABLE wallet FIELDS user_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS notification_id_unique ON TABLE notification FIELDS record_id UNIQUE;
        ",
    )
    .await
    .map_err(|e| AppError::database(format!("Failed to define indexes: {e}")))?;

    Ok(())
}
