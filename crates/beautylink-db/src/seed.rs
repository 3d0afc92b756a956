use beautylink_core::ServiceConfig;
use sqlx::PgPool;

use crate::DbError;

/// Upsert the service catalog into the database, keyed by English name.
///
/// Returns the number of services processed (inserted or updated).
/// All upserts run inside a single transaction; if any operation fails
/// the entire batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_services(pool: &PgPool, services: &[ServiceConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for service in services {
        sqlx::query(
            "INSERT INTO services (name_fr, name_en, category, description, images, duration_minutes, base_price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (name_en) DO UPDATE SET \
                 name_fr = EXCLUDED.name_fr, \
                 category = EXCLUDED.category, \
                 description = EXCLUDED.description, \
                 images = EXCLUDED.images, \
                 duration_minutes = EXCLUDED.duration_minutes, \
                 base_price = EXCLUDED.base_price, \
                 updated_at = NOW()",
        )
        .bind(&service.name_fr)
        .bind(&service.name_en)
        .bind(&service.category)
        .bind(service.description.as_deref())
        .bind(&service.images)
        .bind(service.duration_minutes)
        .bind(service.base_price)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    tracing::info!(services = count, "service catalog seeded");
    Ok(count)
}
