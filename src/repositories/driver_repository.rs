use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::driver::Driver;
use crate::utils::errors::AppError;

pub struct DriverRepository;

impl DriverRepository {
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Driver>, AppError> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(driver)
    }

    /// Bloquea la fila del conductor mientras dura la transacción de assign,
    /// para que dos assign concurrentes sobre el mismo conductor se serialicen.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Driver>, AppError> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(driver)
    }

    pub async fn set_availability(
        conn: &mut PgConnection,
        id: Uuid,
        is_available: bool,
    ) -> Result<Driver, AppError> {
        let driver = sqlx::query_as::<_, Driver>(
            "UPDATE drivers SET is_available = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_available)
        .fetch_one(conn)
        .await?;

        Ok(driver)
    }
}
