use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::assignment::{Assignment, AssignmentStatus};
use crate::utils::errors::AppError;

pub struct AssignmentRepository;

impl AssignmentRepository {
    /// Inserta el assignment abierto. Los índices únicos parciales del schema
    /// rechazan un segundo assignment abierto para el mismo viaje, conductor
    /// o vehículo, de modo que dos assign concurrentes no pueden duplicarse
    /// aunque la validación previa haya corrido sobre datos viejos.
    pub async fn insert(
        conn: &mut PgConnection,
        trip_id: Uuid,
        driver_id: Uuid,
        vehicle_id: Option<Uuid>,
    ) -> Result<Assignment, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            INSERT INTO assignments (id, trip_id, driver_id, vehicle_id, assignment_status)
            VALUES ($1, $2, $3, $4, 'assigned')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(trip_id)
        .bind(driver_id)
        .bind(vehicle_id)
        .fetch_one(conn)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
                "an active assignment already exists for this trip, driver or vehicle".to_string(),
            ),
            _ => AppError::Database(e),
        })?;

        Ok(assignment)
    }

    pub async fn find_open_by_trip(
        conn: &mut PgConnection,
        trip_id: Uuid,
    ) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            SELECT * FROM assignments
            WHERE trip_id = $1 AND assignment_status IN ('assigned', 'active')
            "#,
        )
        .bind(trip_id)
        .fetch_optional(conn)
        .await?;

        Ok(assignment)
    }

    pub async fn find_open_by_driver(
        conn: &mut PgConnection,
        driver_id: Uuid,
    ) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            SELECT * FROM assignments
            WHERE driver_id = $1 AND assignment_status IN ('assigned', 'active')
            "#,
        )
        .bind(driver_id)
        .fetch_optional(conn)
        .await?;

        Ok(assignment)
    }

    /// Assignment más reciente de cada viaje del lote, para los joins del
    /// listado administrativo.
    pub async fn find_latest_by_trips(
        conn: &mut PgConnection,
        trip_ids: &[Uuid],
    ) -> Result<Vec<Assignment>, AppError> {
        let assignments = sqlx::query_as::<_, Assignment>(
            r#"
            SELECT DISTINCT ON (trip_id) * FROM assignments
            WHERE trip_id = ANY($1)
            ORDER BY trip_id, created_at DESC
            "#,
        )
        .bind(trip_ids)
        .fetch_all(conn)
        .await?;

        Ok(assignments)
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: AssignmentStatus,
    ) -> Result<Assignment, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            UPDATE assignments
            SET assignment_status = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(conn)
        .await?;

        Ok(assignment)
    }

    /// Cierra el assignment con un estado final y sella unassigned_at.
    /// El registro nunca se borra.
    pub async fn close(
        conn: &mut PgConnection,
        id: Uuid,
        status: AssignmentStatus,
    ) -> Result<Assignment, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            UPDATE assignments
            SET assignment_status = $2, unassigned_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(conn)
        .await?;

        Ok(assignment)
    }

    pub async fn record_booking_attempt(
        conn: &mut PgConnection,
        id: Uuid,
        failure_reason: Option<String>,
    ) -> Result<Assignment, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            UPDATE assignments
            SET booking_attempted = TRUE, booking_failure_reason = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(failure_reason)
        .fetch_one(conn)
        .await?;

        Ok(assignment)
    }
}
