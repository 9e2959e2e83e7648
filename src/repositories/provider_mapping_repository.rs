use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::provider_mapping::ProviderMapping;
use crate::models::trip::ProviderType;
use crate::utils::errors::AppError;

pub struct ProviderMappingRepository;

impl ProviderMappingRepository {
    /// Un mapping por viaje durante toda su vida (trip_id es UNIQUE).
    pub async fn insert(
        conn: &mut PgConnection,
        trip_id: Uuid,
        provider: ProviderType,
        external_booking_id: Option<String>,
        partner_status: &str,
        raw_payload: Option<serde_json::Value>,
    ) -> Result<ProviderMapping, AppError> {
        let mapping = sqlx::query_as::<_, ProviderMapping>(
            r#"
            INSERT INTO provider_mappings
                (id, trip_id, provider, external_booking_id, partner_status, raw_payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(trip_id)
        .bind(provider)
        .bind(external_booking_id)
        .bind(partner_status)
        .bind(raw_payload)
        .fetch_one(conn)
        .await?;

        Ok(mapping)
    }

    pub async fn find_by_trip(
        conn: &mut PgConnection,
        trip_id: Uuid,
    ) -> Result<Option<ProviderMapping>, AppError> {
        let mapping =
            sqlx::query_as::<_, ProviderMapping>("SELECT * FROM provider_mappings WHERE trip_id = $1")
                .bind(trip_id)
                .fetch_optional(conn)
                .await?;

        Ok(mapping)
    }

    pub async fn find_by_trips(
        conn: &mut PgConnection,
        trip_ids: &[Uuid],
    ) -> Result<Vec<ProviderMapping>, AppError> {
        let mappings = sqlx::query_as::<_, ProviderMapping>(
            "SELECT * FROM provider_mappings WHERE trip_id = ANY($1)",
        )
        .bind(trip_ids)
        .fetch_all(conn)
        .await?;

        Ok(mappings)
    }

    pub async fn find_by_external_booking_id(
        conn: &mut PgConnection,
        external_booking_id: &str,
    ) -> Result<Option<ProviderMapping>, AppError> {
        let mapping = sqlx::query_as::<_, ProviderMapping>(
            "SELECT * FROM provider_mappings WHERE external_booking_id = $1",
        )
        .bind(external_booking_id)
        .fetch_optional(conn)
        .await?;

        Ok(mapping)
    }

    /// Supersede provider y booking id del mapping existente; una
    /// reasignación nunca crea un segundo mapping.
    pub async fn supersede_booking(
        conn: &mut PgConnection,
        trip_id: Uuid,
        provider: ProviderType,
        external_booking_id: Option<String>,
        partner_status: &str,
        raw_payload: Option<serde_json::Value>,
    ) -> Result<ProviderMapping, AppError> {
        let mapping = sqlx::query_as::<_, ProviderMapping>(
            r#"
            UPDATE provider_mappings
            SET provider = $2, external_booking_id = $3, partner_status = $4,
                raw_payload = COALESCE($5, raw_payload), updated_at = now()
            WHERE trip_id = $1
            RETURNING *
            "#,
        )
        .bind(trip_id)
        .bind(provider)
        .bind(external_booking_id)
        .bind(partner_status)
        .bind(raw_payload)
        .fetch_one(conn)
        .await?;

        Ok(mapping)
    }

    pub async fn update_partner_status(
        conn: &mut PgConnection,
        id: Uuid,
        partner_status: &str,
        raw_payload: Option<serde_json::Value>,
    ) -> Result<ProviderMapping, AppError> {
        let mapping = sqlx::query_as::<_, ProviderMapping>(
            r#"
            UPDATE provider_mappings
            SET partner_status = $2, raw_payload = COALESCE($3, raw_payload), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(partner_status)
        .bind(raw_payload)
        .fetch_one(conn)
        .await?;

        Ok(mapping)
    }
}
