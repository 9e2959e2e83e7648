use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::trip::{ProviderType, Trip, TripStatus};
use crate::utils::errors::AppError;

// Campos nuevos de un viaje; price y billable_km quedan fijados aquí
// y ninguna transición posterior los recalcula.
pub struct NewTrip {
    pub id: Uuid,
    pub trip_type: crate::models::trip::TripType,
    pub origin_city: String,
    pub destination_city: String,
    pub pickup_location: String,
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub drop_lat: Option<f64>,
    pub drop_lng: Option<f64>,
    pub pickup_time: DateTime<Utc>,
    pub booking_time: DateTime<Utc>,
    pub distance_km: f64,
    pub billable_km: i32,
    pub rate_per_km: rust_decimal::Decimal,
    pub price: rust_decimal::Decimal,
    pub vehicle_class: crate::models::trip::VehicleClass,
    pub is_prebooked: bool,
    pub provider: Option<ProviderType>,
}

pub struct TripRepository;

impl TripRepository {
    pub async fn insert(conn: &mut PgConnection, new_trip: NewTrip) -> Result<Trip, AppError> {
        let trip = sqlx::query_as::<_, Trip>(
            r#"
            INSERT INTO trips (
                id, trip_type, origin_city, destination_city, pickup_location,
                pickup_lat, pickup_lng, drop_lat, drop_lng,
                pickup_time, booking_time, distance_km, billable_km,
                rate_per_km, price, vehicle_class, trip_status, is_prebooked, provider
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, 'created', $17, $18)
            RETURNING *
            "#,
        )
        .bind(new_trip.id)
        .bind(new_trip.trip_type)
        .bind(new_trip.origin_city)
        .bind(new_trip.destination_city)
        .bind(new_trip.pickup_location)
        .bind(new_trip.pickup_lat)
        .bind(new_trip.pickup_lng)
        .bind(new_trip.drop_lat)
        .bind(new_trip.drop_lng)
        .bind(new_trip.pickup_time)
        .bind(new_trip.booking_time)
        .bind(new_trip.distance_km)
        .bind(new_trip.billable_km)
        .bind(new_trip.rate_per_km)
        .bind(new_trip.price)
        .bind(new_trip.vehicle_class)
        .bind(new_trip.is_prebooked)
        .bind(new_trip.provider)
        .fetch_one(conn)
        .await?;

        Ok(trip)
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Trip>, AppError> {
        let trip = sqlx::query_as::<_, Trip>("SELECT * FROM trips WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(trip)
    }

    /// Bloquea la fila del viaje por lo que dura la transacción; los assign
    /// concurrentes sobre el mismo viaje se serializan aquí.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Trip>, AppError> {
        let trip = sqlx::query_as::<_, Trip>("SELECT * FROM trips WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(trip)
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: TripStatus,
    ) -> Result<Trip, AppError> {
        let trip = sqlx::query_as::<_, Trip>(
            "UPDATE trips SET trip_status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(conn)
        .await?;

        Ok(trip)
    }

    pub async fn mark_started(conn: &mut PgConnection, id: Uuid) -> Result<Trip, AppError> {
        let trip = sqlx::query_as::<_, Trip>(
            r#"
            UPDATE trips
            SET trip_status = 'started', started_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(conn)
        .await?;

        Ok(trip)
    }

    pub async fn mark_arrived(conn: &mut PgConnection, id: Uuid) -> Result<Trip, AppError> {
        let trip = sqlx::query_as::<_, Trip>(
            "UPDATE trips SET arrived_at = now(), updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(conn)
        .await?;

        Ok(trip)
    }

    pub async fn mark_onboarded(conn: &mut PgConnection, id: Uuid) -> Result<Trip, AppError> {
        let trip = sqlx::query_as::<_, Trip>(
            "UPDATE trips SET onboarded_at = now(), updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(conn)
        .await?;

        Ok(trip)
    }

    pub async fn mark_completed(conn: &mut PgConnection, id: Uuid) -> Result<Trip, AppError> {
        let trip = sqlx::query_as::<_, Trip>(
            r#"
            UPDATE trips
            SET trip_status = 'completed', completed_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(conn)
        .await?;

        Ok(trip)
    }

    pub async fn mark_no_show(conn: &mut PgConnection, id: Uuid) -> Result<Trip, AppError> {
        let trip = sqlx::query_as::<_, Trip>(
            r#"
            UPDATE trips
            SET trip_status = 'no_show', updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(conn)
        .await?;

        Ok(trip)
    }

    pub async fn mark_cancelled(
        conn: &mut PgConnection,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<Trip, AppError> {
        let trip = sqlx::query_as::<_, Trip>(
            r#"
            UPDATE trips
            SET trip_status = 'cancelled', cancelled_at = now(),
                cancellation_reason = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .fetch_one(conn)
        .await?;

        Ok(trip)
    }

    /// Reprogramación inbound: solo cambia la hora de recogida, nunca el precio
    pub async fn set_pickup_time(
        conn: &mut PgConnection,
        id: Uuid,
        pickup_time: DateTime<Utc>,
    ) -> Result<Trip, AppError> {
        let trip = sqlx::query_as::<_, Trip>(
            "UPDATE trips SET pickup_time = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(pickup_time)
        .fetch_one(conn)
        .await?;

        Ok(trip)
    }

    pub async fn list_paginated(
        conn: &mut PgConnection,
        status: Option<TripStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Trip>, AppError> {
        let trips = sqlx::query_as::<_, Trip>(
            r#"
            SELECT * FROM trips
            WHERE ($1::trip_status IS NULL OR trip_status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await?;

        Ok(trips)
    }

    pub async fn count(
        conn: &mut PgConnection,
        status: Option<TripStatus>,
    ) -> Result<i64, AppError> {
        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM trips WHERE ($1::trip_status IS NULL OR trip_status = $1)",
        )
        .bind(status)
        .fetch_one(conn)
        .await?;

        Ok(result.0)
    }

    /// Candidatos del worker de sincronización: viajes en curso con provider
    /// asignado. El booking id externo se resuelve contra el mapping.
    pub async fn find_sync_candidates(conn: &mut PgConnection) -> Result<Vec<Trip>, AppError> {
        let trips = sqlx::query_as::<_, Trip>(
            r#"
            SELECT t.* FROM trips t
            JOIN provider_mappings pm ON pm.trip_id = t.id
            WHERE t.trip_status IN ('driver_assigned', 'started')
              AND t.provider IS NOT NULL
              AND pm.external_booking_id IS NOT NULL
            ORDER BY t.created_at
            "#,
        )
        .fetch_all(conn)
        .await?;

        Ok(trips)
    }
}
