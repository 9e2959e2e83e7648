//! Trip lifecycle service
//!
//! Transiciones start / arrive / onboard / no-show / complete / cancel con
//! guardas de ventana horaria y geocerca. Los estados terminales son
//! finales. La notificación de cancelación al partner es una tarea
//! best-effort despachada después del commit local: su fallo nunca hace
//! fallar la cancelación.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::environment::EnvironmentConfig;
use crate::models::assignment::AssignmentStatus;
use crate::models::trip::{GeoPoint, Trip, TripStatus};
use crate::providers::ProviderRegistry;
use crate::repositories::assignment_repository::AssignmentRepository;
use crate::repositories::driver_repository::DriverRepository;
use crate::repositories::provider_mapping_repository::ProviderMappingRepository;
use crate::repositories::trip_repository::TripRepository;
use crate::utils::errors::{AppError, AppResult};

pub struct LifecycleService {
    pool: PgPool,
    registry: Arc<ProviderRegistry>,
    config: Arc<EnvironmentConfig>,
}

impl LifecycleService {
    pub fn new(pool: PgPool, registry: Arc<ProviderRegistry>, config: Arc<EnvironmentConfig>) -> Self {
        Self {
            pool,
            registry,
            config,
        }
    }

    /// Solo el conductor asignado puede iniciar, y solo dentro de la ventana
    /// configurada antes de la recogida programada.
    pub async fn start(&self, trip_id: Uuid, driver_id: Uuid) -> AppResult<Trip> {
        let mut tx = self.pool.begin().await?;

        let trip = TripRepository::find_by_id_for_update(&mut tx, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;

        if trip.trip_status != TripStatus::DriverAssigned {
            return Err(AppError::BadRequest(format!(
                "trip cannot be started from status {:?}",
                trip.trip_status
            )));
        }

        let assignment = AssignmentRepository::find_open_by_trip(&mut tx, trip_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("trip has no active assignment".to_string()))?;

        if assignment.driver_id != driver_id {
            return Err(AppError::Forbidden(
                "only the assigned driver can start this trip".to_string(),
            ));
        }

        let now = Utc::now();
        let window_opens = trip.pickup_time - Duration::minutes(self.config.start_window_mins);
        if now < window_opens {
            let minutes_left = (window_opens - now).num_minutes() + 1;
            return Err(AppError::BadRequest(format!(
                "too early to start: the start window opens in {} minutes",
                minutes_left
            )));
        }

        let trip = TripRepository::mark_started(&mut tx, trip_id).await?;
        AssignmentRepository::set_status(&mut tx, assignment.id, AssignmentStatus::Active).await?;
        tx.commit().await?;

        info!("🟢 Trip {} started by driver {}", trip_id, driver_id);
        Ok(trip)
    }

    /// Marca la llegada al punto de recogida. Exige viaje STARTED, ventana
    /// de llegada abierta y, si el viaje tiene coordenadas de recogida, que
    /// la ubicación reportada caiga dentro de la geocerca.
    pub async fn arrive(&self, trip_id: Uuid, reported: GeoPoint) -> AppResult<Trip> {
        let mut conn = self.pool.acquire().await?;

        let trip = TripRepository::find_by_id(&mut conn, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;

        if trip.trip_status != TripStatus::Started {
            return Err(AppError::BadRequest(format!(
                "arrival can only be marked on a started trip (status: {:?})",
                trip.trip_status
            )));
        }

        let now = Utc::now();
        let window_opens = trip.pickup_time - Duration::minutes(self.config.arrive_window_mins);
        if now < window_opens {
            return Err(AppError::BadRequest(format!(
                "arrival can only be marked within {} minutes of the scheduled pickup",
                self.config.arrive_window_mins
            )));
        }

        if let Some(pickup) = trip.pickup_point() {
            let distance_m = haversine_distance_m(pickup, reported);
            if distance_m > self.config.geofence_radius_m {
                return Err(AppError::BadRequest(format!(
                    "reported location is {:.0} m away from the pickup point (allowed: {:.0} m)",
                    distance_m, self.config.geofence_radius_m
                )));
            }
        }

        let trip = TripRepository::mark_arrived(&mut conn, trip_id).await?;
        info!("📍 Driver arrived at pickup for trip {}", trip_id);
        Ok(trip)
    }

    /// Registra la subida del pasajero; exige llegada previa.
    pub async fn onboard(&self, trip_id: Uuid) -> AppResult<Trip> {
        let mut conn = self.pool.acquire().await?;

        let trip = TripRepository::find_by_id(&mut conn, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;

        if trip.trip_status != TripStatus::Started {
            return Err(AppError::BadRequest(format!(
                "onboarding can only be marked on a started trip (status: {:?})",
                trip.trip_status
            )));
        }
        if trip.arrived_at.is_none() {
            return Err(AppError::BadRequest(
                "driver has not marked arrival at the pickup point yet".to_string(),
            ));
        }

        let trip = TripRepository::mark_onboarded(&mut conn, trip_id).await?;
        info!("🧳 Customer onboarded for trip {}", trip_id);
        Ok(trip)
    }

    /// No-show del pasajero: solo pasada la espera configurada desde la hora
    /// de recogida. Terminal; libera al conductor.
    pub async fn no_show(&self, trip_id: Uuid) -> AppResult<Trip> {
        let mut tx = self.pool.begin().await?;

        let trip = TripRepository::find_by_id_for_update(&mut tx, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;

        if trip.trip_status != TripStatus::Started {
            return Err(AppError::BadRequest(format!(
                "no-show can only be reported on a started trip (status: {:?})",
                trip.trip_status
            )));
        }

        let now = Utc::now();
        let earliest = trip.pickup_time + Duration::minutes(self.config.no_show_wait_mins);
        if now < earliest {
            let minutes_left = (earliest - now).num_minutes() + 1;
            return Err(AppError::BadRequest(format!(
                "no-show can be reported {} minutes after the scheduled pickup (wait {} more minutes)",
                self.config.no_show_wait_mins, minutes_left
            )));
        }

        let trip = TripRepository::mark_no_show(&mut tx, trip_id).await?;
        release_driver_in_tx(&mut tx, trip_id, AssignmentStatus::Cancelled).await?;
        tx.commit().await?;

        info!("🚫 Trip {} closed as NO_SHOW", trip_id);
        Ok(trip)
    }

    /// Completa el viaje; solo el conductor asignado. Terminal; libera al
    /// conductor.
    pub async fn complete(&self, trip_id: Uuid, driver_id: Uuid) -> AppResult<Trip> {
        let mut tx = self.pool.begin().await?;

        let trip = TripRepository::find_by_id_for_update(&mut tx, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;

        if trip.trip_status != TripStatus::Started {
            return Err(AppError::BadRequest(format!(
                "trip cannot be completed from status {:?}",
                trip.trip_status
            )));
        }

        let assignment = AssignmentRepository::find_open_by_trip(&mut tx, trip_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("trip has no active assignment".to_string()))?;

        if assignment.driver_id != driver_id {
            return Err(AppError::Forbidden(
                "only the assigned driver can complete this trip".to_string(),
            ));
        }

        let trip = TripRepository::mark_completed(&mut tx, trip_id).await?;
        AssignmentRepository::close(&mut tx, assignment.id, AssignmentStatus::Completed).await?;
        DriverRepository::set_availability(&mut tx, assignment.driver_id, true).await?;
        tx.commit().await?;

        info!("🏁 Trip {} completed by driver {}", trip_id, driver_id);
        Ok(trip)
    }

    /// Cancela desde cualquier estado no terminal; libera al conductor si lo
    /// había. La cancelación con el partner se despacha como tarea suelta
    /// después del commit y solo se loguea.
    pub async fn cancel(
        &self,
        trip_id: Uuid,
        reason: Option<String>,
        notify_partner: bool,
    ) -> AppResult<Trip> {
        let mut tx = self.pool.begin().await?;

        let trip = TripRepository::find_by_id_for_update(&mut tx, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;

        if trip.trip_status.is_terminal() {
            return Err(AppError::BadRequest(format!(
                "trip is already in terminal status {:?}",
                trip.trip_status
            )));
        }

        let trip = TripRepository::mark_cancelled(&mut tx, trip_id, reason).await?;
        release_driver_in_tx(&mut tx, trip_id, AssignmentStatus::Cancelled).await?;

        let mapping = ProviderMappingRepository::find_by_trip(&mut tx, trip_id).await?;
        tx.commit().await?;

        info!("🛑 Trip {} cancelled", trip_id);

        if notify_partner {
            if let Some(mapping) = mapping {
                if let Some(booking_id) = mapping.external_booking_id {
                    let registry = Arc::clone(&self.registry);
                    let provider = mapping.provider;
                    tokio::spawn(async move {
                        match registry.get(provider) {
                            Ok(adapter) => {
                                if let Err(e) = adapter.cancel_booking(&booking_id).await {
                                    warn!(
                                        "⚠️ Best-effort partner cancellation failed for booking {}: {}",
                                        booking_id, e
                                    );
                                } else {
                                    info!("🤝 Partner booking {} cancelled", booking_id);
                                }
                            }
                            Err(e) => warn!("⚠️ {}", e),
                        }
                    });
                }
            }
        }

        Ok(trip)
    }
}

/// Cierra el assignment abierto del viaje (si existe) y libera al conductor.
async fn release_driver_in_tx(
    conn: &mut sqlx::PgConnection,
    trip_id: Uuid,
    close_as: AssignmentStatus,
) -> AppResult<()> {
    if let Some(open) = AssignmentRepository::find_open_by_trip(conn, trip_id).await? {
        AssignmentRepository::close(conn, open.id, close_as).await?;
        DriverRepository::set_availability(conn, open.driver_id, true).await?;
    }
    Ok(())
}

/// Distancia haversine en metros entre dos coordenadas
fn haversine_distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_distance_of_a_point_to_itself_is_zero() {
        let p = GeoPoint {
            lat: 28.6139,
            lng: 77.2090,
        };
        assert!(haversine_distance_m(p, p) < f64::EPSILON);
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Connaught Place → Indira Gandhi International, ~13 km
        let cp = GeoPoint {
            lat: 28.6315,
            lng: 77.2167,
        };
        let igi = GeoPoint {
            lat: 28.5562,
            lng: 77.1000,
        };
        let d = haversine_distance_m(cp, igi);
        assert!((13_000.0..15_500.0).contains(&d), "distance was {}", d);
    }

    #[test]
    fn nearby_points_fall_inside_a_500m_geofence() {
        let pickup = GeoPoint {
            lat: 28.6139,
            lng: 77.2090,
        };
        let reported = GeoPoint {
            lat: 28.6142,
            lng: 77.2094,
        };
        assert!(haversine_distance_m(pickup, reported) < 500.0);
    }
}
