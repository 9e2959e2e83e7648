//! Trip assignment service
//!
//! assign / unassign / reassign con exclusividad transaccional. Cada
//! operación corre en una única transacción contra el store; la fila del
//! viaje se bloquea primero (FOR UPDATE) para que dos llamadas concurrentes
//! sobre el mismo viaje o conductor se serialicen ahí, y los índices únicos
//! parciales del schema rechazan cualquier doble reclamo que se cuele.
//! Las llamadas al partner (prebook / confirmación) corren después del
//! commit y nunca revierten la asignación local.

use std::sync::Arc;

use sqlx::{Acquire, PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics::Metrics;
use crate::models::assignment::{Assignment, AssignmentStatus};
use crate::models::provider_mapping::partner_status;
use crate::models::trip::{Trip, TripStatus};
use crate::providers::{ConfirmPaymentInput, DispatchMode, PrebookInput, ProviderRegistry};
use crate::repositories::assignment_repository::AssignmentRepository;
use crate::repositories::driver_repository::DriverRepository;
use crate::repositories::provider_mapping_repository::ProviderMappingRepository;
use crate::repositories::trip_repository::TripRepository;
use crate::utils::errors::{AppError, AppResult};

pub struct AssignmentService {
    pool: PgPool,
    registry: Arc<ProviderRegistry>,
    metrics: Arc<Metrics>,
}

impl AssignmentService {
    pub fn new(pool: PgPool, registry: Arc<ProviderRegistry>, metrics: Arc<Metrics>) -> Self {
        Self {
            pool,
            registry,
            metrics,
        }
    }

    /// Asigna un conductor a un viaje. Tras el commit dispara la reserva con
    /// el partner como best-effort: un fallo de partner queda registrado en
    /// el assignment y libera al conductor, pero jamás revierte la operación
    /// local ni se propaga al caller.
    pub async fn assign(
        &self,
        trip_id: Uuid,
        driver_id: Uuid,
        vehicle_id: Option<Uuid>,
    ) -> AppResult<Assignment> {
        let mut tx = self.pool.begin().await?;

        let trip = TripRepository::find_by_id_for_update(&mut tx, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;

        let assignment = match assign_in_tx(&mut tx, &trip, driver_id, vehicle_id).await {
            Ok(assignment) => assignment,
            Err(e) => {
                self.metrics
                    .assignments_total
                    .with_label_values(&["rejected"])
                    .inc();
                return Err(e);
            }
        };

        tx.commit().await?;

        self.metrics
            .assignments_total
            .with_label_values(&["success"])
            .inc();
        info!("🧑‍✈️ Driver {} assigned to trip {}", driver_id, trip_id);

        let assignment = self.attempt_partner_booking(&trip, assignment).await;
        Ok(assignment)
    }

    /// Desasigna el conductor del viaje y lo devuelve a CREATED. Permitido
    /// también en vuelo (STARTED): el detach intencional es parte del flujo
    /// de operaciones.
    pub async fn unassign(&self, trip_id: Uuid) -> AppResult<Trip> {
        let mut tx = self.pool.begin().await?;

        let trip = TripRepository::find_by_id_for_update(&mut tx, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;

        let trip = unassign_in_tx(&mut tx, &trip).await?;
        tx.commit().await?;

        info!("↩️ Trip {} unassigned, back to CREATED", trip_id);
        Ok(trip)
    }

    /// Reasigna el viaje a otro conductor en una sola transacción. La mitad
    /// de desasignación queda persistida aunque la asignación nueva falle:
    /// el viaje termina sin conductor y en CREATED, nunca a medio atar.
    pub async fn reassign(
        &self,
        trip_id: Uuid,
        new_driver_id: Uuid,
        vehicle_id: Option<Uuid>,
    ) -> AppResult<Assignment> {
        let mut tx = self.pool.begin().await?;

        let trip = TripRepository::find_by_id_for_update(&mut tx, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;

        let trip = unassign_in_tx(&mut tx, &trip).await?;

        // Savepoint: si el assign falla se revierte solo esta mitad y el
        // unassign previo se commitea igual.
        let assign_result = {
            let mut sp = tx.begin().await?;
            match assign_in_tx(&mut sp, &trip, new_driver_id, vehicle_id).await {
                Ok(assignment) => {
                    sp.commit().await?;
                    Ok(assignment)
                }
                Err(e) => {
                    sp.rollback().await?;
                    Err(e)
                }
            }
        };

        tx.commit().await?;

        match assign_result {
            Ok(assignment) => {
                self.metrics
                    .assignments_total
                    .with_label_values(&["success"])
                    .inc();
                info!("🔁 Trip {} reassigned to driver {}", trip_id, new_driver_id);
                Ok(self.attempt_partner_booking(&trip, assignment).await)
            }
            Err(e) => {
                self.metrics
                    .assignments_total
                    .with_label_values(&["rejected"])
                    .inc();
                warn!(
                    "🔁 Reassign of trip {} failed at assign step, trip left unassigned: {}",
                    trip_id, e
                );
                Err(e)
            }
        }
    }

    /// Reserva con el partner después del commit local. Si falla, registra
    /// la razón en el assignment, libera al conductor y devuelve el viaje a
    /// CREATED para que siga siendo despachable; el assignment persiste como
    /// registro del intento.
    async fn attempt_partner_booking(&self, trip: &Trip, assignment: Assignment) -> Assignment {
        let outcome = self.partner_booking(trip, &assignment).await;

        match outcome {
            Ok(true) => {
                let mut conn = match self.pool.acquire().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("⚠️ Could not record booking attempt: {}", e);
                        return assignment;
                    }
                };
                AssignmentRepository::record_booking_attempt(&mut conn, assignment.id, None)
                    .await
                    .unwrap_or(assignment)
            }
            Ok(false) => assignment,
            Err(e) => {
                warn!(
                    "⚠️ Partner booking failed for trip {}: {} - releasing driver",
                    trip.id, e
                );
                self.metrics
                    .assignments_total
                    .with_label_values(&["booking_failed"])
                    .inc();
                match self
                    .record_booking_failure(trip, &assignment, e.to_string())
                    .await
                {
                    Ok(updated) => updated,
                    Err(record_err) => {
                        warn!(
                            "⚠️ Could not record booking failure for assignment {}: {}",
                            assignment.id, record_err
                        );
                        assignment
                    }
                }
            }
        }
    }

    /// Devuelve Ok(true) si hubo interacción con el partner, Ok(false) si el
    /// provider despacha manualmente.
    async fn partner_booking(&self, trip: &Trip, _assignment: &Assignment) -> AppResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let mapping = match ProviderMappingRepository::find_by_trip(&mut conn, trip.id).await? {
            Some(mapping) => mapping,
            None => return Ok(false),
        };
        drop(conn);

        let adapter = self.registry.get(mapping.provider)?;
        if adapter.dispatch_mode() == DispatchMode::Manual {
            return Ok(false);
        }

        match &mapping.external_booking_id {
            // La pre-reserva del orchestrator falló o quedó diferida:
            // reintentamos ahora que hay conductor comprometido.
            None => {
                let outcome = adapter
                    .prebook(&PrebookInput {
                        trip_id: trip.id,
                        trip_type: trip.trip_type,
                        origin_city: trip.origin_city.clone(),
                        destination_city: trip.destination_city.clone(),
                        pickup_location: trip.pickup_location.clone(),
                        pickup: trip.pickup_point(),
                        drop: trip.drop_point(),
                        pickup_time: trip.pickup_time,
                        distance_km: trip.distance_km,
                        vehicle_class: trip.vehicle_class,
                        price: trip.price,
                    })
                    .await?;

                let mut conn = self.pool.acquire().await?;
                ProviderMappingRepository::supersede_booking(
                    &mut conn,
                    trip.id,
                    outcome.provider,
                    Some(outcome.external_booking_id),
                    partner_status::PREBOOKED,
                    Some(outcome.raw_payload),
                )
                .await?;
                Ok(true)
            }
            Some(booking_id) => {
                adapter
                    .confirm_payment(&ConfirmPaymentInput {
                        external_booking_id: booking_id.clone(),
                        amount: trip.price,
                    })
                    .await?;

                let mut conn = self.pool.acquire().await?;
                ProviderMappingRepository::update_partner_status(
                    &mut conn,
                    mapping.id,
                    partner_status::CONFIRMED,
                    None,
                )
                .await?;
                Ok(true)
            }
        }
    }

    async fn record_booking_failure(
        &self,
        trip: &Trip,
        assignment: &Assignment,
        reason: String,
    ) -> AppResult<Assignment> {
        let mut tx = self.pool.begin().await?;

        // Re-chequeo bajo lock: otro request pudo mover el viaje entre el
        // commit del assign y este follow-up.
        let current = TripRepository::find_by_id_for_update(&mut tx, trip.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip.id)))?;

        let updated =
            AssignmentRepository::record_booking_attempt(&mut tx, assignment.id, Some(reason))
                .await?;
        let updated =
            AssignmentRepository::close(&mut tx, updated.id, AssignmentStatus::Unassigned).await?;
        DriverRepository::set_availability(&mut tx, assignment.driver_id, true).await?;
        if current.trip_status == TripStatus::DriverAssigned {
            TripRepository::set_status(&mut tx, trip.id, TripStatus::Created).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }
}

/// Mitad de asignación, dentro de la transacción del caller. Valida
/// exclusividad de viaje y de conductor, crea el assignment, marca al
/// conductor no disponible y pasa el viaje a DRIVER_ASSIGNED.
async fn assign_in_tx(
    conn: &mut PgConnection,
    trip: &Trip,
    driver_id: Uuid,
    vehicle_id: Option<Uuid>,
) -> AppResult<Assignment> {
    if trip.trip_status.is_terminal() {
        return Err(AppError::BadRequest(format!(
            "cannot assign a driver to a trip in status {:?}",
            trip.trip_status
        )));
    }

    if AssignmentRepository::find_open_by_trip(conn, trip.id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "trip already has an active assignment".to_string(),
        ));
    }

    let driver = DriverRepository::find_by_id_for_update(conn, driver_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("driver '{}' not found", driver_id)))?;

    if !driver.is_active() {
        return Err(AppError::BadRequest(format!(
            "driver '{}' is not operational (status: {})",
            driver_id, driver.driver_status
        )));
    }

    if !driver.is_available
        || AssignmentRepository::find_open_by_driver(conn, driver_id)
            .await?
            .is_some()
    {
        return Err(AppError::Conflict(
            "driver already has an active assignment".to_string(),
        ));
    }

    let assignment = AssignmentRepository::insert(conn, trip.id, driver_id, vehicle_id).await?;
    DriverRepository::set_availability(conn, driver_id, false).await?;
    TripRepository::set_status(conn, trip.id, TripStatus::DriverAssigned).await?;

    Ok(assignment)
}

/// Mitad de desasignación, dentro de la transacción del caller. Cierra el
/// assignment abierto, restaura la disponibilidad del conductor y devuelve
/// el viaje a CREATED. Si no hay assignment abierto pero el viaje dice
/// DRIVER_ASSIGNED, repara el estado igualmente.
async fn unassign_in_tx(conn: &mut PgConnection, trip: &Trip) -> AppResult<Trip> {
    if !matches!(
        trip.trip_status,
        TripStatus::Created | TripStatus::DriverAssigned | TripStatus::Started
    ) {
        return Err(AppError::BadRequest(format!(
            "cannot unassign a trip in status {:?}",
            trip.trip_status
        )));
    }

    match AssignmentRepository::find_open_by_trip(conn, trip.id).await? {
        Some(open) => {
            AssignmentRepository::close(conn, open.id, AssignmentStatus::Unassigned).await?;
            DriverRepository::set_availability(conn, open.driver_id, true).await?;
            let trip = TripRepository::set_status(conn, trip.id, TripStatus::Created).await?;
            Ok(trip)
        }
        None if trip.trip_status == TripStatus::DriverAssigned => {
            warn!(
                "🩹 Trip {} says DRIVER_ASSIGNED but has no open assignment - repairing",
                trip.id
            );
            let trip = TripRepository::set_status(conn, trip.id, TripStatus::Created).await?;
            Ok(trip)
        }
        None => Err(AppError::BadRequest(
            "trip has no active assignment".to_string(),
        )),
    }
}
