//! Provider status sync worker
//!
//! Tarea periódica única que reconcilia el estado reportado por los partners
//! con el estado local de los viajes. Cada ciclo consulta los viajes en
//! curso con reserva externa, pide el estado al adapter, lo traduce con la
//! tabla de mapeo del provider y lo pliega en el viaje. Sin cambios no hay
//! escrituras (idempotente); en estado terminal del partner se libera al
//! conductor. El fallo de un viaje se loguea y no aborta el ciclo.

use chrono::Utc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::models::assignment::AssignmentStatus;
use crate::models::provider_mapping::ProviderMapping;
use crate::models::trip::{Trip, TripStatus};
use crate::repositories::assignment_repository::AssignmentRepository;
use crate::repositories::driver_repository::DriverRepository;
use crate::repositories::provider_mapping_repository::ProviderMappingRepository;
use crate::repositories::trip_repository::TripRepository;
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

/// Lanza el worker como única tarea de fondo del proceso. Los ticks no se
/// solapan: un ciclo largo retrasa al siguiente.
pub fn spawn(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let secs = state.config.sync_worker_interval_secs;
        let mut ticker = interval(Duration::from_secs(secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("🔄 Provider status sync worker started (interval: {}s)", secs);

        loop {
            ticker.tick().await;

            match run_cycle(&state).await {
                Ok(updated) => {
                    state
                        .metrics
                        .sync_cycles_total
                        .with_label_values(&["success"])
                        .inc();
                    if updated > 0 {
                        info!("🔄 Sync cycle folded {} partner update(s)", updated);
                    } else {
                        debug!("🔄 Sync cycle: nothing to fold");
                    }
                }
                Err(e) => {
                    state
                        .metrics
                        .sync_cycles_total
                        .with_label_values(&["error"])
                        .inc();
                    error!("❌ Sync cycle failed: {}", e);
                }
            }
        }
    })
}

/// Un ciclo completo; devuelve cuántos viajes se actualizaron.
pub async fn run_cycle(state: &AppState) -> AppResult<u32> {
    let candidates = {
        let mut conn = state.pool.acquire().await?;
        TripRepository::find_sync_candidates(&mut conn).await?
    };

    let mut updated = 0;
    for trip in candidates {
        match sync_trip(state, &trip).await {
            Ok(true) => {
                updated += 1;
                state.metrics.sync_trip_updates_total.inc();
            }
            Ok(false) => {}
            Err(e) => {
                warn!("⚠️ Sync failed for trip {}: {} - skipping", trip.id, e);
            }
        }
    }

    Ok(updated)
}

/// Sincroniza un viaje. La llamada al partner corre sin ninguna transacción
/// abierta; la aplicación del cambio se re-valida bajo lock.
async fn sync_trip(state: &AppState, trip: &Trip) -> AppResult<bool> {
    let mapping = {
        let mut conn = state.pool.acquire().await?;
        ProviderMappingRepository::find_by_trip(&mut conn, trip.id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("trip '{}' lost its provider mapping", trip.id))
            })?
    };

    let booking_id = match mapping.external_booking_id.clone() {
        Some(id) => id,
        None => return Ok(false),
    };

    let provider = trip
        .provider
        .ok_or_else(|| AppError::Internal(format!("trip '{}' has no provider", trip.id)))?;
    let adapter = state.providers.get(provider)?;

    let partner_reported = adapter.get_ride_status(&booking_id).await?;

    let mapped = match adapter.map_partner_status(&partner_reported) {
        Some(status) => status,
        None => {
            debug!(
                "🔄 Trip {}: partner status '{}' has no internal mapping, ignoring",
                trip.id, partner_reported
            );
            return Ok(false);
        }
    };

    // Idempotencia: mismo estado interno y mismo vocablo del partner, nada
    // que escribir.
    if mapped == trip.trip_status && mapping.partner_status == partner_reported {
        return Ok(false);
    }

    apply_partner_update(state, trip, &mapping, &partner_reported, mapped).await?;
    Ok(true)
}

async fn apply_partner_update(
    state: &AppState,
    trip: &Trip,
    mapping: &ProviderMapping,
    partner_reported: &str,
    mapped: TripStatus,
) -> AppResult<()> {
    let mut tx = state.pool.begin().await?;

    // Re-chequeo bajo lock: otro request pudo haber movido el viaje entre
    // la lectura del ciclo y ahora.
    let current = TripRepository::find_by_id_for_update(&mut tx, trip.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip.id)))?;

    if current.trip_status.is_terminal() {
        return Ok(());
    }

    if mapped != current.trip_status {
        match mapped {
            TripStatus::Completed => {
                TripRepository::mark_completed(&mut tx, trip.id).await?;
            }
            TripStatus::Cancelled => {
                TripRepository::mark_cancelled(
                    &mut tx,
                    trip.id,
                    Some("cancelled by supply partner".to_string()),
                )
                .await?;
            }
            TripStatus::NoShow => {
                TripRepository::mark_no_show(&mut tx, trip.id).await?;
            }
            TripStatus::Started => {
                TripRepository::mark_started(&mut tx, trip.id).await?;
            }
            TripStatus::DriverAssigned | TripStatus::Created => {
                TripRepository::set_status(&mut tx, trip.id, mapped).await?;
            }
        }
    }

    ProviderMappingRepository::update_partner_status(&mut tx, mapping.id, partner_reported, None)
        .await?;

    if mapped.is_terminal() {
        if let Some(open) = AssignmentRepository::find_open_by_trip(&mut tx, trip.id).await? {
            let close_as = match mapped {
                TripStatus::Completed => AssignmentStatus::Completed,
                _ => AssignmentStatus::Cancelled,
            };
            AssignmentRepository::close(&mut tx, open.id, close_as).await?;
            DriverRepository::set_availability(&mut tx, open.driver_id, true).await?;
        }
    }

    tx.commit().await?;

    info!(
        "🔄 Trip {} folded partner status '{}' → {:?} at {}",
        trip.id,
        partner_reported,
        mapped,
        Utc::now().to_rfc3339()
    );

    Ok(())
}
