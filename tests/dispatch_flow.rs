//! Tests de integración del flujo de despacho contra PostgreSQL.
//!
//! Requieren una base accesible vía DATABASE_URL; corren con
//! `cargo test -- --ignored`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use trip_dispatch::config::environment::EnvironmentConfig;
use trip_dispatch::metrics::Metrics;
use trip_dispatch::models::assignment::AssignmentStatus;
use trip_dispatch::models::provider_mapping::partner_status;
use trip_dispatch::models::trip::{ProviderType, TripStatus, TripType, VehicleClass};
use trip_dispatch::providers::{
    ConfirmPaymentInput, DispatchMode, FareOption, FareSearchInput, PrebookInput, PrebookOutcome,
    ProviderRegistry, SupplyProvider, TrackingInfo, TrackingInput,
};
use trip_dispatch::repositories::assignment_repository::AssignmentRepository;
use trip_dispatch::repositories::driver_repository::DriverRepository;
use trip_dispatch::repositories::provider_mapping_repository::ProviderMappingRepository;
use trip_dispatch::repositories::trip_repository::{NewTrip, TripRepository};
use trip_dispatch::services::assignment_service::AssignmentService;
use trip_dispatch::services::sync_worker;
use trip_dispatch::state::AppState;
use trip_dispatch::utils::errors::{AppError, AppResult};

fn test_config() -> EnvironmentConfig {
    EnvironmentConfig {
        environment: "test".to_string(),
        port: 0,
        host: "127.0.0.1".to_string(),
        cors_origins: vec![],
        allowed_origin_cities: vec!["DELHI".to_string()],
        ev_intercity_max_km: 300.0,
        min_billable_km: 5,
        rate_per_km: Decimal::new(25, 0),
        trip_type_mult_airport: Decimal::new(10, 1),
        trip_type_mult_rental: Decimal::new(12, 1),
        trip_type_mult_inter_city: Decimal::new(115, 2),
        advance_booking_mult: Decimal::new(95, 2),
        standard_booking_mult: Decimal::new(10, 1),
        vehicle_ev_mult: Decimal::new(10, 1),
        vehicle_non_ev_mult: Decimal::new(11, 1),
        advance_booking_hours: 24,
        geofence_radius_m: 500.0,
        start_window_mins: 150,
        arrive_window_mins: 30,
        no_show_wait_mins: 30,
        sync_worker_enabled: false,
        sync_worker_interval_secs: 120,
        quickcabs_base_url: "http://quickcabs.test".to_string(),
        quickcabs_client_id: "qc".to_string(),
        quickcabs_client_secret: "qc".to_string(),
        quickcabs_inbound_user: "quickcabs".to_string(),
        quickcabs_inbound_password: "secret".to_string(),
        citydrive_base_url: "http://citydrive.test".to_string(),
        citydrive_api_key: "cd".to_string(),
        partner_auth_max_attempts: 3,
        partner_auth_backoff_ms: 1,
    }
}

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for these tests");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

async fn seed_driver(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO drivers (id, full_name, fleet_id, is_available, driver_status)
         VALUES ($1, $2, $3, TRUE, 'active')",
    )
    .bind(id)
    .bind(format!("Test Driver {}", &id.to_string()[..8]))
    .bind(Uuid::new_v4())
    .execute(pool)
    .await
    .expect("seed driver");
    id
}

async fn seed_trip(pool: &PgPool, provider: Option<ProviderType>) -> Uuid {
    let mut conn = pool.acquire().await.expect("acquire");
    let pickup = Utc::now() + Duration::hours(2);
    let trip = TripRepository::insert(
        &mut conn,
        NewTrip {
            id: Uuid::new_v4(),
            trip_type: TripType::Airport,
            origin_city: "DELHI".to_string(),
            destination_city: "DELHI".to_string(),
            pickup_location: "IGI Terminal 3".to_string(),
            pickup_lat: Some(28.5562),
            pickup_lng: Some(77.1000),
            drop_lat: Some(28.6315),
            drop_lng: Some(77.2167),
            pickup_time: pickup,
            booking_time: Utc::now(),
            distance_km: 30.0,
            billable_km: 30,
            rate_per_km: Decimal::new(25, 0),
            price: Decimal::new(784, 0),
            vehicle_class: VehicleClass::Sedan,
            is_prebooked: true,
            provider,
        },
    )
    .await
    .expect("seed trip");
    trip.id
}

fn service(pool: &PgPool) -> AssignmentService {
    AssignmentService::new(
        pool.clone(),
        Arc::new(ProviderRegistry::new()),
        Arc::new(Metrics::new()),
    )
}

async fn driver_available(pool: &PgPool, driver_id: Uuid) -> bool {
    let mut conn = pool.acquire().await.expect("acquire");
    DriverRepository::find_by_id(&mut conn, driver_id)
        .await
        .expect("find driver")
        .expect("driver exists")
        .is_available
}

async fn trip_status(pool: &PgPool, trip_id: Uuid) -> TripStatus {
    let mut conn = pool.acquire().await.expect("acquire");
    TripRepository::find_by_id(&mut conn, trip_id)
        .await
        .expect("find trip")
        .expect("trip exists")
        .trip_status
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn assign_then_unassign_restores_the_pre_assign_state() {
    let pool = test_pool().await;
    let driver = seed_driver(&pool).await;
    let trip = seed_trip(&pool, None).await;
    let service = service(&pool);

    let assignment = service.assign(trip, driver, None).await.expect("assign");
    assert_eq!(assignment.assignment_status, AssignmentStatus::Assigned);
    assert_eq!(trip_status(&pool, trip).await, TripStatus::DriverAssigned);
    assert!(!driver_available(&pool, driver).await);

    let reverted = service.unassign(trip).await.expect("unassign");
    assert_eq!(reverted.trip_status, TripStatus::Created);
    assert!(driver_available(&pool, driver).await);

    let mut conn = pool.acquire().await.expect("acquire");
    assert!(AssignmentRepository::find_open_by_trip(&mut conn, trip)
        .await
        .expect("query")
        .is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn a_driver_cannot_hold_two_open_assignments() {
    let pool = test_pool().await;
    let driver = seed_driver(&pool).await;
    let trip_a = seed_trip(&pool, None).await;
    let trip_b = seed_trip(&pool, None).await;
    let service = service(&pool);

    service.assign(trip_a, driver, None).await.expect("first assign");

    let second = service.assign(trip_b, driver, None).await;
    match second {
        Err(AppError::Conflict(reason)) => {
            assert!(reason.contains("driver already has an active assignment"));
        }
        other => panic!("expected driver-scoped conflict, got {:?}", other.map(|a| a.id)),
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn a_trip_cannot_receive_a_second_driver() {
    let pool = test_pool().await;
    let driver_a = seed_driver(&pool).await;
    let driver_b = seed_driver(&pool).await;
    let trip = seed_trip(&pool, None).await;
    let service = service(&pool);

    service.assign(trip, driver_a, None).await.expect("first assign");

    match service.assign(trip, driver_b, None).await {
        Err(AppError::Conflict(reason)) => {
            assert!(reason.contains("trip already has an active assignment"));
        }
        other => panic!("expected trip-scoped conflict, got {:?}", other.map(|a| a.id)),
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn concurrent_assigns_on_one_trip_let_exactly_one_win() {
    let pool = test_pool().await;
    let driver_a = seed_driver(&pool).await;
    let driver_b = seed_driver(&pool).await;
    let trip = seed_trip(&pool, None).await;

    let service_a = service(&pool);
    let service_b = service(&pool);

    let (first, second) = tokio::join!(
        service_a.assign(trip, driver_a, None),
        service_b.assign(trip, driver_b, None),
    );

    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1, "exactly one concurrent assign must win");

    let mut conn = pool.acquire().await.expect("acquire");
    let open = AssignmentRepository::find_open_by_trip(&mut conn, trip)
        .await
        .expect("query");
    assert!(open.is_some(), "the winner's assignment must be open");
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn failed_reassign_leaves_the_trip_unassigned_in_created() {
    let pool = test_pool().await;
    let driver = seed_driver(&pool).await;
    let trip = seed_trip(&pool, None).await;
    let service = service(&pool);

    service.assign(trip, driver, None).await.expect("assign");

    // El conductor destino no existe: la mitad de assign falla
    let ghost_driver = Uuid::new_v4();
    let result = service.reassign(trip, ghost_driver, None).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    // El viaje no queda a medio atar: sin assignment abierto, en CREATED,
    // y el conductor original liberado
    assert_eq!(trip_status(&pool, trip).await, TripStatus::Created);
    assert!(driver_available(&pool, driver).await);

    let mut conn = pool.acquire().await.expect("acquire");
    assert!(AssignmentRepository::find_open_by_trip(&mut conn, trip)
        .await
        .expect("query")
        .is_none());
}

/// Adapter de QuickCabs simulado que reporta siempre el mismo estado
struct StaticStatusProvider {
    reported: &'static str,
}

#[async_trait]
impl SupplyProvider for StaticStatusProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::QuickCabs
    }

    fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::Immediate
    }

    fn status_map(&self) -> &'static [(&'static str, TripStatus)] {
        &[
            ("TRIP_STARTED", TripStatus::Started),
            ("COMPLETED", TripStatus::Completed),
            ("CANCELLED", TripStatus::Cancelled),
        ]
    }

    async fn search_fare(&self, _input: &FareSearchInput) -> AppResult<Vec<FareOption>> {
        Ok(vec![])
    }

    async fn prebook(&self, _input: &PrebookInput) -> AppResult<PrebookOutcome> {
        Err(AppError::PartnerApi("not used in this test".to_string()))
    }

    async fn confirm_payment(&self, _input: &ConfirmPaymentInput) -> AppResult<()> {
        Ok(())
    }

    async fn cancel_booking(&self, _external_booking_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn get_booking_details(&self, _external_booking_id: &str) -> AppResult<serde_json::Value> {
        Ok(serde_json::json!({}))
    }

    async fn track_ride(&self, _input: &TrackingInput) -> AppResult<TrackingInfo> {
        Err(AppError::PartnerApi("not used in this test".to_string()))
    }

    async fn get_ride_status(&self, _external_booking_id: &str) -> AppResult<String> {
        Ok(self.reported.to_string())
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn sync_worker_folds_partner_completion_and_releases_the_driver() {
    let pool = test_pool().await;
    let driver = seed_driver(&pool).await;
    let trip = seed_trip(&pool, Some(ProviderType::QuickCabs)).await;

    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(StaticStatusProvider {
        reported: "COMPLETED",
    }));

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(test_config()),
        providers: Arc::new(registry),
        metrics: Arc::new(Metrics::new()),
    };

    // Viaje en curso con reserva externa abierta
    let service = service(&pool);
    service.assign(trip, driver, None).await.expect("assign");
    {
        let mut conn = pool.acquire().await.expect("acquire");
        ProviderMappingRepository::insert(
            &mut conn,
            trip,
            ProviderType::QuickCabs,
            Some(format!("QC-{}", &trip.to_string()[..8])),
            partner_status::PREBOOKED,
            None,
        )
        .await
        .expect("seed mapping");
        TripRepository::mark_started(&mut conn, trip).await.expect("start");
    }

    let updated = sync_worker::run_cycle(&state).await.expect("cycle");
    assert_eq!(updated, 1);
    assert_eq!(trip_status(&pool, trip).await, TripStatus::Completed);
    assert!(driver_available(&pool, driver).await);

    // Idempotencia: el segundo ciclo no escribe nada (el viaje terminal ya
    // ni siquiera es candidato)
    let again = sync_worker::run_cycle(&state).await.expect("cycle");
    assert_eq!(again, 0);
}
