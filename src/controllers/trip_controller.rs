//! Controller de viajes: creación, detalle, tracking y ciclo de vida

use uuid::Uuid;
use validator::Validate;

use crate::dto::common::ApiResponse;
use crate::dto::trip_dto::{
    ArriveTripRequest, CancelTripRequest, CompleteTripRequest, CreateTripRequest,
    CreateTripResponse, StartTripRequest, TrackingResponse, TripListItem, TripResponse,
};
use crate::models::trip::GeoPoint;
use crate::providers::TrackingInput;
use crate::repositories::assignment_repository::AssignmentRepository;
use crate::repositories::provider_mapping_repository::ProviderMappingRepository;
use crate::repositories::trip_repository::TripRepository;
use crate::services::lifecycle_service::LifecycleService;
use crate::services::trip_orchestrator::TripOrchestrator;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct TripController {
    state: AppState,
    orchestrator: TripOrchestrator,
    lifecycle: LifecycleService,
}

impl TripController {
    pub fn new(state: AppState) -> Self {
        let orchestrator = TripOrchestrator::new(
            state.pool.clone(),
            state.providers.clone(),
            state.config.clone(),
        );
        let lifecycle = LifecycleService::new(
            state.pool.clone(),
            state.providers.clone(),
            state.config.clone(),
        );
        Self {
            state,
            orchestrator,
            lifecycle,
        }
    }

    pub async fn create(
        &self,
        request: CreateTripRequest,
    ) -> Result<ApiResponse<CreateTripResponse>, AppError> {
        request.validate()?;

        let (trip, mapping, fare) = self.orchestrator.create_trip(request).await?;
        self.state.metrics.trips_created_total.inc();

        Ok(ApiResponse::success_with_message(
            CreateTripResponse {
                trip: trip.into(),
                fare,
                provider: mapping.provider,
                partner_status: mapping.partner_status,
            },
            "Trip created successfully".to_string(),
        ))
    }

    pub async fn get(&self, trip_id: Uuid) -> Result<TripListItem, AppError> {
        let mut conn = self.state.pool.acquire().await?;

        let trip = TripRepository::find_by_id(&mut conn, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;

        let assignment = AssignmentRepository::find_latest_by_trips(&mut conn, &[trip_id])
            .await?
            .into_iter()
            .next();
        let mapping = ProviderMappingRepository::find_by_trip(&mut conn, trip_id).await?;

        Ok(TripListItem {
            trip: trip.into(),
            assignment: assignment.map(Into::into),
            provider_mapping: mapping.map(Into::into),
        })
    }

    /// Tracking servido por el adapter del provider vinculado al viaje
    pub async fn tracking(&self, trip_id: Uuid) -> Result<TrackingResponse, AppError> {
        let mut conn = self.state.pool.acquire().await?;

        let trip = TripRepository::find_by_id(&mut conn, trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", trip_id)))?;
        let mapping = ProviderMappingRepository::find_by_trip(&mut conn, trip_id).await?;
        drop(conn);

        let provider = trip
            .provider
            .ok_or_else(|| AppError::BadRequest("trip has no provider bound".to_string()))?;
        let adapter = self.state.providers.get(provider)?;

        let info = adapter
            .track_ride(&TrackingInput {
                trip_id,
                external_booking_id: mapping.and_then(|m| m.external_booking_id),
            })
            .await?;

        Ok(TrackingResponse {
            source: info.source,
            destination: info.destination,
            live: info.live,
        })
    }

    pub async fn start(
        &self,
        trip_id: Uuid,
        request: StartTripRequest,
    ) -> Result<ApiResponse<TripResponse>, AppError> {
        let trip = self.lifecycle.start(trip_id, request.driver_id).await?;
        Ok(ApiResponse::success_with_message(
            trip.into(),
            "Trip started".to_string(),
        ))
    }

    pub async fn arrive(
        &self,
        trip_id: Uuid,
        request: ArriveTripRequest,
    ) -> Result<ApiResponse<TripResponse>, AppError> {
        let trip = self
            .lifecycle
            .arrive(
                trip_id,
                GeoPoint {
                    lat: request.lat,
                    lng: request.lng,
                },
            )
            .await?;
        Ok(ApiResponse::success_with_message(
            trip.into(),
            "Arrival recorded".to_string(),
        ))
    }

    pub async fn onboard(&self, trip_id: Uuid) -> Result<ApiResponse<TripResponse>, AppError> {
        let trip = self.lifecycle.onboard(trip_id).await?;
        Ok(ApiResponse::success_with_message(
            trip.into(),
            "Customer onboarded".to_string(),
        ))
    }

    pub async fn no_show(&self, trip_id: Uuid) -> Result<ApiResponse<TripResponse>, AppError> {
        let trip = self.lifecycle.no_show(trip_id).await?;
        Ok(ApiResponse::success_with_message(
            trip.into(),
            "Trip closed as no-show".to_string(),
        ))
    }

    pub async fn complete(
        &self,
        trip_id: Uuid,
        request: CompleteTripRequest,
    ) -> Result<ApiResponse<TripResponse>, AppError> {
        let trip = self.lifecycle.complete(trip_id, request.driver_id).await?;
        Ok(ApiResponse::success_with_message(
            trip.into(),
            "Trip completed".to_string(),
        ))
    }

    pub async fn cancel(
        &self,
        trip_id: Uuid,
        request: CancelTripRequest,
    ) -> Result<ApiResponse<TripResponse>, AppError> {
        let trip = self.lifecycle.cancel(trip_id, request.reason, true).await?;
        Ok(ApiResponse::success_with_message(
            trip.into(),
            "Trip cancelled".to_string(),
        ))
    }
}
