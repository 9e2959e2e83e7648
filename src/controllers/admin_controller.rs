//! Controller administrativo: asignaciones y listados para operaciones

use std::collections::HashMap;

use uuid::Uuid;
use validator::Validate;

use crate::dto::assignment_dto::{
    AssignTripRequest, AssignmentResponse, ReassignTripRequest, UnassignTripRequest,
};
use crate::dto::common::ApiResponse;
use crate::dto::trip_dto::{FareOptionsQuery, TripListItem, TripListQuery, TripListResponse, TripResponse};
use crate::providers::FareOption;
use crate::repositories::assignment_repository::AssignmentRepository;
use crate::repositories::provider_mapping_repository::ProviderMappingRepository;
use crate::repositories::trip_repository::TripRepository;
use crate::services::assignment_service::AssignmentService;
use crate::services::trip_orchestrator::TripOrchestrator;
use crate::state::AppState;
use crate::utils::errors::AppError;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

pub struct AdminController {
    state: AppState,
    assignments: AssignmentService,
}

impl AdminController {
    pub fn new(state: AppState) -> Self {
        let assignments = AssignmentService::new(
            state.pool.clone(),
            state.providers.clone(),
            state.metrics.clone(),
        );
        Self { state, assignments }
    }

    pub async fn assign(
        &self,
        request: AssignTripRequest,
    ) -> Result<ApiResponse<AssignmentResponse>, AppError> {
        let assignment = self
            .assignments
            .assign(request.trip_id, request.driver_id, request.vehicle_id)
            .await?;

        Ok(ApiResponse::success_with_message(
            assignment.into(),
            "Driver assigned successfully".to_string(),
        ))
    }

    pub async fn unassign(
        &self,
        request: UnassignTripRequest,
    ) -> Result<ApiResponse<TripResponse>, AppError> {
        let trip = self.assignments.unassign(request.trip_id).await?;

        Ok(ApiResponse::success_with_message(
            trip.into(),
            "Driver unassigned successfully".to_string(),
        ))
    }

    pub async fn reassign(
        &self,
        request: ReassignTripRequest,
    ) -> Result<ApiResponse<AssignmentResponse>, AppError> {
        let assignment = self
            .assignments
            .reassign(request.trip_id, request.driver_id, request.vehicle_id)
            .await?;

        Ok(ApiResponse::success_with_message(
            assignment.into(),
            "Trip reassigned successfully".to_string(),
        ))
    }

    /// Listado paginado con joins de assignment y provider mapping
    pub async fn list(&self, query: TripListQuery) -> Result<TripListResponse, AppError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) * limit;

        let mut conn = self.state.pool.acquire().await?;

        let trips = TripRepository::list_paginated(&mut conn, query.status, limit, offset).await?;
        let total = TripRepository::count(&mut conn, query.status).await?;

        let trip_ids: Vec<Uuid> = trips.iter().map(|t| t.id).collect();
        let mut assignments: HashMap<Uuid, _> =
            AssignmentRepository::find_latest_by_trips(&mut conn, &trip_ids)
                .await?
                .into_iter()
                .map(|a| (a.trip_id, a))
                .collect();
        let mut mappings: HashMap<Uuid, _> =
            ProviderMappingRepository::find_by_trips(&mut conn, &trip_ids)
                .await?
                .into_iter()
                .map(|m| (m.trip_id, m))
                .collect();

        let items = trips
            .into_iter()
            .map(|trip| {
                let assignment = assignments.remove(&trip.id);
                let mapping = mappings.remove(&trip.id);
                TripListItem {
                    trip: trip.into(),
                    assignment: assignment.map(Into::into),
                    provider_mapping: mapping.map(Into::into),
                }
            })
            .collect();

        Ok(TripListResponse {
            trips: items,
            page,
            limit,
            total,
        })
    }

    /// Payload crudo de la reserva tal como lo tiene el partner, para
    /// diagnóstico de operaciones
    pub async fn partner_booking(&self, trip_id: Uuid) -> Result<serde_json::Value, AppError> {
        let mut conn = self.state.pool.acquire().await?;
        let mapping = ProviderMappingRepository::find_by_trip(&mut conn, trip_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("trip '{}' has no provider mapping", trip_id))
            })?;
        drop(conn);

        let booking_id = mapping.external_booking_id.ok_or_else(|| {
            AppError::BadRequest("trip has no external booking yet".to_string())
        })?;

        let adapter = self.state.providers.get(mapping.provider)?;
        adapter.get_booking_details(&booking_id).await
    }

    /// Comparación de tarifas entre providers, para operaciones
    pub async fn fare_options(&self, query: FareOptionsQuery) -> Result<Vec<FareOption>, AppError> {
        query.validate()?;

        let orchestrator = TripOrchestrator::new(
            self.state.pool.clone(),
            self.state.providers.clone(),
            self.state.config.clone(),
        );
        Ok(orchestrator.fare_options(&query).await)
    }
}
