//! Servicios del dominio
//!
//! Los engines puros (constraint, pricing) no hacen I/O; los servicios de
//! orquestación, asignación y ciclo de vida ejecutan sus mutaciones
//! multi-paso dentro de una transacción explícita contra el store, y las
//! llamadas a partners siempre fuera de ella.

pub mod assignment_service;
pub mod constraint_engine;
pub mod lifecycle_service;
pub mod pricing_engine;
pub mod sync_worker;
pub mod trip_orchestrator;
