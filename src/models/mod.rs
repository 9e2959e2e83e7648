//! Modelos del dominio
//!
//! Structs que mapean a las tablas PostgreSQL del servicio de despacho.

pub mod assignment;
pub mod driver;
pub mod provider_mapping;
pub mod trip;

pub use assignment::{Assignment, AssignmentStatus};
pub use driver::Driver;
pub use provider_mapping::ProviderMapping;
pub use trip::{GeoPoint, ProviderType, Trip, TripStatus, TripType, VehicleClass};
