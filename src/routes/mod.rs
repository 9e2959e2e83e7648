//! Routers de la API

pub mod admin_routes;
pub mod partner_routes;
pub mod trip_routes;
