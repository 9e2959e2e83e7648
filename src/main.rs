use anyhow::Result;
use axum::{extract::State, response::Json, routing::get, Router};
use dotenvy::dotenv;
use serde_json::json;
use std::net::SocketAddr;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use trip_dispatch::config::environment::EnvironmentConfig;
use trip_dispatch::database::DatabaseConnection;
use trip_dispatch::middleware::cors::{cors_middleware, cors_middleware_with_origins};
use trip_dispatch::state::AppState;
use trip_dispatch::{routes, services, utils};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🚖 Trip Dispatch Service");
    info!("========================");

    let config = EnvironmentConfig::default();

    // Inicializar base de datos; sin store no servimos tráfico degradado
    let db_connection = match DatabaseConnection::new_default().await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("database error: {}", e));
        }
    };
    let pool = db_connection.pool().clone();

    let cors = if config.cors_origins.is_empty() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(config.cors_origins.clone())
    };

    let app_state = match AppState::new(pool, config) {
        Ok(state) => state,
        Err(e) => {
            error!("❌ Error construyendo el estado de la aplicación: {}", e);
            return Err(anyhow::anyhow!("startup error: {}", e));
        }
    };

    // Worker de sincronización de estado de partners (apagado por defecto
    // fuera de producción)
    let _sync_worker = if app_state.config.sync_worker_enabled {
        Some(services::sync_worker::spawn(app_state.clone()))
    } else {
        info!("⏸️ Provider status sync worker disabled by configuration");
        None
    };

    let app = Router::new()
        .route("/health", get(health_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .nest("/api/trips", routes::trip_routes::create_trip_router())
        .nest("/api/admin", routes::admin_routes::create_admin_router())
        .nest(
            "/api/partner/quickcabs",
            routes::partner_routes::create_quickcabs_router(app_state.clone()),
        )
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(app_state.clone());

    let addr: SocketAddr = app_state.config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("   GET  /metrics - Métricas Prometheus");
    info!("🚕 Endpoints de viajes:");
    info!("   POST /api/trips - Crear viaje");
    info!("   GET  /api/trips/:id - Detalle del viaje");
    info!("   GET  /api/trips/:id/tracking - Tracking del provider");
    info!("   POST /api/trips/:id/start|arrive|onboard|noshow|complete|cancel - Ciclo de vida");
    info!("🛠️ Endpoints administrativos:");
    info!("   GET  /api/admin/trips?status=&page=&limit= - Listado paginado");
    info!("   POST /api/admin/trips/assign|unassign|reassign - Asignación de conductores");
    info!("   GET  /api/admin/trips/fare-options - Comparar tarifas entre providers");
    info!("🤝 Endpoints inbound de partners:");
    info!("   POST /api/partner/quickcabs/block|confirm|cancel|reschedule - Basic auth");
    info!("   GET  /api/partner/quickcabs/booking-status/:id - Basic auth");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            e
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Health check simple
async fn health_endpoint(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    Json(json!({
        "service": "trip-dispatch",
        "status": if db_ok { "healthy" } else { "degraded" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Exposición de métricas Prometheus
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, utils::errors::AppError> {
    state
        .metrics
        .encode()
        .map_err(utils::errors::AppError::Internal)
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
