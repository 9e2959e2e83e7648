//! Autenticación inbound de partners
//!
//! Los endpoints entrantes de QuickCabs van protegidos con HTTP basic auth
//! usando las credenciales emitidas para el partner. El rechazo se responde
//! en el envelope propio del partner, no en el genérico del sistema.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;

use crate::dto::partner_dto::QuickCabsEnvelope;
use crate::state::AppState;

pub async fn quickcabs_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic)
        .map(|(user, password)| {
            user == state.config.quickcabs_inbound_user
                && password == state.config.quickcabs_inbound_password
        })
        .unwrap_or(false);

    if !authorized {
        tracing::warn!("🔒 Rejected partner-inbound call with bad credentials");
        return (
            StatusCode::UNAUTHORIZED,
            Json(QuickCabsEnvelope::failure(
                "ERR_AUTH",
                "invalid partner credentials".to_string(),
            )),
        )
            .into_response();
    }

    next.run(request).await
}

fn parse_basic(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_basic_credentials() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("quickcabs:secret");
        let header = format!("Basic {}", encoded);
        assert_eq!(
            parse_basic(&header),
            Some(("quickcabs".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn rejects_non_basic_schemes_and_garbage() {
        assert_eq!(parse_basic("Bearer abc"), None);
        assert_eq!(parse_basic("Basic not-base64!!"), None);
    }
}
