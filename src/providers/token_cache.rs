//! Cache de tokens de autenticación de partners
//!
//! Un cache por instancia de adapter, con token + expiración detrás de un
//! Mutex. El lock se mantiene durante el refresh, de modo que solo hay un
//! refresh en vuelo por adapter y los callers concurrentes esperan ese
//! mismo resultado. El refresh reintenta con backoff exponencial y jitter
//! hasta un tope fijo de intentos; al agotarse devuelve un fallo de
//! autenticación de adapter, distinto de un fallo de reserva.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::Mutex;

use crate::utils::errors::{AppError, AppResult};

/// Margen antes de la expiración real en que el token se considera vencido
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Token recién emitido por el partner
#[derive(Debug, Clone)]
pub struct FreshToken {
    pub token: String,
    pub expires_in_secs: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        Utc::now() + chrono::Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

pub struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
    max_attempts: u32,
    backoff_base: Duration,
}

impl TokenCache {
    pub fn new(max_attempts: u32, backoff_base_ms: u64) -> Self {
        Self {
            slot: Mutex::new(None),
            max_attempts: max_attempts.max(1),
            backoff_base: Duration::from_millis(backoff_base_ms),
        }
    }

    /// Devuelve el token cacheado si sigue vigente; si no, lo refresca con
    /// reintentos acotados. El caller nunca queda bloqueado más allá del
    /// tope de intentos.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> AppResult<String>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<FreshToken>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            if !cached.is_expired() {
                return Ok(cached.token.clone());
            }
        }

        let mut last_error = String::new();
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.backoff_for(attempt)).await;
            }

            match refresh().await {
                Ok(fresh) => {
                    let cached = CachedToken {
                        token: fresh.token.clone(),
                        expires_at: Utc::now() + chrono::Duration::seconds(fresh.expires_in_secs),
                    };
                    *slot = Some(cached);
                    return Ok(fresh.token);
                }
                Err(e) => {
                    tracing::warn!(
                        "🔑 Partner token refresh failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.max_attempts,
                        e
                    );
                    last_error = e.to_string();
                }
            }
        }

        *slot = None;
        Err(AppError::PartnerAuth(format!(
            "token refresh exhausted after {} attempts: {}",
            self.max_attempts, last_error
        )))
    }

    /// Descarta el token cacheado (p.ej. tras un 401 del partner)
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let base = self.backoff_base.as_millis() as u64;
        let exp = base.saturating_mul(1u64 << (attempt - 1).min(8));
        let jitter = rand::thread_rng().gen_range(0..=base / 2);
        Duration::from_millis(exp + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn cached_token_is_reused_until_expiry() {
        let cache = TokenCache::new(3, 1);
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let token = cache
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(FreshToken {
                        token: "tok-1".to_string(),
                        expires_in_secs: 3600,
                    })
                })
                .await
                .unwrap();
            assert_eq!(token, "tok-1");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_exhaustion_raises_partner_auth_error() {
        let cache = TokenCache::new(3, 1);
        let calls = AtomicU32::new(0);

        let result = cache
            .get_or_refresh(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<FreshToken, _>(AppError::PartnerApi("401 from partner".to_string()))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(AppError::PartnerAuth(_))));
    }

    #[tokio::test]
    async fn invalidate_forces_a_new_refresh() {
        let cache = TokenCache::new(3, 1);
        let calls = AtomicU32::new(0);

        let refresh = || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(FreshToken {
                token: format!("tok-{}", n),
                expires_in_secs: 3600,
            })
        };

        assert_eq!(cache.get_or_refresh(refresh).await.unwrap(), "tok-0");
        cache.invalidate().await;
        assert_eq!(cache.get_or_refresh(refresh).await.unwrap(), "tok-1");
    }
}
