// ============================================================================
// REINTENTOS CON BACKOFF EXPONENCIAL
// ============================================================================
// Ejecuta una operación hasta max_attempts veces, esperando base * 2^i entre
// intentos. Los errores de autorización cortan en seco: repetir la misma
// llamada no puede funcionar.

use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::services::error::DataError;
use crate::utils::notify::Notifier;
use crate::utils::time::Sleeper;

/// Retardo del intento `attempt` (0-based): base, 2×base, 4×base, ...
pub fn backoff_delay_ms(base_delay_ms: u32, attempt: u32) -> u32 {
    base_delay_ms.saturating_mul(2u32.saturating_pow(attempt))
}

pub struct BackoffExecutor {
    notifier: Rc<dyn Notifier>,
    sleeper: Rc<dyn Sleeper>,
}

impl BackoffExecutor {
    pub fn new(notifier: Rc<dyn Notifier>, sleeper: Rc<dyn Sleeper>) -> Self {
        Self { notifier, sleeper }
    }

    /// Ejecuta `operation` con reintentos. Solo el fallo definitivo llega al
    /// llamante; los intermedios se tragan y se reintentan.
    pub async fn execute<T, F>(
        &self,
        mut operation: F,
        max_attempts: u32,
        base_delay_ms: u32,
    ) -> Result<T, DataError>
    where
        F: FnMut() -> LocalBoxFuture<'static, Result<T, DataError>>,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_auth() => {
                    log::warn!("🔐 Error de autorización, sin reintentos: {}", err);
                    return Err(err);
                }
                Err(err) => {
                    if attempt + 1 >= max_attempts {
                        return Err(err);
                    }
                    let delay = backoff_delay_ms(base_delay_ms, attempt);
                    log::info!(
                        "🔄 Intento {}/{} fallido, se reintenta en {}ms: {}",
                        attempt + 1,
                        max_attempts,
                        delay,
                        err
                    );
                    if attempt > 0 {
                        self.notifier.info(&format!(
                            "Retrying... (Attempt {}/{})",
                            attempt + 1,
                            max_attempts
                        ));
                    }
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
