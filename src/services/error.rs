// ============================================================================
// ERRORES DE LA CAPA DE DATOS - Taxonomía cerrada para reintentos
// ============================================================================
// El resto del código nunca inspecciona formas de error del transporte:
// decide solo sobre estas tres clases.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataError {
    /// Fallo transitorio (red caída, timeout, 5xx): se puede reintentar
    Transient(String),
    /// Sesión expirada o rechazo de políticas de acceso: reintentar no
    /// puede funcionar
    Auth(String),
    /// Rechazo definitivo del backend (validación, petición mal formada)
    Permanent(String),
}

impl DataError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DataError::Transient(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, DataError::Auth(_))
    }

    /// Clasifica una respuesta HTTP del backend. `code` es el código de
    /// error propio del backend si la respuesta traía uno (p.ej. PGRST301
    /// para un JWT expirado).
    pub fn from_status(status: u16, code: Option<&str>, message: String) -> Self {
        if status == 401 || status == 403 || code == Some("PGRST301") {
            return DataError::Auth(message);
        }
        if status == 0 || status >= 500 {
            return DataError::Transient(message);
        }
        DataError::Permanent(message)
    }

    /// Fallo de red antes de obtener respuesta
    pub fn network(err: impl fmt::Display) -> Self {
        DataError::Transient(format!("Network error: {}", err))
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::Transient(msg) => write!(f, "transient: {}", msg),
            DataError::Auth(msg) => write!(f, "auth: {}", msg),
            DataError::Permanent(msg) => write!(f, "permanent: {}", msg),
        }
    }
}
