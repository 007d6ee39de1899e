use serde::{Deserialize, Serialize};

use crate::utils::constants::PROBE_URL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub environment: String,
    pub enable_logging: bool,
    pub retry: RetryConfig,
    pub offline: OfflineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// Cadencia de la sonda de conectividad
    pub probe_interval_secs: u32,
    pub probe_url: String,
    /// Edad máxima de una operación encolada antes de descartarla
    pub queue_expiry_secs: u32,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: 30,
            probe_url: PROBE_URL.to_string(),
            queue_expiry_secs: 300,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: String::new(),
            environment: "development".to_string(),
            enable_logging: true,
            retry: RetryConfig::default(),
            offline: OfflineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno en tiempo de
    /// compilación (ver build.rs y .env)
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();
        Self {
            supabase_url: option_env!("SUPABASE_URL")
                .map(str::to_string)
                .unwrap_or(defaults.supabase_url),
            supabase_anon_key: option_env!("SUPABASE_ANON_KEY")
                .map(str::to_string)
                .unwrap_or(defaults.supabase_anon_key),
            environment: option_env!("ENVIRONMENT")
                .map(str::to_string)
                .unwrap_or(defaults.environment),
            enable_logging: option_env!("ENABLE_LOGGING")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.enable_logging),
            retry: RetryConfig {
                max_attempts: option_env!("RETRY_MAX_ATTEMPTS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.retry.max_attempts),
                base_delay_ms: option_env!("RETRY_BASE_DELAY_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.retry.base_delay_ms),
            },
            offline: OfflineConfig {
                probe_interval_secs: option_env!("PROBE_INTERVAL_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.offline.probe_interval_secs),
                probe_url: option_env!("PROBE_URL")
                    .map(str::to_string)
                    .unwrap_or(defaults.offline.probe_url),
                queue_expiry_secs: option_env!("QUEUE_EXPIRY_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.offline.queue_expiry_secs),
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.enable_logging
    }
}

// Configuración global estática
lazy_static::lazy_static! {
    pub static ref CONFIG: AppConfig = AppConfig::from_env();
}
