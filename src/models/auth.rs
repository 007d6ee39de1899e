use gloo_storage::{LocalStorage, Storage};
use serde::{Deserialize, Serialize};

use crate::utils::constants::SESSION_KEY;

/// Sesión de usuario dejada en localStorage por la capa de autenticación
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: String,
    pub access_token: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthSession {
    pub fn load() -> Option<Self> {
        LocalStorage::get(SESSION_KEY).ok()
    }
}
