// ============================================================================
// CHAUFLOW CLIENT CORE - Resiliencia offline y sync en tiempo real
// ============================================================================
// Núcleo cliente de la app de contabilidad: cola offline persistente con
// reintentos, monitor de conectividad con sonda activa, feed de cambios en
// tiempo real y señalización entre pestañas del mismo origen.
// ============================================================================

pub mod app;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;
pub mod views;

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::app::{App, SyncOptions};
use crate::config::CONFIG;
use crate::models::AuthSession;

// Instancia única por pestaña
thread_local! {
    static APP: RefCell<Option<Rc<App>>> = RefCell::new(None);
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    // Panic hook para poder depurar desde la consola
    console_error_panic_hook::set_once();
    if CONFIG.is_logging_enabled() {
        wasm_logger::init(wasm_logger::Config::default());
    }
    log::info!("🚀 ChauFlow client core iniciando...");

    let user = match AuthSession::load() {
        Some(user) => user,
        None => {
            log::warn!("⚠️ Sin sesión activa; la sincronización arrancará tras el login");
            return Ok(());
        }
    };

    let app = Rc::new(App::new(user));
    app.start(SyncOptions::default());

    APP.with(|cell| {
        *cell.borrow_mut() = Some(app);
    });

    Ok(())
}

/// Acceso de las páginas a la instancia única
pub fn with_app<R>(f: impl FnOnce(&Rc<App>) -> R) -> Option<R> {
    APP.with(|cell| cell.borrow().as_ref().map(f))
}

/// Operaciones pendientes en la cola offline (consultable desde JS)
#[wasm_bindgen]
pub fn pending_operations() -> usize {
    with_app(|app| app.offline().pending_count()).unwrap_or(0)
}

/// Fuerza una pasada de sincronización (botón "Sync now" de la página)
#[wasm_bindgen]
pub fn process_pending_queue() {
    if let Some(offline) = with_app(|app| Rc::clone(app.offline())) {
        wasm_bindgen_futures::spawn_local(async move {
            let _ = offline.drain().await;
        });
    }
}
