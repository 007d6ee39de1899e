// ============================================================================
// MONITOR DE ESTADO DE RED
// ============================================================================
// Detecta cambios de conectividad para pausar/reanudar la sincronización.
// navigator.onLine por sí solo no es de fiar (falsos positivos en redes
// cautivas), así que cada cierto tiempo se sondea un recurso externo y el
// resultado de la sonda corrige el estado.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use gloo_timers::callback::Interval;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{window, Event, RequestCache, RequestInit, RequestMode};

use crate::config::CONFIG;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
    Unknown,
}

/// Monitor de red con listeners de eventos y sonda periódica.
/// Previene registros duplicados: start_monitoring solo actúa una vez.
pub struct NetworkMonitor {
    status: Arc<Mutex<NetworkStatus>>,
    monitoring_started: Arc<Mutex<bool>>,
    probe_interval_ms: u32,
    probe_url: String,
    probe_timer: RefCell<Option<Interval>>,
}

impl NetworkMonitor {
    pub fn new() -> Self {
        Self::with_settings(CONFIG.offline.probe_interval_secs, &CONFIG.offline.probe_url)
    }

    pub fn with_settings(probe_interval_secs: u32, probe_url: &str) -> Self {
        let initial = match window().map(|w| w.navigator().on_line()) {
            Some(true) => NetworkStatus::Online,
            Some(false) => NetworkStatus::Offline,
            None => NetworkStatus::Unknown,
        };

        Self {
            status: Arc::new(Mutex::new(initial)),
            monitoring_started: Arc::new(Mutex::new(false)),
            probe_interval_ms: probe_interval_secs.saturating_mul(1000),
            probe_url: probe_url.to_string(),
            probe_timer: RefCell::new(None),
        }
    }

    /// Registra los listeners online/offline y arranca la sonda periódica.
    /// Las llamadas posteriores se ignoran para no acumular listeners.
    pub fn start_monitoring<F>(&self, callback: F)
    where
        F: Fn(NetworkStatus) + 'static,
    {
        {
            let mut started = self.monitoring_started.lock().unwrap();
            if *started {
                log::warn!("⚠️ NetworkMonitor: start_monitoring ya fue llamado, ignorando llamada duplicada");
                return;
            }
            *started = true;
        }

        let window = match window() {
            Some(w) => w,
            None => return,
        };

        let status = self.status.clone();
        let callback: Rc<dyn Fn(NetworkStatus)> = Rc::new(callback);

        // Listener para evento "online"
        let online_closure = Closure::wrap(Box::new({
            let status = status.clone();
            let callback = Rc::clone(&callback);
            move |_event: Event| {
                log::info!("🌐 Network: ONLINE");
                *status.lock().unwrap() = NetworkStatus::Online;
                callback(NetworkStatus::Online);
            }
        }) as Box<dyn FnMut(Event)>);

        // Listener para evento "offline"
        let offline_closure = Closure::wrap(Box::new({
            let status = status.clone();
            let callback = Rc::clone(&callback);
            move |_event: Event| {
                log::warn!("📴 Network: OFFLINE");
                *status.lock().unwrap() = NetworkStatus::Offline;
                callback(NetworkStatus::Offline);
            }
        }) as Box<dyn FnMut(Event)>);

        let _ = window.add_event_listener_with_callback(
            "online",
            online_closure.as_ref().unchecked_ref(),
        );
        let _ = window.add_event_listener_with_callback(
            "offline",
            offline_closure.as_ref().unchecked_ref(),
        );

        // Los listeners globales persisten toda la vida de la app; forget()
        // mantiene vivas las closures en WASM
        online_closure.forget();
        offline_closure.forget();

        // Sonda periódica contra un recurso externo conocido
        let interval = {
            let status = status.clone();
            let callback = Rc::clone(&callback);
            let url = self.probe_url.clone();
            Interval::new(self.probe_interval_ms, move || {
                let status = status.clone();
                let callback = Rc::clone(&callback);
                let url = url.clone();
                spawn_local(async move {
                    let reachable = probe_reachable(&url).await;
                    let corrected = {
                        let mut current = status.lock().unwrap();
                        match probe_transition(*current, reachable) {
                            Some(next) => {
                                *current = next;
                                Some(next)
                            }
                            None => None,
                        }
                    };
                    match corrected {
                        Some(NetworkStatus::Online) => {
                            log::info!("🌐 Sonda de red: conexión recuperada");
                            callback(NetworkStatus::Online);
                        }
                        Some(NetworkStatus::Offline) => {
                            log::warn!("📴 Sonda de red: sin salida a internet");
                            callback(NetworkStatus::Offline);
                        }
                        _ => {}
                    }
                });
            })
        };
        *self.probe_timer.borrow_mut() = Some(interval);

        log::info!(
            "✅ NetworkMonitor: listeners registrados, sonda cada {}s",
            self.probe_interval_ms / 1000
        );
    }

    pub fn current_status(&self) -> NetworkStatus {
        *self.status.lock().unwrap()
    }

    pub fn is_online(&self) -> bool {
        matches!(self.current_status(), NetworkStatus::Online)
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.current_status(), NetworkStatus::Offline)
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        log::info!("🔌 Network monitor dropped");
    }
}

/// Estado siguiente tras una sonda, o None si no cambia nada. La sonda manda
/// sobre lo que diga navigator.onLine.
fn probe_transition(current: NetworkStatus, reachable: bool) -> Option<NetworkStatus> {
    match (current, reachable) {
        (NetworkStatus::Online, false) | (NetworkStatus::Unknown, false) => {
            Some(NetworkStatus::Offline)
        }
        (NetworkStatus::Offline, true) | (NetworkStatus::Unknown, true) => {
            Some(NetworkStatus::Online)
        }
        _ => None,
    }
}

/// Una respuesta opaca basta: solo importa si el fetch resuelve
async fn probe_reachable(url: &str) -> bool {
    let window = match window() {
        Some(w) => w,
        None => return false,
    };
    let init = RequestInit::new();
    init.set_mode(RequestMode::NoCors);
    init.set_cache(RequestCache::NoCache);
    JsFuture::from(window.fetch_with_str_and_init(url, &init))
        .await
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_failure_forces_offline_even_if_browser_says_online() {
        // El flag del navegador sigue en Online; tres sondas fallidas
        // seguidas dejan el estado en Offline desde la primera
        let mut status = NetworkStatus::Online;
        let mut transitions = Vec::new();
        for _ in 0..3 {
            if let Some(next) = probe_transition(status, false) {
                status = next;
                transitions.push(next);
            }
        }
        assert_eq!(status, NetworkStatus::Offline);
        assert_eq!(transitions, vec![NetworkStatus::Offline]);
    }

    #[test]
    fn probe_success_recovers_from_offline() {
        assert_eq!(
            probe_transition(NetworkStatus::Offline, true),
            Some(NetworkStatus::Online)
        );
        assert_eq!(probe_transition(NetworkStatus::Online, true), None);
        assert_eq!(probe_transition(NetworkStatus::Offline, false), None);
    }

    #[test]
    fn unknown_state_resolves_on_first_probe() {
        assert_eq!(
            probe_transition(NetworkStatus::Unknown, true),
            Some(NetworkStatus::Online)
        );
        assert_eq!(
            probe_transition(NetworkStatus::Unknown, false),
            Some(NetworkStatus::Offline)
        );
    }
}
