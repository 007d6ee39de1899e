// ============================================================================
// SINCRONIZACIÓN ENTRE PESTAÑAS - Señales vía storage events
// ============================================================================
// Una pestaña deja una clave autoexpirable en localStorage; el evento
// "storage" del navegador la hace llegar al resto de pestañas del mismo
// origen. Cada pestaña ignora sus propias señales.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gloo_storage::{SessionStorage, Storage as _};
use gloo_timers::callback::Timeout;
use serde_json::Value;
use uuid::Uuid;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, StorageEvent};

use crate::models::change::{ChangeType, CrossTabMessage};
use crate::utils::constants::{SYNC_EVENT_PREFIX, TAB_ID_KEY};
use crate::utils::storage::get_local_storage;

pub type ListenerId = usize;
type ListenerCallback = Rc<dyn Fn(&CrossTabMessage)>;

/// Registro local de callbacks por tipo de evento, separado del DOM
#[derive(Default)]
struct ListenerRegistry {
    listeners: HashMap<String, Vec<(ListenerId, ListenerCallback)>>,
    next_id: ListenerId,
}

impl ListenerRegistry {
    fn on(&mut self, event_type: &str, callback: ListenerCallback) -> ListenerId {
        self.next_id += 1;
        let id = self.next_id;
        self.listeners
            .entry(event_type.to_string())
            .or_default()
            .push((id, callback));
        id
    }

    fn off(&mut self, event_type: &str, id: ListenerId) {
        if let Some(list) = self.listeners.get_mut(event_type) {
            list.retain(|(listener_id, _)| *listener_id != id);
        }
    }

    fn callbacks_for(&self, event_type: &str) -> Vec<ListenerCallback> {
        self.listeners
            .get(event_type)
            .map(|list| list.iter().map(|(_, cb)| Rc::clone(cb)).collect())
            .unwrap_or_default()
    }

    /// Entrega un mensaje a los callbacks del tipo de evento; los mensajes
    /// originados por la propia pestaña no se entregan
    fn dispatch(&self, event_type: &str, message: &CrossTabMessage, own_tab_id: &str) -> usize {
        if message.tab_id == own_tab_id {
            return 0;
        }
        let callbacks = self.callbacks_for(event_type);
        for callback in &callbacks {
            callback(message);
        }
        callbacks.len()
    }
}

pub struct CrossTabSync {
    registry: Rc<RefCell<ListenerRegistry>>,
    tab_id: String,
}

impl CrossTabSync {
    pub fn new() -> Self {
        let sync = Self {
            registry: Rc::new(RefCell::new(ListenerRegistry::default())),
            tab_id: tab_identifier(),
        };
        sync.setup_storage_listener();
        sync
    }

    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    /// Señaliza un cambio al resto de pestañas. La clave se borra en seguida:
    /// es un aviso, no un log duradero.
    pub fn broadcast(&self, event_type: &str, event: ChangeType, record: Option<Value>) {
        let message = CrossTabMessage {
            event,
            data: record,
            timestamp: js_sys::Date::now() as i64,
            tab_id: self.tab_id.clone(),
        };
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                log::error!("❌ Error serializando señal {}: {}", event_type, e);
                return;
            }
        };

        let storage = match get_local_storage() {
            Some(storage) => storage,
            None => return,
        };
        let key = format!("{}{}", SYNC_EVENT_PREFIX, event_type);
        if storage.set_item(&key, &json).is_err() {
            log::error!("❌ Error señalizando {} a otras pestañas", event_type);
            return;
        }

        let cleanup_key = key;
        Timeout::new(1_000, move || {
            if let Some(storage) = get_local_storage() {
                let _ = storage.remove_item(&cleanup_key);
            }
        })
        .forget();
    }

    pub fn on<F>(&self, event_type: &str, callback: F) -> ListenerId
    where
        F: Fn(&CrossTabMessage) + 'static,
    {
        self.registry.borrow_mut().on(event_type, Rc::new(callback))
    }

    pub fn off(&self, event_type: &str, id: ListenerId) {
        self.registry.borrow_mut().off(event_type, id);
    }

    fn setup_storage_listener(&self) {
        let window = match window() {
            Some(w) => w,
            None => return,
        };

        let registry = Rc::clone(&self.registry);
        let own_tab = self.tab_id.clone();
        let closure = Closure::wrap(Box::new(move |event: StorageEvent| {
            let key = match event.key() {
                Some(key) => key,
                None => return,
            };
            let event_type = match event_type_from_key(&key) {
                Some(event_type) => event_type.to_string(),
                None => return,
            };
            // El borrado de la clave también dispara "storage", con valor nulo
            let raw = match event.new_value() {
                Some(raw) => raw,
                None => return,
            };
            match serde_json::from_str::<CrossTabMessage>(&raw) {
                Ok(message) => {
                    if message.tab_id == own_tab {
                        return;
                    }
                    let callbacks = registry.borrow().callbacks_for(&event_type);
                    for callback in callbacks {
                        callback(&message);
                    }
                }
                Err(e) => log::error!("❌ Error parseando señal entre pestañas: {}", e),
            }
        }) as Box<dyn FnMut(StorageEvent)>);

        let _ = window
            .add_event_listener_with_callback("storage", closure.as_ref().unchecked_ref());
        // Listener global de por vida de la pestaña
        closure.forget();
    }
}

impl Default for CrossTabSync {
    fn default() -> Self {
        Self::new()
    }
}

/// Tipo de evento codificado en una clave del canal compartido
pub fn event_type_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(SYNC_EVENT_PREFIX)
}

/// Identificador perezoso de esta pestaña; sobrevive recargas dentro de la
/// misma pestaña, nunca se comparte entre pestañas
fn tab_identifier() -> String {
    if let Ok(existing) = SessionStorage::get::<String>(TAB_ID_KEY) {
        return existing;
    }
    let suffix = Uuid::new_v4().simple().to_string();
    let id = format!("tab_{}_{}", js_sys::Date::now() as i64, &suffix[..8]);
    if SessionStorage::set(TAB_ID_KEY, &id).is_err() {
        log::warn!("⚠️ No se pudo persistir el identificador de pestaña");
    }
    id
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn message(tab_id: &str) -> CrossTabMessage {
        CrossTabMessage {
            event: ChangeType::Insert,
            data: Some(serde_json::json!({"amount": 12})),
            timestamp: 99,
            tab_id: tab_id.to_string(),
        }
    }

    #[test]
    fn delivers_to_listeners_from_other_tabs() {
        let mut registry = ListenerRegistry::default();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        registry.on(
            "income_changed",
            Rc::new(move |msg: &CrossTabMessage| {
                assert_eq!(msg.tab_id, "B");
                counter.set(counter.get() + 1);
            }),
        );

        let delivered = registry.dispatch("income_changed", &message("B"), "A");
        assert_eq!(delivered, 1);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn ignores_own_broadcasts() {
        let mut registry = ListenerRegistry::default();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        registry.on("income_changed", Rc::new(move |_| counter.set(counter.get() + 1)));

        let delivered = registry.dispatch("income_changed", &message("A"), "A");
        assert_eq!(delivered, 0);
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn supports_multiple_listeners_and_removal() {
        let mut registry = ListenerRegistry::default();
        let fired = Rc::new(Cell::new(0));

        let counter = Rc::clone(&fired);
        let first = registry.on("expense_changed", Rc::new(move |_| counter.set(counter.get() + 1)));
        let counter = Rc::clone(&fired);
        registry.on("expense_changed", Rc::new(move |_| counter.set(counter.get() + 10)));

        registry.dispatch("expense_changed", &message("B"), "A");
        assert_eq!(fired.get(), 11);

        registry.off("expense_changed", first);
        registry.dispatch("expense_changed", &message("B"), "A");
        assert_eq!(fired.get(), 21);
    }

    #[test]
    fn unrelated_event_types_do_not_fire() {
        let mut registry = ListenerRegistry::default();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        registry.on("income_changed", Rc::new(move |_| counter.set(counter.get() + 1)));

        assert_eq!(registry.dispatch("expense_changed", &message("B"), "A"), 0);
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn extracts_event_type_from_channel_keys() {
        assert_eq!(
            event_type_from_key("chauflow_sync_income_changed"),
            Some("income_changed")
        );
        assert_eq!(event_type_from_key("other_key"), None);
    }
}
