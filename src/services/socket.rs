// ============================================================================
// SOCKET REALTIME - Transporte WebSocket del feed de cambios
// ============================================================================
// Habla el protocolo de canales del feed alojado: sobres {topic, event,
// payload, ref}, phx_join/phx_leave por topic y un heartbeat periódico.
// Los eventos INSERT/UPDATE/DELETE llegan con {record, old_record}.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use gloo_timers::callback::Interval;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, ErrorEvent, Event, MessageEvent, WebSocket};

use crate::config::CONFIG;
use crate::models::change::{ChangeType, RealtimePayload};

const HEARTBEAT_MS: u32 = 30_000;

/// Sobre del protocolo de canales
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    topic: String,
    event: String,
    payload: Value,
    #[serde(rename = "ref", default)]
    reference: Option<String>,
}

pub type PayloadCallback = Rc<dyn Fn(RealtimePayload)>;

struct SocketInner {
    url: String,
    ws: RefCell<Option<WebSocket>>,
    topics: RefCell<HashMap<String, PayloadCallback>>,
    pending_joins: RefCell<Vec<String>>,
    ref_seq: Cell<u64>,
    heartbeat: RefCell<Option<Interval>>,
    open: Cell<bool>,
}

pub struct RealtimeSocket {
    inner: Rc<SocketInner>,
}

impl RealtimeSocket {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            inner: Rc::new(SocketInner {
                url: websocket_url(base_url, anon_key),
                ws: RefCell::new(None),
                topics: RefCell::new(HashMap::new()),
                pending_joins: RefCell::new(Vec::new()),
                ref_seq: Cell::new(0),
                heartbeat: RefCell::new(None),
                open: Cell::new(false),
            }),
        }
    }

    pub fn from_config() -> Self {
        Self::new(&CONFIG.supabase_url, &CONFIG.supabase_anon_key)
    }

    pub fn connect(&self) -> Result<(), String> {
        if self.inner.ws.borrow().is_some() {
            return Ok(());
        }

        let ws = WebSocket::new(&self.inner.url)
            .map_err(|_| "No se pudo abrir el WebSocket del feed".to_string())?;

        let inner = Rc::clone(&self.inner);
        let onopen = Closure::wrap(Box::new(move |_event: Event| {
            inner.open.set(true);
            log::info!("🔌 Feed realtime conectado");
            SocketInner::flush_pending_joins(&inner);
            SocketInner::start_heartbeat(&inner);
        }) as Box<dyn FnMut(Event)>);
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        onopen.forget();

        let inner = Rc::clone(&self.inner);
        let onmessage = Closure::wrap(Box::new(move |event: MessageEvent| {
            if let Some(text) = event.data().as_string() {
                SocketInner::handle_message(&inner, &text);
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();

        let inner = Rc::clone(&self.inner);
        let onclose = Closure::wrap(Box::new(move |event: CloseEvent| {
            inner.open.set(false);
            *inner.heartbeat.borrow_mut() = None;
            log::warn!("🔌 Feed realtime cerrado (código {})", event.code());
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
        onclose.forget();

        let onerror = Closure::wrap(Box::new(move |event: ErrorEvent| {
            log::error!("❌ Error en el feed realtime: {}", event.message());
        }) as Box<dyn FnMut(ErrorEvent)>);
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();

        *self.inner.ws.borrow_mut() = Some(ws);
        Ok(())
    }

    /// Se une a un topic; si el socket aún no está abierto el join queda
    /// pendiente hasta el onopen
    pub fn join(&self, topic: &str, callback: PayloadCallback) {
        self.inner.topics.borrow_mut().insert(topic.to_string(), callback);
        if self.inner.open.get() {
            SocketInner::push(&self.inner, topic, "phx_join", json!({}));
        } else {
            self.inner.pending_joins.borrow_mut().push(topic.to_string());
        }
    }

    pub fn leave(&self, topic: &str) {
        self.inner.topics.borrow_mut().remove(topic);
        self.inner.pending_joins.borrow_mut().retain(|t| t != topic);
        if self.inner.open.get() {
            SocketInner::push(&self.inner, topic, "phx_leave", json!({}));
        }
    }

    /// Cierra la conexión y olvida todos los topics; se invoca al descargar
    /// la página para no dejar conexiones colgando
    pub fn disconnect(&self) {
        *self.inner.heartbeat.borrow_mut() = None;
        self.inner.topics.borrow_mut().clear();
        self.inner.pending_joins.borrow_mut().clear();
        self.inner.open.set(false);
        if let Some(ws) = self.inner.ws.borrow_mut().take() {
            let _ = ws.close();
        }
        log::info!("🔌 Feed realtime desconectado");
    }
}

impl SocketInner {
    fn push(inner: &Rc<SocketInner>, topic: &str, event: &str, payload: Value) {
        let reference = inner.ref_seq.get() + 1;
        inner.ref_seq.set(reference);
        let envelope = Envelope {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            reference: Some(reference.to_string()),
        };
        let json = match serde_json::to_string(&envelope) {
            Ok(json) => json,
            Err(e) => {
                log::error!("❌ Error serializando mensaje {}: {}", event, e);
                return;
            }
        };
        if let Some(ws) = inner.ws.borrow().as_ref() {
            if ws.send_with_str(&json).is_err() {
                log::error!("❌ Error enviando {} al feed", event);
            }
        }
    }

    fn flush_pending_joins(inner: &Rc<SocketInner>) {
        let pending: Vec<String> = inner.pending_joins.borrow_mut().drain(..).collect();
        for topic in pending {
            SocketInner::push(inner, &topic, "phx_join", json!({}));
        }
    }

    fn start_heartbeat(inner: &Rc<SocketInner>) {
        let handle = Rc::clone(inner);
        let interval = Interval::new(HEARTBEAT_MS, move || {
            SocketInner::push(&handle, "phoenix", "heartbeat", json!({}));
        });
        *inner.heartbeat.borrow_mut() = Some(interval);
    }

    fn handle_message(inner: &Rc<SocketInner>, raw: &str) {
        let envelope: Envelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("⚠️ Mensaje del feed ilegible: {}", e);
                return;
            }
        };

        match envelope.event.as_str() {
            "INSERT" | "UPDATE" | "DELETE" => {
                let payload = match realtime_payload(&envelope) {
                    Some(payload) => payload,
                    None => return,
                };
                let callback = inner.topics.borrow().get(&envelope.topic).cloned();
                match callback {
                    Some(callback) => callback(payload),
                    None => log::warn!(
                        "⚠️ Evento para un topic sin suscripción: {}",
                        envelope.topic
                    ),
                }
            }
            "phx_reply" => {
                if envelope.payload.get("status").and_then(Value::as_str) != Some("ok") {
                    log::warn!("⚠️ El feed rechazó {}: {:?}", envelope.topic, envelope.payload);
                }
            }
            "phx_error" => {
                log::warn!("⚠️ Error de canal en {}", envelope.topic);
            }
            _ => {}
        }
    }
}

/// Convierte un sobre INSERT/UPDATE/DELETE en el payload normalizado
fn realtime_payload(envelope: &Envelope) -> Option<RealtimePayload> {
    let event_type = ChangeType::from_wire(&envelope.event)?;
    let new_row = envelope
        .payload
        .get("record")
        .cloned()
        .filter(|v| !v.is_null());
    let old_row = envelope
        .payload
        .get("old_record")
        .cloned()
        .filter(|v| !v.is_null());
    Some(RealtimePayload { event_type, new_row, old_row })
}

/// URL del WebSocket del feed a partir de la URL http del proyecto
pub fn websocket_url(base_url: &str, anon_key: &str) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        format!("wss://{}", base_url)
    };
    format!(
        "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
        ws_base.trim_end_matches('/'),
        anon_key
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_websocket_url_from_project_url() {
        assert_eq!(
            websocket_url("https://x.supabase.co", "key1"),
            "wss://x.supabase.co/realtime/v1/websocket?apikey=key1&vsn=1.0.0"
        );
        assert_eq!(
            websocket_url("http://localhost:54321/", "k"),
            "ws://localhost:54321/realtime/v1/websocket?apikey=k&vsn=1.0.0"
        );
    }

    #[test]
    fn extracts_payload_from_change_envelopes() {
        let envelope = Envelope {
            topic: "realtime:public:income:user_id=eq.u1".into(),
            event: "UPDATE".into(),
            payload: json!({"record": {"id": "r1"}, "old_record": {"id": "r1", "amount": 2}}),
            reference: None,
        };
        let payload = realtime_payload(&envelope).unwrap();
        assert_eq!(payload.event_type, ChangeType::Update);
        assert_eq!(payload.new_row.unwrap()["id"], "r1");
        assert_eq!(payload.old_row.unwrap()["amount"], 2);
    }

    #[test]
    fn delete_envelopes_only_carry_old_record() {
        let envelope = Envelope {
            topic: "t".into(),
            event: "DELETE".into(),
            payload: json!({"record": null, "old_record": {"id": "r9"}}),
            reference: None,
        };
        let payload = realtime_payload(&envelope).unwrap();
        assert!(payload.new_row.is_none());
        assert_eq!(payload.record().unwrap()["id"], "r9");
    }

    #[test]
    fn envelope_round_trips_ref_field() {
        let raw = r#"{"topic":"phoenix","event":"heartbeat","payload":{},"ref":"7"}"#;
        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.reference.as_deref(), Some("7"));
        let back = serde_json::to_value(&envelope).unwrap();
        assert_eq!(back["ref"], "7");
    }
}
