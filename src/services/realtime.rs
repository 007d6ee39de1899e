// ============================================================================
// SUSCRIPTOR DE CAMBIOS REMOTOS - Un canal por (tabla, usuario)
// ============================================================================
// El feed empuja los cambios de cada tabla filtrados por usuario dueño.
// Resuscribirse a un canal ya abierto es un no-op con aviso; al descargar
// la página hay que darse de baja de todo para no filtrar conexiones.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::models::change::RealtimePayload;
use crate::services::socket::{PayloadCallback, RealtimeSocket};

pub struct RealtimeSync {
    socket: Rc<RealtimeSocket>,
    /// clave de canal → topic abierto en el socket
    channels: RefCell<HashMap<String, String>>,
}

impl RealtimeSync {
    pub fn new(socket: Rc<RealtimeSocket>) -> Self {
        Self {
            socket,
            channels: RefCell::new(HashMap::new()),
        }
    }

    /// Abre el canal de `table` filtrado por `user_id`. El callback se invoca
    /// en línea con cada notificación; si es lento es problema del llamante.
    pub fn subscribe_to<F>(&self, table: &str, user_id: &str, callback: F)
    where
        F: Fn(RealtimePayload) + 'static,
    {
        let channel_key = channel_key(table, user_id);
        if self.channels.borrow().contains_key(&channel_key) {
            log::warn!("⚠️ Already subscribed to {} channel", table);
            return;
        }

        let topic = channel_topic(table, user_id);
        let owner = user_id.to_string();
        let table_name = table.to_string();
        let guarded: PayloadCallback = Rc::new(move |payload: RealtimePayload| {
            // El filtro de dueño viaja en el topic; esto es solo un cinturón
            // por si el feed entrega de más
            if !owned_by(&payload, &owner) {
                log::warn!("⚠️ Cambio de {} de otro usuario, ignorado", table_name);
                return;
            }
            callback(payload);
        });

        self.socket.join(&topic, guarded);
        self.channels.borrow_mut().insert(channel_key, topic);
        log::info!("📡 Suscrito a cambios de {}", table);
    }

    pub fn is_subscribed(&self, table: &str, user_id: &str) -> bool {
        self.channels.borrow().contains_key(&channel_key(table, user_id))
    }

    pub fn unsubscribe(&self, table: &str, user_id: &str) {
        let removed = self.channels.borrow_mut().remove(&channel_key(table, user_id));
        if let Some(topic) = removed {
            self.socket.leave(&topic);
            log::info!("📡 Baja del canal {}:{}", table, user_id);
        }
    }

    pub fn unsubscribe_all(&self) {
        let topics: Vec<String> = self.channels.borrow_mut().drain().map(|(_, t)| t).collect();
        for topic in &topics {
            self.socket.leave(topic);
        }
        if !topics.is_empty() {
            log::info!("📡 Baja de todos los canales ({})", topics.len());
        }
    }
}

fn channel_key(table: &str, user_id: &str) -> String {
    format!("{}:{}", table, user_id)
}

fn channel_topic(table: &str, user_id: &str) -> String {
    format!("realtime:public:{}:user_id=eq.{}", table, user_id)
}

/// Una fila sin columna de dueño se acepta: el filtro del topic ya hizo
/// su trabajo
fn owned_by(payload: &RealtimePayload, user_id: &str) -> bool {
    match payload.record().and_then(|record| record.get("user_id")) {
        Some(Value::String(owner)) => owner == user_id,
        Some(Value::Null) | None => true,
        Some(_) => false,
    }
}
