// ============================================================================
// EVENTOS DE CAMBIO - Notificaciones del feed realtime y entre pestañas
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tipo de cambio sobre una fila. En el cable viaja en mayúsculas, tal y
/// como lo emite el feed realtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

impl ChangeType {
    pub fn from_wire(event: &str) -> Option<Self> {
        match event {
            "INSERT" => Some(ChangeType::Insert),
            "UPDATE" => Some(ChangeType::Update),
            "DELETE" => Some(ChangeType::Delete),
            _ => None,
        }
    }
}

/// Payload de un cambio tal y como lo entrega el feed: fila nueva para
/// insert/update, fila vieja para delete
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RealtimePayload {
    #[serde(rename = "eventType")]
    pub event_type: ChangeType,
    #[serde(rename = "new", default)]
    pub new_row: Option<Value>,
    #[serde(rename = "old", default)]
    pub old_row: Option<Value>,
}

impl RealtimePayload {
    /// Fila afectada: la nueva si existe, si no la vieja
    pub fn record(&self) -> Option<&Value> {
        self.new_row.as_ref().or(self.old_row.as_ref())
    }
}

/// Señal que una pestaña deja en el canal compartido para sus hermanas
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrossTabMessage {
    pub event: ChangeType,
    #[serde(default)]
    pub data: Option<Value>,
    pub timestamp: i64,
    #[serde(rename = "tabId")]
    pub tab_id: String,
}

/// Evento normalizado que reciben los callbacks de página, venga del feed
/// o de otra pestaña
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub event_type: ChangeType,
    pub table: String,
    pub owner_user_id: String,
    pub record: Option<Value>,
    /// Pestaña que observó el cambio primero; una pestaña nunca reacciona
    /// a su propio broadcast
    pub origin_tab_id: String,
}

/// Nombre del evento de sincronización entre pestañas para una tabla
pub fn table_event_name(table: &str) -> String {
    match table {
        "income" => "income_changed".to_string(),
        "expenses" => "expense_changed".to_string(),
        "assets" => "asset_changed".to_string(),
        "liabilities" => "liability_changed".to_string(),
        other => format!("{}_changed", other.trim_end_matches('s')),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_type_parses_wire_events() {
        assert_eq!(ChangeType::from_wire("INSERT"), Some(ChangeType::Insert));
        assert_eq!(ChangeType::from_wire("DELETE"), Some(ChangeType::Delete));
        assert_eq!(ChangeType::from_wire("TRUNCATE"), None);
    }

    #[test]
    fn payload_prefers_new_row() {
        let payload = RealtimePayload {
            event_type: ChangeType::Update,
            new_row: Some(json!({"id": "a"})),
            old_row: Some(json!({"id": "b"})),
        };
        assert_eq!(payload.record().unwrap()["id"], "a");

        let deletion = RealtimePayload {
            event_type: ChangeType::Delete,
            new_row: None,
            old_row: Some(json!({"id": "b"})),
        };
        assert_eq!(deletion.record().unwrap()["id"], "b");
    }

    #[test]
    fn cross_tab_message_uses_wire_names() {
        let raw = r#"{"event":"INSERT","data":{"amount":10},"timestamp":99,"tabId":"tab_1"}"#;
        let msg: CrossTabMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.event, ChangeType::Insert);
        assert_eq!(msg.tab_id, "tab_1");
        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back["tabId"], "tab_1");
        assert_eq!(back["event"], "INSERT");
    }

    #[test]
    fn event_names_singularize_tables() {
        assert_eq!(table_event_name("income"), "income_changed");
        assert_eq!(table_event_name("expenses"), "expense_changed");
        assert_eq!(table_event_name("assets"), "asset_changed");
        assert_eq!(table_event_name("liabilities"), "liability_changed");
    }
}
