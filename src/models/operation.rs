// ============================================================================
// OPERACIONES PENDIENTES - Escrituras encoladas mientras no hay conexión
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

/// Escritura pendiente tal y como se persiste en la cola offline.
/// El formato serializado es estable: otras pestañas y recargas de la
/// página leen la misma representación.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Identificador único de la operación, asignado al encolar
    pub id: String,
    /// Momento de creación en epoch-milisegundos
    pub timestamp: i64,
    pub kind: OperationKind,
    pub table: String,
    /// Datos de la fila para insert/update; ausente en delete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Identificador de la fila objetivo; obligatorio en update/delete
    #[serde(rename = "recordId", default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

impl QueuedOperation {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }
}

/// Borrador de operación tal y como lo entrega la página; el coordinador
/// le asigna id y timestamp al encolarlo
#[derive(Clone, Debug)]
pub struct OperationDraft {
    pub kind: OperationKind,
    pub table: String,
    pub payload: Option<Value>,
    pub record_id: Option<String>,
}

impl OperationDraft {
    pub fn insert(table: &str, payload: Value) -> Self {
        Self {
            kind: OperationKind::Insert,
            table: table.to_string(),
            payload: Some(payload),
            record_id: None,
        }
    }

    pub fn update(table: &str, record_id: &str, payload: Value) -> Self {
        Self {
            kind: OperationKind::Update,
            table: table.to_string(),
            payload: Some(payload),
            record_id: Some(record_id.to_string()),
        }
    }

    pub fn delete(table: &str, record_id: &str) -> Self {
        Self {
            kind: OperationKind::Delete,
            table: table.to_string(),
            payload: None,
            record_id: Some(record_id.to_string()),
        }
    }

    pub fn into_queued(self, now_ms: i64) -> QueuedOperation {
        let suffix = Uuid::new_v4().simple().to_string();
        QueuedOperation {
            id: format!("op_{}_{}", now_ms, &suffix[..8]),
            timestamp: now_ms,
            kind: self.kind,
            table: self.table,
            payload: self.payload,
            record_id: self.record_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_stable_field_names() {
        let op = OperationDraft::update("income", "rec-9", json!({"amount": 42}))
            .into_queued(1_700_000_000_000);
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["kind"], "update");
        assert_eq!(value["table"], "income");
        assert_eq!(value["recordId"], "rec-9");
        assert_eq!(value["payload"]["amount"], 42);
        assert_eq!(value["timestamp"], 1_700_000_000_000i64);
        assert!(value["id"].as_str().unwrap().starts_with("op_1700000000000_"));
    }

    #[test]
    fn delete_omits_payload() {
        let op = OperationDraft::delete("expenses", "rec-1").into_queued(5);
        let value = serde_json::to_value(&op).unwrap();
        assert!(value.get("payload").is_none());
        assert_eq!(value["kind"], "delete");
    }

    #[test]
    fn enqueue_ids_are_unique() {
        let a = OperationDraft::insert("income", json!({})).into_queued(7);
        let b = OperationDraft::insert("income", json!({})).into_queued(7);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn age_is_relative_to_creation() {
        let op = OperationDraft::insert("income", json!({})).into_queued(1_000);
        assert_eq!(op.age_ms(61_000), 60_000);
    }
}
