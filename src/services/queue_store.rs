// ============================================================================
// ALMACÉN DURABLE DE LA COLA OFFLINE
// ============================================================================
// La cola sobrevive recargas de página: se persiste como array JSON en una
// ranura fija de localStorage. Datos corruptos o cuota agotada degradan a
// cola vacía / persistencia omitida, nunca a un pánico.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::models::operation::QueuedOperation;
use crate::utils::storage::KeyValueSlot;

pub struct QueueStore {
    slot: Rc<dyn KeyValueSlot>,
}

impl QueueStore {
    pub fn new(slot: Rc<dyn KeyValueSlot>) -> Self {
        Self { slot }
    }

    /// Carga la cola persistida; una ranura vacía o ilegible es una cola vacía
    pub fn load(&self) -> VecDeque<QueuedOperation> {
        let raw = match self.slot.read() {
            Some(raw) => raw,
            None => return VecDeque::new(),
        };
        match serde_json::from_str::<Vec<QueuedOperation>>(&raw) {
            Ok(operations) => {
                if !operations.is_empty() {
                    log::info!("📋 Cola cargada: {} operaciones pendientes", operations.len());
                }
                operations.into()
            }
            Err(e) => {
                log::error!("❌ Cola almacenada corrupta, se descarta: {}", e);
                VecDeque::new()
            }
        }
    }

    pub fn save(&self, queue: &VecDeque<QueuedOperation>) {
        let operations: Vec<&QueuedOperation> = queue.iter().collect();
        match serde_json::to_string(&operations) {
            Ok(json) => {
                if let Err(e) = self.slot.write(&json) {
                    log::error!("❌ Error guardando la cola offline: {}", e);
                }
            }
            Err(e) => log::error!("❌ Error serializando la cola offline: {}", e),
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.slot.clear() {
            log::error!("❌ Error limpiando la cola offline: {}", e);
        }
    }
}
