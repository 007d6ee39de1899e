// ============================================================================
// COORDINADOR OFFLINE - Cola persistente de escrituras con drain ordenado
// ============================================================================
// Dos estados: Online y Offline. Sin conexión las escrituras se encolan; al
// recuperarla (evento del navegador o sonda) la cola se vacía en orden FIFO,
// una operación cada vez, a través del ejecutor de reintentos. Una pasada de
// drain nunca solapa con otra.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use wasm_bindgen_futures::spawn_local;
use web_sys::window;

use crate::config::CONFIG;
use crate::models::operation::{OperationDraft, OperationKind, QueuedOperation};
use crate::services::error::DataError;
use crate::services::network_monitor::{NetworkMonitor, NetworkStatus};
use crate::services::queue_store::QueueStore;
use crate::services::retry::BackoffExecutor;
use crate::services::supabase::WriteBackend;
use crate::utils::notify::Notifier;
use crate::utils::storage::KeyValueSlot;
use crate::utils::time::{Clock, Sleeper};

/// Resultado de una pasada de drain
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub synced: usize,
    pub failed: usize,
    pub pending: usize,
}

/// Desenlace de una escritura resiliente
#[derive(Debug)]
pub enum WriteOutcome<T> {
    /// La escritura llegó al backend
    Completed(T),
    /// Sin conexión: quedó encolada para el próximo drain
    Queued,
}

pub struct OfflineOptions {
    pub initially_online: bool,
    pub queue_expiry_ms: i64,
    pub max_attempts: u32,
    pub base_delay_ms: u32,
}

impl OfflineOptions {
    pub fn from_config() -> Self {
        Self {
            initially_online: navigator_online(),
            queue_expiry_ms: i64::from(CONFIG.offline.queue_expiry_secs) * 1000,
            max_attempts: CONFIG.retry.max_attempts,
            base_delay_ms: CONFIG.retry.base_delay_ms,
        }
    }
}

/// Estado inicial según lo que reporte el navegador
pub fn navigator_online() -> bool {
    window().map(|w| w.navigator().on_line()).unwrap_or(true)
}

pub struct OfflineManager {
    backend: Rc<dyn WriteBackend>,
    store: QueueStore,
    clock: Rc<dyn Clock>,
    notifier: Rc<dyn Notifier>,
    executor: BackoffExecutor,
    queue: RefCell<VecDeque<QueuedOperation>>,
    is_online: Cell<bool>,
    drain_in_progress: Cell<bool>,
    queue_expiry_ms: i64,
    max_attempts: u32,
    base_delay_ms: u32,
}

impl OfflineManager {
    pub fn new(
        backend: Rc<dyn WriteBackend>,
        slot: Rc<dyn KeyValueSlot>,
        clock: Rc<dyn Clock>,
        sleeper: Rc<dyn Sleeper>,
        notifier: Rc<dyn Notifier>,
        options: OfflineOptions,
    ) -> Self {
        let store = QueueStore::new(slot);
        let queue = store.load();
        let executor = BackoffExecutor::new(Rc::clone(&notifier), sleeper);

        if !options.initially_online {
            notifier.set_offline_banner(true);
        }

        Self {
            backend,
            store,
            clock,
            notifier,
            executor,
            queue: RefCell::new(queue),
            is_online: Cell::new(options.initially_online),
            drain_in_progress: Cell::new(false),
            queue_expiry_ms: options.queue_expiry_ms,
            max_attempts: options.max_attempts,
            base_delay_ms: options.base_delay_ms,
        }
    }

    pub fn is_online(&self) -> bool {
        self.is_online.get()
    }

    pub fn set_online(&self, online: bool) {
        self.is_online.set(online);
    }

    pub fn pending_count(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn snapshot(&self) -> Vec<QueuedOperation> {
        self.queue.borrow().iter().cloned().collect()
    }

    /// Conecta el coordinador al monitor de red: cada transición actualiza
    /// el banner y, al volver la conexión, dispara un drain
    pub fn attach(self: &Rc<Self>, monitor: &NetworkMonitor) {
        let manager = Rc::clone(self);
        monitor.start_monitoring(move |status| {
            if manager.apply_status(status) {
                let manager = Rc::clone(&manager);
                spawn_local(async move {
                    let _ = manager.drain().await;
                });
            }
        });
    }

    /// Aplica una transición de conectividad. Devuelve true si procede
    /// disparar un drain.
    pub fn apply_status(&self, status: NetworkStatus) -> bool {
        match status {
            NetworkStatus::Online => {
                self.is_online.set(true);
                self.notifier.set_offline_banner(false);
                self.notifier.success("Connection restored! Syncing changes...");
                log::info!("🌐 Conexión recuperada, se procesará la cola");
                true
            }
            NetworkStatus::Offline => {
                self.is_online.set(false);
                self.notifier.set_offline_banner(true);
                log::warn!("📴 Sin conexión, las escrituras se encolarán");
                false
            }
            NetworkStatus::Unknown => false,
        }
    }

    /// Encola una escritura para ejecutarla cuando haya conexión
    pub fn enqueue(&self, draft: OperationDraft) -> String {
        let operation = draft.into_queued(self.clock.now_ms());
        let id = operation.id.clone();
        log::info!(
            "📥 Operación encolada: {} ({} en {})",
            operation.id,
            operation.kind.as_str(),
            operation.table
        );
        self.queue.borrow_mut().push_back(operation);
        self.store.save(&self.queue.borrow());
        let pending = self.queue.borrow().len();
        self.notifier.info(&format!(
            "Operation saved. Will sync when online. ({} pending)",
            pending
        ));
        id
    }

    /// Vacía la cola sin ejecutar nada
    pub fn clear_queue(&self) {
        self.queue.borrow_mut().clear();
        self.store.save(&self.queue.borrow());
        log::info!("🗑️ Cola offline vaciada");
    }

    /// Procesa la cola en orden. Si ya hay una pasada en curso, este disparo
    /// no hace nada.
    pub async fn drain(&self) -> DrainReport {
        if self.drain_in_progress.get() {
            log::info!("⏳ Drain ya en curso, disparo ignorado");
            return DrainReport::default();
        }
        self.drain_in_progress.set(true);
        let report = self.drain_pass().await;
        self.drain_in_progress.set(false);
        report
    }

    async fn drain_pass(&self) -> DrainReport {
        let total = self.queue.borrow().len();
        if total == 0 {
            return DrainReport::default();
        }
        log::info!("🔄 Procesando {} operaciones encoladas...", total);

        let mut synced = 0usize;
        let mut failed = 0usize;

        loop {
            if !self.is_online.get() {
                break;
            }
            let head = match self.queue.borrow().front().cloned() {
                Some(operation) => operation,
                None => break,
            };

            match self.execute_queued(&head).await {
                Ok(()) => {
                    self.queue.borrow_mut().pop_front();
                    synced += 1;
                    log::info!("✅ Operación completada: {}", head.id);
                }
                Err(err) if err.is_auth() => {
                    failed += 1;
                    let dropped = self.queue.borrow().len();
                    self.queue.borrow_mut().clear();
                    log::warn!(
                        "🔐 Error de autorización, se vacía la cola ({} operaciones): {}",
                        dropped,
                        err
                    );
                    self.notifier.error("Session expired. Please log in again.");
                    break;
                }
                Err(err) => {
                    failed += 1;
                    log::error!("❌ Operación fallida: {} ({})", head.id, err);
                    // Una operación que lleva demasiado tiempo fallando no
                    // puede bloquear la cola para siempre
                    if head.age_ms(self.clock.now_ms()) > self.queue_expiry_ms {
                        log::warn!("🗑️ Operación expirada, se elimina: {}", head.id);
                        self.queue.borrow_mut().pop_front();
                    }
                    break;
                }
            }
        }

        self.store.save(&self.queue.borrow());
        let pending = self.queue.borrow().len();

        if synced > 0 {
            self.notifier.success(&format!("Synced {} pending change(s)", synced));
        }
        if failed > 0 && pending > 0 {
            self.notifier.error(&format!(
                "{} operation(s) still pending. Will retry automatically.",
                pending
            ));
        }

        DrainReport { synced, failed, pending }
    }

    async fn execute_queued(&self, operation: &QueuedOperation) -> Result<(), DataError> {
        let backend = Rc::clone(&self.backend);
        let operation = operation.clone();
        self.executor
            .execute(
                move || {
                    let backend = Rc::clone(&backend);
                    let operation = operation.clone();
                    Box::pin(async move {
                        match operation.kind {
                            OperationKind::Insert => {
                                let payload = operation.payload.as_ref().ok_or_else(|| {
                                    DataError::Permanent("insert without payload".into())
                                })?;
                                backend.insert(&operation.table, payload).await
                            }
                            OperationKind::Update => {
                                let record_id = operation.record_id.as_deref().ok_or_else(|| {
                                    DataError::Permanent("update without record id".into())
                                })?;
                                let payload = operation.payload.as_ref().ok_or_else(|| {
                                    DataError::Permanent("update without payload".into())
                                })?;
                                backend.update(&operation.table, record_id, payload).await
                            }
                            OperationKind::Delete => {
                                let record_id = operation.record_id.as_deref().ok_or_else(|| {
                                    DataError::Permanent("delete without record id".into())
                                })?;
                                backend.delete(&operation.table, record_id).await
                            }
                        }
                    })
                },
                self.max_attempts,
                self.base_delay_ms,
            )
            .await
    }

    /// Envoltura resiliente para las escrituras de página: sin conexión la
    /// operación va directa a la cola; con conexión se intenta con backoff y
    /// solo cae a la cola si el fallo ocurre ya sin conexión
    pub async fn resilient_operation<T, F>(
        &self,
        operation: F,
        fallback: Option<OperationDraft>,
    ) -> Result<WriteOutcome<T>, DataError>
    where
        F: FnMut() -> LocalBoxFuture<'static, Result<T, DataError>>,
    {
        let mut fallback = fallback;
        if !self.is_online.get() {
            if let Some(draft) = fallback.take() {
                self.enqueue(draft);
                return Ok(WriteOutcome::Queued);
            }
        }

        match self
            .executor
            .execute(operation, self.max_attempts, self.base_delay_ms)
            .await
        {
            Ok(value) => Ok(WriteOutcome::Completed(value)),
            Err(err) => {
                if !self.is_online.get() {
                    if let Some(draft) = fallback.take() {
                        log::warn!("📴 Escritura fallida sin conexión, se encola: {}", err);
                        self.enqueue(draft);
                        return Ok(WriteOutcome::Queued);
                    }
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures::executor::block_on;
    use serde_json::{json, Value};

    use super::*;
    use crate::utils::notify::RecordingNotifier;
    use crate::utils::storage::MemorySlot;
    use crate::utils::time::{ManualClock, RecordingSleeper};

    struct ScriptedBackend {
        results: RefCell<VecDeque<Result<(), DataError>>>,
        default: Result<(), DataError>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedBackend {
        fn ok() -> Rc<Self> {
            Rc::new(Self {
                results: RefCell::new(VecDeque::new()),
                default: Ok(()),
                calls: RefCell::new(Vec::new()),
            })
        }

        fn failing(err: DataError) -> Rc<Self> {
            Rc::new(Self {
                results: RefCell::new(VecDeque::new()),
                default: Err(err),
                calls: RefCell::new(Vec::new()),
            })
        }

        fn with_results(results: Vec<Result<(), DataError>>) -> Rc<Self> {
            Rc::new(Self {
                results: RefCell::new(results.into()),
                default: Ok(()),
                calls: RefCell::new(Vec::new()),
            })
        }

        fn next(&self, call: String) -> Result<(), DataError> {
            self.calls.borrow_mut().push(call);
            self.results
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| self.default.clone())
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl WriteBackend for ScriptedBackend {
        fn insert<'a>(
            &'a self,
            table: &'a str,
            _payload: &'a Value,
        ) -> LocalBoxFuture<'a, Result<(), DataError>> {
            let result = self.next(format!("insert:{}", table));
            Box::pin(futures::future::ready(result))
        }

        fn update<'a>(
            &'a self,
            table: &'a str,
            record_id: &'a str,
            _payload: &'a Value,
        ) -> LocalBoxFuture<'a, Result<(), DataError>> {
            let result = self.next(format!("update:{}:{}", table, record_id));
            Box::pin(futures::future::ready(result))
        }

        fn delete<'a>(
            &'a self,
            table: &'a str,
            record_id: &'a str,
        ) -> LocalBoxFuture<'a, Result<(), DataError>> {
            let result = self.next(format!("delete:{}:{}", table, record_id));
            Box::pin(futures::future::ready(result))
        }
    }

    struct Harness {
        manager: OfflineManager,
        backend: Rc<ScriptedBackend>,
        slot: Rc<MemorySlot>,
        clock: Rc<ManualClock>,
        notifier: Rc<RecordingNotifier>,
    }

    fn harness(backend: Rc<ScriptedBackend>, online: bool) -> Harness {
        let slot = Rc::new(MemorySlot::new());
        let clock = Rc::new(ManualClock::at(1_000));
        let notifier = Rc::new(RecordingNotifier::new());
        let manager = OfflineManager::new(
            Rc::clone(&backend) as Rc<dyn WriteBackend>,
            Rc::clone(&slot) as Rc<dyn KeyValueSlot>,
            Rc::clone(&clock) as Rc<dyn Clock>,
            Rc::new(RecordingSleeper::new()),
            Rc::clone(&notifier) as Rc<dyn Notifier>,
            OfflineOptions {
                initially_online: online,
                queue_expiry_ms: 300_000,
                max_attempts: 3,
                base_delay_ms: 1000,
            },
        );
        Harness { manager, backend, slot, clock, notifier }
    }

    #[test]
    fn drains_in_fifo_order_and_empties_store() {
        let h = harness(ScriptedBackend::ok(), true);
        h.manager.enqueue(OperationDraft::insert("income", json!({"amount": 1})));
        h.manager.enqueue(OperationDraft::update("income", "r2", json!({"amount": 2})));
        h.manager.enqueue(OperationDraft::delete("expenses", "r3"));

        let report = block_on(h.manager.drain());

        assert_eq!(report, DrainReport { synced: 3, failed: 0, pending: 0 });
        assert_eq!(
            *h.backend.calls.borrow(),
            vec!["insert:income", "update:income:r2", "delete:expenses:r3"]
        );
        assert_eq!(h.manager.pending_count(), 0);
        assert_eq!(h.slot.data.borrow().as_deref(), Some("[]"));
        assert!(h.notifier.contains("Synced 3 pending change(s)"));
    }

    #[test]
    fn young_failure_keeps_head_unchanged() {
        let h = harness(
            ScriptedBackend::failing(DataError::Transient("500".into())),
            true,
        );
        let id = h.manager.enqueue(OperationDraft::insert("income", json!({})));

        let report = block_on(h.manager.drain());

        assert_eq!(report.synced, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.pending, 1);
        let snapshot = h.manager.snapshot();
        assert_eq!(snapshot[0].id, id);
        // El ejecutor agota sus tres intentos sobre la cabeza
        assert_eq!(h.backend.call_count(), 3);
        assert!(h.notifier.contains("1 operation(s) still pending"));
    }

    #[test]
    fn auth_error_clears_entire_queue() {
        let h = harness(
            ScriptedBackend::failing(DataError::Auth("jwt expired".into())),
            true,
        );
        h.manager.enqueue(OperationDraft::insert("income", json!({})));
        h.manager.enqueue(OperationDraft::insert("income", json!({})));
        h.manager.enqueue(OperationDraft::insert("income", json!({})));

        let report = block_on(h.manager.drain());

        assert_eq!(report.pending, 0);
        assert!(h.manager.snapshot().is_empty());
        // Sin reintentos: una única llamada al backend
        assert_eq!(h.backend.call_count(), 1);
        assert!(h.notifier.contains("Please log in again"));
    }

    #[test]
    fn aged_out_operation_is_dropped_after_failing() {
        let h = harness(
            ScriptedBackend::failing(DataError::Transient("500".into())),
            true,
        );
        h.manager.enqueue(OperationDraft::insert("income", json!({})));
        h.clock.advance(301_000);

        let report = block_on(h.manager.drain());

        assert_eq!(report, DrainReport { synced: 0, failed: 1, pending: 0 });
        assert!(h.manager.snapshot().is_empty());
    }

    #[test]
    fn pass_stops_at_first_failure_preserving_order() {
        // La cabeza agota sus 3 intentos; la segunda operación ni se toca
        let h = harness(
            ScriptedBackend::with_results(vec![
                Err(DataError::Transient("500".into())),
                Err(DataError::Transient("500".into())),
                Err(DataError::Transient("500".into())),
            ]),
            true,
        );
        let first = h.manager.enqueue(OperationDraft::insert("income", json!({})));
        h.manager.enqueue(OperationDraft::insert("expenses", json!({})));

        let report = block_on(h.manager.drain());

        assert_eq!(report.pending, 2);
        assert_eq!(h.backend.call_count(), 3);
        assert_eq!(h.manager.snapshot()[0].id, first);
    }

    #[test]
    fn drain_does_nothing_while_offline() {
        let h = harness(ScriptedBackend::ok(), false);
        h.manager.enqueue(OperationDraft::insert("income", json!({})));

        let report = block_on(h.manager.drain());

        assert_eq!(report.synced, 0);
        assert_eq!(h.backend.call_count(), 0);
        assert_eq!(h.manager.pending_count(), 1);
    }

    #[test]
    fn enqueue_persists_and_reports_pending_count() {
        let h = harness(ScriptedBackend::ok(), false);
        h.manager.enqueue(OperationDraft::insert("income", json!({"amount": 5})));
        h.manager.enqueue(OperationDraft::delete("income", "r1"));

        assert!(h.notifier.contains("(2 pending)"));
        let raw = h.slot.data.borrow().clone().unwrap();
        assert!(raw.contains("\"recordId\":\"r1\""));
        assert!(raw.contains("\"kind\":\"insert\""));
    }

    #[test]
    fn status_transitions_drive_banner_and_drain() {
        let h = harness(ScriptedBackend::ok(), true);

        assert!(!h.manager.apply_status(NetworkStatus::Offline));
        assert!(h.notifier.banner_visible.get());
        assert!(!h.manager.is_online());

        assert!(h.manager.apply_status(NetworkStatus::Online));
        assert!(!h.notifier.banner_visible.get());
        assert!(h.manager.is_online());
        assert!(h.notifier.contains("Connection restored"));
    }

    #[test]
    fn starting_offline_shows_banner() {
        let h = harness(ScriptedBackend::ok(), false);
        assert!(h.notifier.banner_visible.get());
        assert!(!h.manager.is_online());
    }

    #[test]
    fn resilient_operation_queues_directly_when_offline() {
        let h = harness(ScriptedBackend::ok(), false);
        let calls = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&calls);

        let outcome: Result<WriteOutcome<()>, DataError> =
            block_on(h.manager.resilient_operation(
                move || {
                    let counter = Rc::clone(&counter);
                    Box::pin(async move {
                        counter.set(counter.get() + 1);
                        Ok(())
                    })
                },
                Some(OperationDraft::insert("income", json!({}))),
            ));

        assert!(matches!(outcome, Ok(WriteOutcome::Queued)));
        assert_eq!(calls.get(), 0);
        assert_eq!(h.manager.pending_count(), 1);
    }

    #[test]
    fn resilient_operation_completes_online() {
        let h = harness(ScriptedBackend::ok(), true);

        let outcome: Result<WriteOutcome<u32>, DataError> =
            block_on(h.manager.resilient_operation(
                || Box::pin(async { Ok(7u32) }),
                Some(OperationDraft::insert("income", json!({}))),
            ));

        assert!(matches!(outcome, Ok(WriteOutcome::Completed(7))));
        assert_eq!(h.manager.pending_count(), 0);
    }

    #[test]
    fn resilient_operation_propagates_online_failure() {
        let h = harness(ScriptedBackend::ok(), true);

        let outcome: Result<WriteOutcome<()>, DataError> =
            block_on(h.manager.resilient_operation(
                || Box::pin(async { Err(DataError::Permanent("bad request".into())) }),
                Some(OperationDraft::insert("income", json!({}))),
            ));

        assert!(outcome.is_err());
        assert_eq!(h.manager.pending_count(), 0);
    }

    #[test]
    fn queue_survives_reload_of_manager() {
        let slot = Rc::new(MemorySlot::new());
        let backend = ScriptedBackend::ok();
        let first = OfflineManager::new(
            Rc::clone(&backend) as Rc<dyn WriteBackend>,
            Rc::clone(&slot) as Rc<dyn KeyValueSlot>,
            Rc::new(ManualClock::at(1_000)),
            Rc::new(RecordingSleeper::new()),
            Rc::new(RecordingNotifier::new()),
            OfflineOptions {
                initially_online: false,
                queue_expiry_ms: 300_000,
                max_attempts: 3,
                base_delay_ms: 1000,
            },
        );
        first.enqueue(OperationDraft::insert("income", json!({"amount": 3})));
        drop(first);

        // Una "recarga de página" reconstruye el coordinador sobre la misma
        // ranura y recupera la cola
        let second = OfflineManager::new(
            Rc::clone(&backend) as Rc<dyn WriteBackend>,
            slot as Rc<dyn KeyValueSlot>,
            Rc::new(ManualClock::at(2_000)),
            Rc::new(RecordingSleeper::new()),
            Rc::new(RecordingNotifier::new()),
            OfflineOptions {
                initially_online: true,
                queue_expiry_ms: 300_000,
                max_attempts: 3,
                base_delay_ms: 1000,
            },
        );
        assert_eq!(second.pending_count(), 1);
        let report = block_on(second.drain());
        assert_eq!(report.synced, 1);
    }
}
