// ============================================================================
// APP - Cableado de la sincronización para la página anfitriona
// ============================================================================
// Una única instancia por pestaña, creada en el arranque y desmontada al
// descargar la página. Une el feed realtime, la señalización entre pestañas,
// el monitor de red y la cola offline.

use std::rc::Rc;

use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::window;

use crate::models::change::{table_event_name, ChangeEvent, CrossTabMessage};
use crate::models::operation::OperationDraft;
use crate::models::AuthSession;
use crate::services::error::DataError;
use crate::services::offline::{OfflineOptions, WriteOutcome};
use crate::services::{
    CrossTabSync, GlobalDateFilter, NetworkMonitor, OfflineManager, RealtimeSocket, RealtimeSync,
    SupabaseClient, WriteBackend,
};
use crate::utils::constants::OFFLINE_QUEUE_KEY;
use crate::utils::storage::LocalStorageSlot;
use crate::utils::time::{BrowserSleeper, SystemClock};
use crate::views::DomNotifier;

pub type ChangeHandler = Rc<dyn Fn(ChangeEvent)>;

/// Qué tablas sincronizar y qué callbacks de página invocar en cada cambio.
/// Ingresos y gastos van activados por defecto; activos y pasivos solo los
/// piden las páginas de balance.
pub struct SyncOptions {
    pub sync_income: bool,
    pub sync_expenses: bool,
    pub sync_assets: bool,
    pub sync_liabilities: bool,
    pub on_income_change: Option<ChangeHandler>,
    pub on_expense_change: Option<ChangeHandler>,
    pub on_asset_change: Option<ChangeHandler>,
    pub on_liability_change: Option<ChangeHandler>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sync_income: true,
            sync_expenses: true,
            sync_assets: false,
            sync_liabilities: false,
            on_income_change: None,
            on_expense_change: None,
            on_asset_change: None,
            on_liability_change: None,
        }
    }
}

pub struct App {
    supabase: Rc<SupabaseClient>,
    offline: Rc<OfflineManager>,
    monitor: NetworkMonitor,
    socket: Rc<RealtimeSocket>,
    realtime: Rc<RealtimeSync>,
    cross_tab: Rc<CrossTabSync>,
    user: AuthSession,
}

impl App {
    pub fn new(user: AuthSession) -> Self {
        let supabase = Rc::new(SupabaseClient::from_config());
        supabase.set_access_token(Some(user.access_token.clone()));

        let offline = Rc::new(OfflineManager::new(
            Rc::clone(&supabase) as Rc<dyn WriteBackend>,
            Rc::new(LocalStorageSlot::new(OFFLINE_QUEUE_KEY)),
            Rc::new(SystemClock),
            Rc::new(BrowserSleeper),
            Rc::new(DomNotifier),
            OfflineOptions::from_config(),
        ));

        let socket = Rc::new(RealtimeSocket::from_config());
        let realtime = Rc::new(RealtimeSync::new(Rc::clone(&socket)));

        Self {
            supabase,
            offline,
            monitor: NetworkMonitor::new(),
            socket,
            realtime,
            cross_tab: Rc::new(CrossTabSync::new()),
            user,
        }
    }

    /// Arranca la sincronización completa de la pestaña
    pub fn start(self: &Rc<Self>, options: SyncOptions) {
        if let Err(e) = self.socket.connect() {
            log::error!("❌ {}", e);
        }
        self.offline.attach(&self.monitor);

        let tables: [(&'static str, bool, Option<ChangeHandler>); 4] = [
            ("income", options.sync_income, options.on_income_change),
            ("expenses", options.sync_expenses, options.on_expense_change),
            ("assets", options.sync_assets, options.on_asset_change),
            ("liabilities", options.sync_liabilities, options.on_liability_change),
        ];
        for (table, enabled, handler) in tables {
            if enabled {
                self.wire_table(table, handler);
            }
        }

        self.register_teardown();

        // Cola heredada de una sesión anterior: si hay conexión se procesa ya
        if self.offline.is_online() && self.offline.pending_count() > 0 {
            let offline = Rc::clone(&self.offline);
            spawn_local(async move {
                let _ = offline.drain().await;
            });
        }

        log::info!("🚀 Sincronización inicializada para {}", self.user.user_id);
    }

    /// Conecta una tabla: cada cambio del feed se reemite a las demás
    /// pestañas y al callback de página; las señales de otras pestañas
    /// invocan el mismo callback
    fn wire_table(self: &Rc<Self>, table: &'static str, handler: Option<ChangeHandler>) {
        let event_name = table_event_name(table);

        {
            let cross_tab = Rc::clone(&self.cross_tab);
            let handler = handler.clone();
            let event_name = event_name.clone();
            let user_id = self.user.user_id.clone();
            let tab_id = self.cross_tab.tab_id().to_string();
            self.realtime.subscribe_to(table, &self.user.user_id, move |payload| {
                cross_tab.broadcast(&event_name, payload.event_type, payload.record().cloned());
                if let Some(handler) = &handler {
                    handler(ChangeEvent {
                        event_type: payload.event_type,
                        table: table.to_string(),
                        owner_user_id: user_id.clone(),
                        record: payload.record().cloned(),
                        origin_tab_id: tab_id.clone(),
                    });
                }
            });
        }

        if let Some(handler) = handler {
            let user_id = self.user.user_id.clone();
            self.cross_tab.on(&event_name, move |message: &CrossTabMessage| {
                handler(ChangeEvent {
                    event_type: message.event,
                    table: table.to_string(),
                    owner_user_id: user_id.clone(),
                    record: message.data.clone(),
                    origin_tab_id: message.tab_id.clone(),
                });
            });
        }
    }

    /// Al descargar la página se cierran los canales para no filtrar
    /// conexiones abiertas
    fn register_teardown(&self) {
        let window = match window() {
            Some(w) => w,
            None => return,
        };
        let realtime = Rc::clone(&self.realtime);
        let socket = Rc::clone(&self.socket);
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            realtime.unsubscribe_all();
            socket.disconnect();
        }) as Box<dyn FnMut(web_sys::Event)>);
        let _ = window
            .add_event_listener_with_callback("beforeunload", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    // ==========================================
    // ESCRITURAS RESILIENTES PARA LAS PÁGINAS
    // ==========================================

    pub async fn save_row(
        &self,
        table: &str,
        payload: Value,
    ) -> Result<WriteOutcome<()>, DataError> {
        let backend = Rc::clone(&self.supabase);
        let table_name = table.to_string();
        let row = payload.clone();
        self.offline
            .resilient_operation(
                move || {
                    let backend = Rc::clone(&backend);
                    let table = table_name.clone();
                    let row = row.clone();
                    Box::pin(async move { backend.insert(&table, &row).await })
                },
                Some(OperationDraft::insert(table, payload)),
            )
            .await
    }

    pub async fn update_row(
        &self,
        table: &str,
        record_id: &str,
        payload: Value,
    ) -> Result<WriteOutcome<()>, DataError> {
        let backend = Rc::clone(&self.supabase);
        let table_name = table.to_string();
        let id = record_id.to_string();
        let row = payload.clone();
        self.offline
            .resilient_operation(
                move || {
                    let backend = Rc::clone(&backend);
                    let table = table_name.clone();
                    let id = id.clone();
                    let row = row.clone();
                    Box::pin(async move { backend.update(&table, &id, &row).await })
                },
                Some(OperationDraft::update(table, record_id, payload)),
            )
            .await
    }

    pub async fn delete_row(
        &self,
        table: &str,
        record_id: &str,
    ) -> Result<WriteOutcome<()>, DataError> {
        let backend = Rc::clone(&self.supabase);
        let table_name = table.to_string();
        let id = record_id.to_string();
        self.offline
            .resilient_operation(
                move || {
                    let backend = Rc::clone(&backend);
                    let table = table_name.clone();
                    let id = id.clone();
                    Box::pin(async move { backend.delete(&table, &id).await })
                },
                Some(OperationDraft::delete(table, record_id)),
            )
            .await
    }

    /// Filas de una tabla del usuario con el filtro de fechas global aplicado
    pub async fn fetch_rows(&self, table: &str) -> Result<Vec<Value>, DataError> {
        let range = GlobalDateFilter::get().query_range();
        self.supabase
            .fetch_rows(table, &self.user.user_id, &range)
            .await
    }

    pub fn offline(&self) -> &Rc<OfflineManager> {
        &self.offline
    }

    pub fn realtime(&self) -> &Rc<RealtimeSync> {
        &self.realtime
    }

    pub fn cross_tab(&self) -> &Rc<CrossTabSync> {
        &self.cross_tab
    }

    pub fn user(&self) -> &AuthSession {
        &self.user
    }
}
