// ============================================================================
// FILTRO DE FECHAS GLOBAL - Persistencia y aviso al resto de la página
// ============================================================================
// El filtro activo se comparte entre páginas vía localStorage; cada cambio
// dispara un CustomEvent para que los listados se refresquen.

use chrono::{Local, NaiveDate};
use wasm_bindgen::JsValue;
use web_sys::{window, CustomEvent, CustomEventInit};

use crate::models::filter::{DateFilter, QuickRange};
use crate::utils::constants::{GLOBAL_FILTER_CHANGED_EVENT, GLOBAL_FILTER_KEY};
use crate::utils::storage::{load_from_storage, save_to_storage};

pub struct GlobalDateFilter;

impl GlobalDateFilter {
    /// Filtro activo; sin filtro guardado (o ilegible) aplica All Time
    pub fn get() -> DateFilter {
        load_from_storage(GLOBAL_FILTER_KEY).unwrap_or_default()
    }

    pub fn save(filter: &DateFilter) {
        if let Err(e) = save_to_storage(GLOBAL_FILTER_KEY, filter) {
            log::error!("❌ Error guardando el filtro global: {}", e);
            return;
        }
        Self::dispatch_changed(filter);
    }

    pub fn set_quick(range: QuickRange) -> DateFilter {
        let filter = DateFilter::quick(range, Local::now().date_naive());
        Self::save(&filter);
        filter
    }

    pub fn set_custom(start: NaiveDate, end: NaiveDate) -> DateFilter {
        let filter = DateFilter::custom(start, end);
        Self::save(&filter);
        filter
    }

    pub fn clear() -> DateFilter {
        let filter = DateFilter::all_time();
        Self::save(&filter);
        filter
    }

    pub fn display_label() -> String {
        Self::get().display_label()
    }

    fn dispatch_changed(filter: &DateFilter) {
        let window = match window() {
            Some(w) => w,
            None => return,
        };
        let init = CustomEventInit::new();
        if let Ok(json) = serde_json::to_string(filter) {
            init.set_detail(&JsValue::from_str(&json));
        }
        if let Ok(event) =
            CustomEvent::new_with_event_init_dict(GLOBAL_FILTER_CHANGED_EVENT, &init)
        {
            let _ = window.dispatch_event(&event);
        }
    }
}
