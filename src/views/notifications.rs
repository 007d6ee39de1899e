// ============================================================================
// NOTIFICACIONES - Toasts transitorios y banner de sin conexión
// ============================================================================

use gloo_timers::callback::Timeout;
use web_sys::{window, Document, HtmlElement};

use crate::utils::notify::Notifier;

const OFFLINE_BANNER_ID: &str = "offline-banner";
/// Altura reservada para el banner en la parte superior de la página
const BANNER_PADDING: &str = "48px";

fn document() -> Option<Document> {
    window()?.document()
}

fn body() -> Option<HtmlElement> {
    document()?.body()
}

fn show_toast(message: &str, color_classes: &str, duration_ms: u32) {
    let document = match document() {
        Some(d) => d,
        None => return,
    };
    let body = match document.body() {
        Some(b) => b,
        None => return,
    };
    let toast = match document.create_element("div") {
        Ok(element) => element,
        Err(_) => return,
    };
    toast.set_class_name(&format!(
        "fixed bottom-4 right-4 z-50 {} text-white px-4 py-3 rounded-lg shadow-lg",
        color_classes
    ));
    toast.set_text_content(Some(message));
    if body.append_child(&toast).is_err() {
        return;
    }

    Timeout::new(duration_ms, move || {
        toast.remove();
    })
    .forget();
}

pub fn show_info_message(message: &str) {
    show_toast(message, "bg-blue-500", 3_000);
}

pub fn show_success_message(message: &str) {
    show_toast(message, "bg-green-500", 3_000);
}

pub fn show_error_message(message: &str) {
    show_toast(message, "bg-red-500", 4_000);
}

/// Banner persistente mientras no hay conexión; reserva hueco arriba para
/// no tapar el contenido
pub fn show_offline_banner() {
    hide_offline_banner();

    let document = match document() {
        Some(d) => d,
        None => return,
    };
    let body = match document.body() {
        Some(b) => b,
        None => return,
    };
    let banner = match document.create_element("div") {
        Ok(element) => element,
        Err(_) => return,
    };
    banner.set_id(OFFLINE_BANNER_ID);
    banner.set_class_name(
        "fixed top-0 left-0 right-0 bg-yellow-500 text-white px-4 py-3 text-center z-50 shadow-lg",
    );
    banner.set_inner_html(
        "<span class=\"font-semibold\">You're offline</span> \
         <span class=\"hidden sm:inline\">- Changes may not be saved until connection is restored</span>",
    );

    if body.prepend_with_node_1(&banner).is_err() {
        return;
    }
    let _ = body.style().set_property("padding-top", BANNER_PADDING);
}

pub fn hide_offline_banner() {
    let document = match document() {
        Some(d) => d,
        None => return,
    };
    if let Some(banner) = document.get_element_by_id(OFFLINE_BANNER_ID) {
        banner.remove();
        if let Some(body) = body() {
            let _ = body.style().set_property("padding-top", "0");
        }
    }
}

/// Notifier real de la página
pub struct DomNotifier;

impl Notifier for DomNotifier {
    fn info(&self, message: &str) {
        show_info_message(message);
    }

    fn success(&self, message: &str) {
        show_success_message(message);
    }

    fn error(&self, message: &str) {
        show_error_message(message);
    }

    fn set_offline_banner(&self, visible: bool) {
        if visible {
            show_offline_banner();
        } else {
            hide_offline_banner();
        }
    }
}
