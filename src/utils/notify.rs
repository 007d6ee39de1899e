/// Superficie de notificaciones de la página. Los servicios solo conocen
/// este trait; el renderizado real vive en `views::notifications`.
pub trait Notifier {
    fn info(&self, message: &str);
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    /// Banner persistente de "sin conexión" en la parte superior de la página
    fn set_offline_banner(&self, visible: bool);
}

#[cfg(test)]
pub struct RecordingNotifier {
    pub messages: std::cell::RefCell<Vec<String>>,
    pub banner_visible: std::cell::Cell<bool>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            messages: std::cell::RefCell::new(Vec::new()),
            banner_visible: std::cell::Cell::new(false),
        }
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.messages.borrow().iter().any(|m| m.contains(fragment))
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn info(&self, message: &str) {
        self.messages.borrow_mut().push(format!("info:{}", message));
    }

    fn success(&self, message: &str) {
        self.messages.borrow_mut().push(format!("success:{}", message));
    }

    fn error(&self, message: &str) {
        self.messages.borrow_mut().push(format!("error:{}", message));
    }

    fn set_offline_banner(&self, visible: bool) {
        self.banner_visible.set(visible);
    }
}
