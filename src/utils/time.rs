use futures::future::LocalBoxFuture;
use gloo_timers::future::TimeoutFuture;

/// Fuente de tiempo inyectable (epoch en milisegundos)
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Reloj real del navegador
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }
}

/// Espera asíncrona inyectable, para no depender de timers reales en tests
pub trait Sleeper {
    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()>;
}

/// Espera respaldada por un timer del navegador
pub struct BrowserSleeper;

impl Sleeper for BrowserSleeper {
    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
        Box::pin(TimeoutFuture::new(ms))
    }
}

#[cfg(test)]
pub struct ManualClock {
    pub now: std::cell::Cell<i64>,
}

#[cfg(test)]
impl ManualClock {
    pub fn at(now: i64) -> Self {
        Self { now: std::cell::Cell::new(now) }
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

/// Sleeper inmediato que registra las esperas pedidas
#[cfg(test)]
pub struct RecordingSleeper {
    pub delays: std::rc::Rc<std::cell::RefCell<Vec<u32>>>,
}

#[cfg(test)]
impl RecordingSleeper {
    pub fn new() -> Self {
        Self { delays: std::rc::Rc::new(std::cell::RefCell::new(Vec::new())) }
    }
}

#[cfg(test)]
impl Sleeper for RecordingSleeper {
    fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
        self.delays.borrow_mut().push(ms);
        Box::pin(futures::future::ready(()))
    }
}
