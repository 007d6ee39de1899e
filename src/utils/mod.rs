// Utils compartidos

pub mod constants;
pub mod notify;
pub mod pagination;
pub mod storage;
pub mod time;

pub use constants::*;
pub use notify::Notifier;
pub use pagination::{PageInfo, Pagination};
pub use time::{BrowserSleeper, Clock, Sleeper, SystemClock};
