pub mod notifications;

pub use notifications::DomNotifier;
