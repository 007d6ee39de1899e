pub mod auth;
pub mod change;
pub mod filter;
pub mod operation;

pub use auth::AuthSession;
pub use change::{table_event_name, ChangeEvent, ChangeType, CrossTabMessage, RealtimePayload};
pub use filter::{DateFilter, QueryRange, QuickRange};
pub use operation::{OperationDraft, OperationKind, QueuedOperation};
