pub mod cross_tab;
pub mod date_filter;
pub mod error;
pub mod network_monitor;
pub mod offline;
pub mod queue_store;
pub mod realtime;
pub mod retry;
pub mod socket;
pub mod supabase;

pub use cross_tab::CrossTabSync;
pub use date_filter::GlobalDateFilter;
pub use error::DataError;
pub use network_monitor::{NetworkMonitor, NetworkStatus};
pub use offline::{DrainReport, OfflineManager, OfflineOptions, WriteOutcome};
pub use queue_store::QueueStore;
pub use realtime::RealtimeSync;
pub use retry::BackoffExecutor;
pub use socket::RealtimeSocket;
pub use supabase::{SupabaseClient, WriteBackend};
