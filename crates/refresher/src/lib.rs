//! Agora Watcher writer roles
//!
//! Provides:
//! - Curated signal and whale batches (built in or loaded from JSON)
//! - The periodic signal refresher (full replace per tick, cancellable)
//! - One-shot whale sync (upsert only, stale whales are kept)
//! - One-shot signal injector for out-of-band corrections

pub mod batch;
pub mod inject;
pub mod signals;
pub mod whales;

// Re-exports for convenience
pub use batch::{signal_from_json_file, urgent_signal, BatchError, SignalBatch, WhaleBatch};
pub use inject::{inject_signal, URGENT_SIGNAL_ID};
pub use signals::{RefreshProgress, RefreshStatus, SignalRefresher, DEFAULT_REFRESH_INTERVAL_SECS};
pub use whales::sync_whales;
