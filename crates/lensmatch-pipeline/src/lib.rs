pub mod error;
pub mod matcher;
pub mod orchestrator;
pub mod store;
pub mod wiring;

pub use error::{PipelineError, StoreError};
pub use matcher::{AlertMatcher, MatchSummary};
pub use orchestrator::{BatchSummary, LensOutcome, Orchestrator, StoredPrices};
pub use store::{AlertStore, EventStore, MemoryStore, PgStore, SnapshotStore, Store};
pub use wiring::build_orchestrator;

/// Trailing window served by the prices endpoint.
pub const HISTORY_WINDOW_DAYS: i32 = 30;
