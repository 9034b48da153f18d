pub mod snapshot;
pub mod state_store;
pub mod store;

pub use snapshot::PersistedFormSnapshot;
pub use state_store::{FormStateStore, SaveDecision, SaveOutcome, SaveScheduler};
pub use store::{keys, MemorySessionStore, SessionStore, StorageError};
