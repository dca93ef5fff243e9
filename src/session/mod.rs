//! Session tickets, the store contract and its adapters.

pub mod file_store;
pub mod manager;
pub mod store;
pub mod types;


pub use file_store::FileSessionStore;
pub use manager::{SessionError, SessionManager, SessionManagerConfig};
pub use store::{InMemorySessionStore, SessionStore, StoreError};
pub use types::{CleanupOutcome, Session, SessionStats, SessionStatus};
