//! Durable turn storage backed by SQLite.
//!
//! ```rust
//! use rprovider::ProviderId;
//! use rstore::SqliteTurnStore;
//! use rturn::{AgentConfig, SessionRecord};
//!
//! let store = SqliteTurnStore::new_in_memory().unwrap();
//! store
//!     .insert_agent(&AgentConfig::new("agent-1", "tenant-1", ProviderId::VendorA, "be brief"))
//!     .unwrap();
//! store
//!     .insert_session(&SessionRecord::new("session-1", "tenant-1", "agent-1"))
//!     .unwrap();
//! ```

mod config;
mod error;
mod sqlite;

pub mod prelude {
    pub use crate::{
        ManagedTurnStore, SqliteTurnStore, StoreError, StoreErrorKind, TurnStoreConfig,
        create_default_turn_store, create_turn_store,
    };
}

pub use config::{ManagedTurnStore, TurnStoreConfig, create_default_turn_store, create_turn_store};
pub use error::{StoreError, StoreErrorKind};
pub use sqlite::SqliteTurnStore;
