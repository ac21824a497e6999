//! Store selection and construction.

use std::path::PathBuf;
use std::sync::Arc;

use rturn::{AgentConfig, InMemoryTurnStore, SessionRecord, TurnError, TurnStore};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::sqlite::{SqliteTurnStore, default_sqlite_path};

/// Turn store that also accepts session and agent records from the
/// surrounding management layer.
pub trait ManagedTurnStore: TurnStore {
    fn upsert_session(&self, session: &SessionRecord) -> Result<(), TurnError>;

    fn upsert_agent(&self, agent: &AgentConfig) -> Result<(), TurnError>;
}

impl ManagedTurnStore for SqliteTurnStore {
    fn upsert_session(&self, session: &SessionRecord) -> Result<(), TurnError> {
        Ok(self.insert_session(session)?)
    }

    fn upsert_agent(&self, agent: &AgentConfig) -> Result<(), TurnError> {
        Ok(self.insert_agent(agent)?)
    }
}

impl ManagedTurnStore for InMemoryTurnStore {
    fn upsert_session(&self, session: &SessionRecord) -> Result<(), TurnError> {
        self.insert_session(session.clone())
    }

    fn upsert_agent(&self, agent: &AgentConfig) -> Result<(), TurnError> {
        self.insert_agent(agent.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnStoreConfig {
    Sqlite { path: PathBuf },
    InMemory,
}

impl Default for TurnStoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

pub fn create_turn_store(config: TurnStoreConfig) -> Result<Arc<dyn ManagedTurnStore>, StoreError> {
    match config {
        TurnStoreConfig::Sqlite { path } => Ok(Arc::new(SqliteTurnStore::new(path)?)),
        TurnStoreConfig::InMemory => Ok(Arc::new(InMemoryTurnStore::new())),
    }
}

pub fn create_default_turn_store() -> Result<Arc<dyn ManagedTurnStore>, StoreError> {
    create_turn_store(TurnStoreConfig::default())
}
