//! Chain-state collaborator interfaces and implementations
//!
//! The runtime never persists anything itself. Reads go through a
//! [`StorageProvider`]; every contract-initiated effect is packaged as a
//! [`StateUpdate`] and handed to a [`StateSink`], which owns persistence.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{GammaVmError, Result};
use crate::value::Value;

/// Storage provider trait
///
/// Implemented by the surrounding chain software to give contracts read
/// access to their persisted state. Keys are namespaced by contract name.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use gamma_program_runtime::storage::StorageProvider;
///
/// struct ChainStorage { /* ... */ }
///
/// impl StorageProvider for ChainStorage {
///     fn get(&self, contract: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
///         // Read from your storage backend
///         todo!()
///     }
/// }
/// ```
pub trait StorageProvider: Send + Sync {
    /// Read a value from contract storage
    ///
    /// # Returns
    /// * `Some(value)` if the key exists
    /// * `None` if the key doesn't exist
    fn get(&self, contract: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Sink receiving every state update produced by a successful execution
pub trait StateSink: Send + Sync {
    /// Forward one update to the chain-state collaborator
    fn forward_state_update(&self, update: StateUpdate) -> Result<()>;
}

/// The effect carried by a [`StateUpdate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    /// Set a storage key to an encoded value
    Write {
        /// Storage key
        key: Vec<u8>,
        /// Encoded value (see [`Value::encode`])
        value: Vec<u8>,
    },
    /// Remove a storage key
    Delete {
        /// Storage key
        key: Vec<u8>,
    },
    /// Contract-defined payload from an explicit state update call
    Payload(Value),
}

/// One contract-initiated effect, attributable to one execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Contract that produced the update
    pub contract: String,
    /// Transaction of the execution
    pub transaction_id: String,
    /// Block of the execution
    pub block_index: u64,
    /// The effect itself
    pub change: StateChange,
}

impl StateUpdate {
    /// Binary encoding for transport to the collaborator
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Inverse of [`StateUpdate::encode`]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| GammaVmError::fault(format!("Corrupt state update: {}", e)))
    }
}

/// No-op storage provider for testing
///
/// Every key reads as absent.
pub struct NoOpStorage;

impl StorageProvider for NoOpStorage {
    fn get(&self, _contract: &str, _key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// No-op state sink: accepts and drops every update
pub struct NoOpSink;

impl StateSink for NoOpSink {
    fn forward_state_update(&self, _update: StateUpdate) -> Result<()> {
        Ok(())
    }
}

/// In-memory chain state implementing both sides of the collaborator
///
/// Applies forwarded writes and deletes to a key-value map and keeps every
/// update it received, in order. Useful for tests and the runner.
#[derive(Default)]
pub struct InMemoryChainState {
    inner: Mutex<ChainStateInner>,
}

#[derive(Default)]
struct ChainStateInner {
    entries: BTreeMap<(String, Vec<u8>), Vec<u8>>,
    updates: Vec<StateUpdate>,
}

impl InMemoryChainState {
    /// Empty chain state
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a storage entry with a value
    pub fn insert(&self, contract: &str, key: &[u8], value: &Value) -> Result<()> {
        let encoded = value.encode()?;
        self.lock()?
            .entries
            .insert((contract.to_string(), key.to_vec()), encoded);
        Ok(())
    }

    /// Decoded value stored under a key, if any
    pub fn value(&self, contract: &str, key: &[u8]) -> Result<Option<Value>> {
        match self.get(contract, key)? {
            Some(bytes) => Value::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Every update received so far
    pub fn updates(&self) -> Result<Vec<StateUpdate>> {
        Ok(self.lock()?.updates.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ChainStateInner>> {
        self.inner
            .lock()
            .map_err(|_| GammaVmError::fault("Chain state lock poisoned"))
    }
}

impl StorageProvider for InMemoryChainState {
    fn get(&self, contract: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self
            .lock()?
            .entries
            .get(&(contract.to_string(), key.to_vec()))
            .cloned())
    }
}

impl StateSink for InMemoryChainState {
    fn forward_state_update(&self, update: StateUpdate) -> Result<()> {
        let mut inner = self.lock()?;
        let contract = update.contract.clone();
        match &update.change {
            StateChange::Write { key, value } => {
                inner.entries.insert((contract, key.clone()), value.clone());
            }
            StateChange::Delete { key } => {
                inner.entries.remove(&(contract, key.clone()));
            }
            StateChange::Payload(_) => {}
        }
        inner.updates.push(update);
        Ok(())
    }
}
