//! Gamma cost schedule
//!
//! Maps every operation category a contract can perform to a static cost.
//! The ledger only knows amounts; this table is the single place where
//! "what costs how much" is decided.

use serde::{Deserialize, Serialize};

/// Default cost of an arithmetic, comparison or logic operator
pub const ARITHMETIC_COST: u64 = 3;
/// Default cost of evaluating a conditional branch
pub const BRANCH_COST: u64 = 1;
/// Default cost of binding or assigning a variable
pub const ASSIGN_COST: u64 = 1;
/// Default cost of one loop iteration
pub const LOOP_ITERATION_COST: u64 = 5;
/// Default cost of calling a helper in the same contract
pub const CALL_COST: u64 = 20;
/// Default cost of invoking another contract
pub const EXTERNAL_CALL_COST: u64 = 700;
/// Default cost of reading block/transaction data or meter state
pub const CONTEXT_READ_COST: u64 = 10;

/// Default base cost of a storage read
pub const STORAGE_READ_BASE_COST: u64 = 200;
/// Default per-byte cost of a storage read
pub const STORAGE_READ_BYTE_COST: u64 = 1;
/// Default base cost of a storage write
pub const STORAGE_WRITE_BASE_COST: u64 = 500;
/// Default per-byte cost of a storage write
pub const STORAGE_WRITE_BYTE_COST: u64 = 2;
/// Default cost of a storage delete
pub const STORAGE_DELETE_COST: u64 = 300;

/// Default base cost of a string/byte operation
pub const STRING_BASE_COST: u64 = 5;
/// Default per-byte cost of a string/byte operation
pub const STRING_BYTE_COST: u64 = 1;

/// Default base cost of a contract log message
pub const LOG_BASE_COST: u64 = 100;
/// Default per-byte cost of a contract log message
pub const LOG_BYTE_COST: u64 = 1;

/// Default base cost of forwarding a state update
pub const STATE_UPDATE_BASE_COST: u64 = 500;
/// Default per-byte cost of forwarding a state update
pub const STATE_UPDATE_BYTE_COST: u64 = 2;

/// Static cost of every operation category, in gamma
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostSchedule {
    /// Arithmetic, comparison and logic operators
    pub arithmetic: u64,
    /// `if` condition evaluation
    pub branch: u64,
    /// `let` and assignment
    pub assign: u64,
    /// Each iteration of `while`/`for`
    pub loop_iteration: u64,
    /// Helper call inside the same contract
    pub call: u64,
    /// Invocation of another contract
    pub external_call: u64,
    /// Block/transaction data and meter queries
    pub context_read: u64,
    /// Storage read, fixed part
    pub storage_read_base: u64,
    /// Storage read, per byte of the stored value
    pub storage_read_byte: u64,
    /// Storage write, fixed part
    pub storage_write_base: u64,
    /// Storage write, per byte of the encoded value
    pub storage_write_byte: u64,
    /// Storage delete
    pub storage_delete: u64,
    /// String/byte operation, fixed part
    pub string_base: u64,
    /// String/byte operation, per byte handled
    pub string_byte: u64,
    /// Log message, fixed part
    pub log_base: u64,
    /// Log message, per byte
    pub log_byte: u64,
    /// State update forward, fixed part
    pub state_update_base: u64,
    /// State update forward, per byte of the encoded payload
    pub state_update_byte: u64,
}

impl Default for CostSchedule {
    fn default() -> Self {
        Self {
            arithmetic: ARITHMETIC_COST,
            branch: BRANCH_COST,
            assign: ASSIGN_COST,
            loop_iteration: LOOP_ITERATION_COST,
            call: CALL_COST,
            external_call: EXTERNAL_CALL_COST,
            context_read: CONTEXT_READ_COST,
            storage_read_base: STORAGE_READ_BASE_COST,
            storage_read_byte: STORAGE_READ_BYTE_COST,
            storage_write_base: STORAGE_WRITE_BASE_COST,
            storage_write_byte: STORAGE_WRITE_BYTE_COST,
            storage_delete: STORAGE_DELETE_COST,
            string_base: STRING_BASE_COST,
            string_byte: STRING_BYTE_COST,
            log_base: LOG_BASE_COST,
            log_byte: LOG_BYTE_COST,
            state_update_base: STATE_UPDATE_BASE_COST,
            state_update_byte: STATE_UPDATE_BYTE_COST,
        }
    }
}

impl CostSchedule {
    /// `base + len * per_byte`, saturating
    pub fn sized(base: u64, per_byte: u64, len: usize) -> u64 {
        let len = u64::try_from(len).unwrap_or(u64::MAX);
        base.saturating_add(len.saturating_mul(per_byte))
    }

    /// Cost of a storage read returning `len` bytes
    pub fn storage_read(&self, len: usize) -> u64 {
        Self::sized(self.storage_read_base, self.storage_read_byte, len)
    }

    /// Cost of a storage write of `len` encoded bytes
    pub fn storage_write(&self, len: usize) -> u64 {
        Self::sized(self.storage_write_base, self.storage_write_byte, len)
    }

    /// Cost of a string/byte operation handling `len` bytes
    pub fn string_op(&self, len: usize) -> u64 {
        Self::sized(self.string_base, self.string_byte, len)
    }

    /// Cost of logging a `len`-byte message
    pub fn log(&self, len: usize) -> u64 {
        Self::sized(self.log_base, self.log_byte, len)
    }

    /// Cost of forwarding a `len`-byte state update payload
    pub fn state_update(&self, len: usize) -> u64 {
        Self::sized(self.state_update_base, self.state_update_byte, len)
    }
}
