//! Gamma Syscalls
//!
//! This crate is the metering interceptor of the Gamma engine: every
//! primitive a contract may perform is implemented here, and each one
//! charges the invocation's ledger before it runs.
//!
//! # Architecture
//!
//! Each host function:
//!
//! 1. Takes `InvokeContext` as first parameter for ledger and chain access
//! 2. Takes its already-evaluated arguments as [`Value`]s
//! 3. Charges its cost from the `CostSchedule`, then executes
//! 4. Returns `Result<Value>`; a failed charge propagates as `BudgetExceeded`
//!
//! # Available Host Functions
//!
//! ## Blockchain State
//! - `block_index`, `block_hash`, `block_nonce`, `transaction_id`
//! - `contract_name` - Name of the running contract
//!
//! ## Meter
//! - `gamma_used`, `gamma_remaining`
//! - `charge` - Charge an explicit amount
//!
//! ## Strings and Bytes
//! - `concat`, `len`, `slice`, `to_string`, `to_bytes`
//!
//! ## Storage
//! - `storage_read`, `storage_write`, `storage_delete`
//!
//! ## Effects
//! - `update_state` - Queue a payload for the chain-state collaborator
//! - `log` - Record a message (echoed only in debug mode)
//!
//! # Usage
//!
//! ```rust
//! use gamma_program_runtime::{
//!     CostSchedule, ExecutionContext, InvokeContext, NoOpStorage, ResourceLedger, Value,
//! };
//! use gamma_syscalls::HostFunction;
//!
//! let costs = CostSchedule::default();
//! let context = ExecutionContext::new(1, "00ab", 7, "tx-1").unwrap();
//! let mut invoke_context =
//!     InvokeContext::new(ResourceLedger::new(1_000), context, &costs, &NoOpStorage);
//!
//! let function = HostFunction::from_name("block_hash").unwrap();
//! let hash = function.invoke(&mut invoke_context, Vec::new()).unwrap();
//! assert_eq!(hash, Value::from("00ab"));
//! ```

#![warn(missing_docs)]
#![deny(clippy::arithmetic_side_effects)]

pub mod arithmetic;
pub mod blockchain;
pub mod error;
pub mod logging;
pub mod meter;
pub mod state;
pub mod storage;
pub mod strings;

use std::fmt;

use gamma_program_runtime::{InvokeContext, Result, Value};

pub use arithmetic::{binary, unary, BinaryOp, UnaryOp};
pub use error::SyscallError;

/// Number of arguments a host function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many
    Exact(usize),
    /// This many or more
    AtLeast(usize),
}

impl Arity {
    /// Whether `count` arguments are acceptable
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// Every host function a contract can call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostFunction {
    /// Current block index
    BlockIndex,
    /// Current block hash
    BlockHash,
    /// Current block nonce
    BlockNonce,
    /// Current transaction id
    TransactionId,
    /// Name of the running contract
    ContractName,
    /// Gamma consumed so far
    GammaUsed,
    /// Gamma left
    GammaRemaining,
    /// Concatenate strings or byte strings
    Concat,
    /// Length in bytes
    Len,
    /// Byte range
    Slice,
    /// Render as string
    ToString,
    /// Convert to bytes
    ToBytes,
    /// Read contract storage
    StorageRead,
    /// Write contract storage
    StorageWrite,
    /// Delete from contract storage
    StorageDelete,
    /// Queue a state update payload
    UpdateState,
    /// Log a message
    Log,
    /// Charge an explicit amount
    Charge,
}

impl HostFunction {
    /// All host functions
    pub const ALL: [HostFunction; 18] = [
        HostFunction::BlockIndex,
        HostFunction::BlockHash,
        HostFunction::BlockNonce,
        HostFunction::TransactionId,
        HostFunction::ContractName,
        HostFunction::GammaUsed,
        HostFunction::GammaRemaining,
        HostFunction::Concat,
        HostFunction::Len,
        HostFunction::Slice,
        HostFunction::ToString,
        HostFunction::ToBytes,
        HostFunction::StorageRead,
        HostFunction::StorageWrite,
        HostFunction::StorageDelete,
        HostFunction::UpdateState,
        HostFunction::Log,
        HostFunction::Charge,
    ];

    /// Look a host function up by the name contracts use
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|function| function.name() == name)
    }

    /// Name contracts use to call this function
    pub fn name(self) -> &'static str {
        use host_names::*;
        match self {
            HostFunction::BlockIndex => BLOCK_INDEX,
            HostFunction::BlockHash => BLOCK_HASH,
            HostFunction::BlockNonce => BLOCK_NONCE,
            HostFunction::TransactionId => TRANSACTION_ID,
            HostFunction::ContractName => CONTRACT_NAME,
            HostFunction::GammaUsed => GAMMA_USED,
            HostFunction::GammaRemaining => GAMMA_REMAINING,
            HostFunction::Concat => CONCAT,
            HostFunction::Len => LEN,
            HostFunction::Slice => SLICE,
            HostFunction::ToString => TO_STRING,
            HostFunction::ToBytes => TO_BYTES,
            HostFunction::StorageRead => STORAGE_READ,
            HostFunction::StorageWrite => STORAGE_WRITE,
            HostFunction::StorageDelete => STORAGE_DELETE,
            HostFunction::UpdateState => UPDATE_STATE,
            HostFunction::Log => LOG,
            HostFunction::Charge => CHARGE,
        }
    }

    /// Arguments accepted
    pub fn arity(self) -> Arity {
        match self {
            HostFunction::BlockIndex
            | HostFunction::BlockHash
            | HostFunction::BlockNonce
            | HostFunction::TransactionId
            | HostFunction::ContractName
            | HostFunction::GammaUsed
            | HostFunction::GammaRemaining => Arity::Exact(0),
            HostFunction::Concat => Arity::AtLeast(2),
            HostFunction::Len
            | HostFunction::ToString
            | HostFunction::ToBytes
            | HostFunction::StorageRead
            | HostFunction::StorageDelete
            | HostFunction::UpdateState
            | HostFunction::Log
            | HostFunction::Charge => Arity::Exact(1),
            HostFunction::StorageWrite => Arity::Exact(2),
            HostFunction::Slice => Arity::Exact(3),
        }
    }

    /// Check the argument count without running anything
    pub fn check_arity(self, count: usize) -> std::result::Result<(), SyscallError> {
        if self.arity().accepts(count) {
            Ok(())
        } else {
            Err(SyscallError::Arity {
                function: self.name(),
                expected: self.arity().to_string(),
                got: count,
            })
        }
    }

    /// Run the host function
    pub fn invoke(self, invoke_context: &mut InvokeContext, args: Vec<Value>) -> Result<Value> {
        let count = args.len();
        self.check_arity(count)?;
        let mut args = args.into_iter();
        // Arity checked above
        let mut next = || args.next().unwrap_or(Value::Null);

        match self {
            HostFunction::BlockIndex => blockchain::block_index(invoke_context),
            HostFunction::BlockHash => blockchain::block_hash(invoke_context),
            HostFunction::BlockNonce => blockchain::block_nonce(invoke_context),
            HostFunction::TransactionId => blockchain::transaction_id(invoke_context),
            HostFunction::ContractName => blockchain::contract_name(invoke_context),
            HostFunction::GammaUsed => meter::gamma_used(invoke_context),
            HostFunction::GammaRemaining => meter::gamma_remaining(invoke_context),
            HostFunction::Charge => meter::charge(invoke_context, &next()),
            HostFunction::Concat => {
                let parts = std::iter::repeat_with(&mut next).take(count).collect();
                strings::concat(invoke_context, parts)
            }
            HostFunction::Len => strings::len(invoke_context, &next()),
            HostFunction::Slice => {
                let (value, start, end) = (next(), next(), next());
                strings::slice(invoke_context, &value, &start, &end)
            }
            HostFunction::ToString => strings::to_string(invoke_context, &next()),
            HostFunction::ToBytes => strings::to_bytes(invoke_context, next()),
            HostFunction::StorageRead => storage::storage_read(invoke_context, &next()),
            HostFunction::StorageWrite => {
                let (key, value) = (next(), next());
                storage::storage_write(invoke_context, &key, &value)
            }
            HostFunction::StorageDelete => storage::storage_delete(invoke_context, &next()),
            HostFunction::UpdateState => state::update_state(invoke_context, next()),
            HostFunction::Log => logging::log(invoke_context, &next()),
        }
    }
}

impl fmt::Display for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host function identifiers
///
/// These constants define the names contracts use to call host functions.
pub mod host_names {
    /// Current block index
    pub const BLOCK_INDEX: &str = "block_index";
    /// Current block hash
    pub const BLOCK_HASH: &str = "block_hash";
    /// Current block nonce
    pub const BLOCK_NONCE: &str = "block_nonce";
    /// Current transaction id
    pub const TRANSACTION_ID: &str = "transaction_id";
    /// Running contract name
    pub const CONTRACT_NAME: &str = "contract_name";
    /// Gamma consumed so far
    pub const GAMMA_USED: &str = "gamma_used";
    /// Gamma left
    pub const GAMMA_REMAINING: &str = "gamma_remaining";
    /// Concatenation
    pub const CONCAT: &str = "concat";
    /// Length
    pub const LEN: &str = "len";
    /// Byte range
    pub const SLICE: &str = "slice";
    /// Render as string
    pub const TO_STRING: &str = "to_string";
    /// Convert to bytes
    pub const TO_BYTES: &str = "to_bytes";
    /// Storage read
    pub const STORAGE_READ: &str = "storage_read";
    /// Storage write
    pub const STORAGE_WRITE: &str = "storage_write";
    /// Storage delete
    pub const STORAGE_DELETE: &str = "storage_delete";
    /// State update
    pub const UPDATE_STATE: &str = "update_state";
    /// Log a message
    pub const LOG: &str = "log";
    /// Explicit charge
    pub const CHARGE: &str = "charge";
}
