//! Gamma Program Runtime
//!
//! This crate provides the metering core of the Gamma contract engine: the
//! per-execution resource ledger, the sanitized execution context, the cost
//! schedule and the invocation context that ties them together.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Chain software                 │
//! │  (block/transaction processing)         │
//! └────────────────┬────────────────────────┘
//!                  │
//!                  │ ContextOptions + budget
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │         gamma-vm (engine)               │
//! │  - contract loading                     │
//! │  - interpreter                          │
//! └────────────────┬────────────────────────┘
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │   gamma-program-runtime (this crate)    │
//! │  ┌─────────────────────────────────┐    │
//! │  │    InvokeContext                │    │
//! │  │  - ResourceLedger               │    │
//! │  │  - ExecutionContext             │    │
//! │  │  - buffered storage/state       │    │
//! │  └─────────────────────────────────┘    │
//! │  ┌─────────────────────────────────┐    │
//! │  │    CostSchedule                 │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//!               │
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │         gamma-syscalls (separate)       │
//! │  - metered host functions               │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use gamma_program_runtime::{
//!     CostSchedule, ExecutionContext, InvokeContext, NoOpStorage, ResourceLedger,
//! };
//!
//! let costs = CostSchedule::default();
//! let context = ExecutionContext::new(1, "00ab", 7, "tx-1").unwrap();
//! let mut invoke_context =
//!     InvokeContext::new(ResourceLedger::new(50), context, &costs, &NoOpStorage);
//!
//! invoke_context.consume_checked(30).unwrap();
//! let err = invoke_context.consume_checked(40).unwrap_err();
//! assert_eq!((err.consumed, err.budget, err.attempted), (30, 50, 40));
//! ```

#![warn(missing_docs)]
#![deny(clippy::arithmetic_side_effects)]

pub mod context;
pub mod cost;
pub mod error;
pub mod invoke_context;
pub mod ledger;
pub mod storage;
pub mod value;

// Re-export main types
pub use context::{ContextOptions, ExecutionContext};
pub use cost::CostSchedule;
pub use error::{GammaVmError, Result};
pub use invoke_context::{
    InvocationEffects, InvokeContext, DEFAULT_MAX_CALL_DEPTH, MAX_CALL_DEPTH, MAX_NESTING_DEPTH,
};
pub use ledger::{BudgetExceeded, LedgerState, ResourceLedger};
pub use storage::{
    InMemoryChainState, NoOpSink, NoOpStorage, StateChange, StateSink, StateUpdate,
    StorageProvider,
};
pub use value::Value;
