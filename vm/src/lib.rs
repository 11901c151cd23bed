//! Gamma VM
//!
//! Metered execution of untrusted contract code. Every primitive a contract
//! performs is charged against a per-execution gamma budget before it runs;
//! the first charge that would overrun the budget stops the execution.
//!
//! # Architecture
//!
//! ```text
//! ContractCode + ContextOptions + budget
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │         ExecutionEngine                 │
//! │  1. resolve contract   (LoadError)      │
//! │  2. build context      (InvalidContext) │
//! │  3. fresh ledger                        │
//! └────────────────┬────────────────────────┘
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │         ContractInstance                │
//! │  interpreter / NativeEnv                │
//! │     └─ gamma-syscalls (charge, run)     │
//! └────────────────┬────────────────────────┘
//!                  │
//!                  ▼
//!          ExecutionOutcome
//!     (+ state updates forwarded on success)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use gamma_program_runtime::{ContextOptions, Value};
//! use gamma_vm::{ContractCode, EngineConfig, ExecutionEngine};
//!
//! let engine = ExecutionEngine::new(EngineConfig::default()).unwrap();
//! let code = ContractCode::Json(
//!     r#"{
//!         "name": "greeter",
//!         "operations": [{
//!             "name": "main",
//!             "body": [{"return": {"host": {"function": "block_hash", "args": []}}}]
//!         }]
//!     }"#
//!     .to_string(),
//! );
//! let options = ContextOptions::new(10, "abc", 42, "tx1");
//!
//! let outcome = engine.execute(&code, &options, 1_000);
//! assert_eq!(outcome.value(), Some(&Value::from("abc")));
//! assert_eq!(outcome.consumed(), 10);
//! ```

#![warn(missing_docs)]
#![deny(clippy::arithmetic_side_effects)]

pub mod contract;
pub mod definition;
pub mod engine;
pub mod instance;
mod interpreter;
pub mod loader;
pub mod outcome;

// Re-export main types
pub use contract::{ContractRegistry, LoadedContract, NativeContract, OperationSpec};
pub use definition::{ContractDefinition, Expr, OperationDef, Stmt, Visibility};
pub use engine::{ContractCode, EngineConfig, ExecutionEngine};
pub use instance::ContractInstance;
pub use interpreter::NativeEnv;
pub use loader::{load_definition, load_native};
pub use outcome::{ExecutionFailure, ExecutionOutcome, FailureKind};
