//! Loaded contracts
//!
//! Both contract representations, interpreted definitions and native Rust
//! contracts, end up as a [`LoadedContract`]: a name, an entry point and a
//! table of callable operations behind one dispatch interface.

use std::fmt;
use std::sync::Arc;

use gamma_program_runtime::{Result, Value};
use indexmap::IndexMap;

use crate::definition::{OperationDef, Visibility};
use crate::interpreter::NativeEnv;

/// Signature of one callable operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    /// Operation name
    pub name: String,
    /// Who may call it
    pub visibility: Visibility,
    /// Number of arguments
    pub arity: usize,
}

impl OperationSpec {
    /// Public operation taking `arity` arguments
    pub fn public(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            arity,
        }
    }

    /// Internal helper taking `arity` arguments
    pub fn internal(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Internal,
            arity,
        }
    }
}

/// A contract implemented in Rust
///
/// Native contracts declare their operation set up front and receive a
/// [`NativeEnv`] on every call. The environment exposes the same metered
/// primitives as interpreted definitions; there is no unmetered access to
/// chain state.
///
/// # Example
///
/// ```rust
/// use gamma_program_runtime::{Result, Value};
/// use gamma_vm::{NativeContract, NativeEnv, OperationSpec};
///
/// struct Echo;
///
/// impl NativeContract for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     fn operations(&self) -> Vec<OperationSpec> {
///         vec![OperationSpec::public("main", 0), OperationSpec::public("echo", 1)]
///     }
///
///     fn call(&self, operation: &str, args: Vec<Value>, env: &mut NativeEnv<'_, '_>) -> Result<Value> {
///         env.charge(10)?;
///         match operation {
///             "echo" => Ok(args.into_iter().next().unwrap_or(Value::Null)),
///             _ => env.block_hash(),
///         }
///     }
/// }
/// ```
pub trait NativeContract: Send + Sync {
    /// Contract name, also its storage namespace
    fn name(&self) -> &str;

    /// Operation run by `execute`
    fn entry_point(&self) -> &str {
        crate::definition::DEFAULT_ENTRY_POINT
    }

    /// Declared operations
    fn operations(&self) -> Vec<OperationSpec>;

    /// Run one declared operation
    ///
    /// Visibility and arity are checked before this is called.
    fn call(&self, operation: &str, args: Vec<Value>, env: &mut NativeEnv<'_, '_>) -> Result<Value>;
}

/// How a loaded contract runs its operations
#[derive(Clone)]
pub enum ContractBody {
    /// Interpreted definition, operation bodies by name
    Interpreted(IndexMap<String, OperationDef>),
    /// Native implementation
    Native(Arc<dyn NativeContract>),
}

impl fmt::Debug for ContractBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractBody::Interpreted(operations) => f
                .debug_tuple("Interpreted")
                .field(&operations.keys().collect::<Vec<_>>())
                .finish(),
            ContractBody::Native(contract) => f.debug_tuple("Native").field(&contract.name()).finish(),
        }
    }
}

/// A contract resolved into callable operations
#[derive(Debug, Clone)]
pub struct LoadedContract {
    pub(crate) name: String,
    pub(crate) entry_point: String,
    pub(crate) operations: IndexMap<String, OperationSpec>,
    pub(crate) body: ContractBody,
}

impl LoadedContract {
    /// Contract name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry point
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Signature of an operation
    pub fn operation(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.get(name)
    }

    /// All operations, in declaration order
    pub fn operations(&self) -> impl Iterator<Item = &OperationSpec> {
        self.operations.values()
    }

    /// Whether this contract runs natively
    pub fn is_native(&self) -> bool {
        matches!(self.body, ContractBody::Native(_))
    }
}

/// Named contracts reachable through cross-contract invocation
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    contracts: IndexMap<String, Arc<LoadedContract>>,
}

impl ContractRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contract; names are unique
    pub fn insert(&mut self, contract: Arc<LoadedContract>) -> Result<()> {
        if self.contracts.contains_key(contract.name()) {
            return Err(gamma_program_runtime::GammaVmError::load(format!(
                "Contract {} is already registered",
                contract.name()
            )));
        }
        self.contracts.insert(contract.name.clone(), contract);
        Ok(())
    }

    /// Look a contract up by name
    pub fn get(&self, name: &str) -> Option<&Arc<LoadedContract>> {
        self.contracts.get(name)
    }

    /// Registered names, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }

    /// Number of registered contracts
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
