//! Execution engine
//!
//! The engine is the only entry point for running contracts. For every
//! execution it resolves the contract, builds a fresh execution context and
//! ledger, runs the requested operation and forwards the buffered effects
//! if the execution succeeded.

use std::sync::Arc;

use gamma_program_runtime::{
    ContextOptions, CostSchedule, ExecutionContext, GammaVmError, InvokeContext, NoOpSink,
    NoOpStorage, ResourceLedger, Result, StateSink, StateUpdate, StorageProvider, Value,
    DEFAULT_MAX_CALL_DEPTH, MAX_CALL_DEPTH,
};
use serde::{Deserialize, Serialize};

use crate::contract::{ContractRegistry, LoadedContract, NativeContract};
use crate::definition::ContractDefinition;
use crate::instance::ContractInstance;
use crate::loader::{load_definition, load_native};
use crate::outcome::{ExecutionFailure, ExecutionOutcome};

/// Engine configuration
///
/// Every field has a default, so a configuration file only needs the
/// fields it changes:
///
/// ```rust
/// use gamma_vm::EngineConfig;
///
/// let config = EngineConfig {
///     debug_mode: true,
///     ..EngineConfig::default()
/// };
/// assert_eq!(config.max_call_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum depth of nested operation calls, at most [`MAX_CALL_DEPTH`]
    pub max_call_depth: usize,
    /// Echo contract log messages through the `log` facade
    pub debug_mode: bool,
    /// Gamma cost of every operation category
    pub costs: CostSchedule,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            debug_mode: false,
            costs: CostSchedule::default(),
        }
    }
}

impl EngineConfig {
    /// Reject configurations that would let contracts run unmetered or
    /// recurse past the native stack
    pub fn validate(&self) -> Result<()> {
        if self.costs.loop_iteration == 0 {
            return Err(GammaVmError::InvalidConfig(
                "loop_iteration cost must be non-zero".into(),
            ));
        }
        if self.max_call_depth == 0 {
            return Err(GammaVmError::InvalidConfig(
                "max_call_depth must be at least 1".into(),
            ));
        }
        if self.max_call_depth > MAX_CALL_DEPTH {
            return Err(GammaVmError::InvalidConfig(format!(
                "max_call_depth must be at most {}",
                MAX_CALL_DEPTH
            )));
        }
        Ok(())
    }
}

/// Contract code handed to the engine
#[derive(Clone)]
pub enum ContractCode {
    /// Definition as JSON text
    Json(String),
    /// Already parsed definition
    Definition(ContractDefinition),
    /// Native contract
    Native(Arc<dyn NativeContract>),
    /// Name of a contract registered with the engine
    Registered(String),
}

impl std::fmt::Debug for ContractCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractCode::Json(json) => f.debug_tuple("Json").field(&json.len()).finish(),
            ContractCode::Definition(definition) => {
                f.debug_tuple("Definition").field(&definition.name).finish()
            }
            ContractCode::Native(contract) => f.debug_tuple("Native").field(&contract.name()).finish(),
            ContractCode::Registered(name) => f.debug_tuple("Registered").field(name).finish(),
        }
    }
}

/// Metered contract execution engine
///
/// `execute` takes `&self`: one engine can serve concurrent executions from
/// several threads. Executions share the registry and the collaborators,
/// never a ledger or a context.
pub struct ExecutionEngine {
    config: EngineConfig,
    registry: ContractRegistry,
    storage: Arc<dyn StorageProvider>,
    sink: Arc<dyn StateSink>,
}

impl ExecutionEngine {
    /// Create an engine with no chain state attached
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: ContractRegistry::new(),
            storage: Arc::new(NoOpStorage),
            sink: Arc::new(NoOpSink),
        })
    }

    /// Read side of chain state
    pub fn with_storage(mut self, storage: Arc<dyn StorageProvider>) -> Self {
        self.storage = storage;
        self
    }

    /// Write side of chain state
    pub fn with_state_sink(mut self, sink: Arc<dyn StateSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered contracts
    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    /// Register a contract for cross-contract invocation
    ///
    /// Returns the registered name.
    pub fn register(&mut self, code: ContractCode) -> Result<String> {
        if let ContractCode::Registered(name) = &code {
            return Err(GammaVmError::load(format!(
                "Contract {} is a reference, not code",
                name
            )));
        }
        let contract = self.resolve(&code)?;
        let name = contract.name().to_string();
        self.registry.insert(contract)?;
        log::debug!("registered contract {}", name);
        Ok(name)
    }

    fn resolve(&self, code: &ContractCode) -> Result<Arc<LoadedContract>> {
        match code {
            ContractCode::Json(json) => {
                let definition = ContractDefinition::from_json(json)?;
                Ok(Arc::new(load_definition(definition)?))
            }
            ContractCode::Definition(definition) => Ok(Arc::new(load_definition(definition.clone())?)),
            ContractCode::Native(contract) => Ok(Arc::new(load_native(Arc::clone(contract))?)),
            ContractCode::Registered(name) => self
                .registry
                .get(name)
                .cloned()
                .ok_or_else(|| GammaVmError::load(format!("No contract registered as {}", name))),
        }
    }

    /// Run the contract's entry point with no arguments
    pub fn execute(&self, code: &ContractCode, options: &ContextOptions, budget: u64) -> ExecutionOutcome {
        self.run(code, options, budget, None, Vec::new())
    }

    /// Run a named public operation
    pub fn execute_call(
        &self,
        code: &ContractCode,
        options: &ContextOptions,
        budget: u64,
        operation: &str,
        args: Vec<Value>,
    ) -> ExecutionOutcome {
        self.run(code, options, budget, Some(operation), args)
    }

    /// Hand one update to the chain-state collaborator
    pub fn forward_state_update(&self, update: StateUpdate) -> Result<()> {
        log::trace!(
            "forwarding state update from {} (tx {})",
            update.contract,
            update.transaction_id
        );
        self.sink.forward_state_update(update)
    }

    fn run(
        &self,
        code: &ContractCode,
        options: &ContextOptions,
        budget: u64,
        operation: Option<&str>,
        args: Vec<Value>,
    ) -> ExecutionOutcome {
        // Nothing is charged or constructed before the contract resolves
        let contract = match self.resolve(code) {
            Ok(contract) => contract,
            Err(error) => return self.rejected(error, budget),
        };
        let context = match ExecutionContext::from_options(options) {
            Ok(context) => context,
            Err(error) => return self.rejected(error, budget),
        };

        let operation = operation.unwrap_or(contract.entry_point()).to_string();
        log::debug!(
            "executing {}.{} with budget {} (tx {})",
            contract.name(),
            operation,
            budget,
            context.transaction_id()
        );

        let mut invoke_context = InvokeContext::new(
            ResourceLedger::new(budget),
            context,
            &self.config.costs,
            self.storage.as_ref(),
        )
        .with_max_call_depth(self.config.max_call_depth);
        if self.config.debug_mode {
            invoke_context.enable_debug();
        }

        let mut instance = ContractInstance::new(contract, &self.registry, invoke_context);
        let outcome = instance.invoke(&operation, args);
        let effects = instance.into_effects();

        let outcome = match outcome {
            ExecutionOutcome::Success { value, consumed } => {
                match effects
                    .state_updates
                    .into_iter()
                    .try_for_each(|update| self.forward_state_update(update))
                {
                    Ok(()) => ExecutionOutcome::Success { value, consumed },
                    Err(error) => ExecutionOutcome::Failure(ExecutionFailure::from_error(
                        GammaVmError::fault(format!("State update rejected: {}", error)),
                        consumed,
                        budget,
                    )),
                }
            }
            failure => {
                if !effects.state_updates.is_empty() {
                    log::debug!(
                        "discarding {} buffered state updates",
                        effects.state_updates.len()
                    );
                }
                failure
            }
        };

        match outcome.failure() {
            None => log::debug!("execution succeeded, consumed {}", outcome.consumed()),
            Some(failure) => log::warn!("execution failed: {}", failure),
        }
        outcome
    }

    fn rejected(&self, error: GammaVmError, budget: u64) -> ExecutionOutcome {
        let failure = ExecutionFailure::from_error(error, 0, budget);
        log::warn!("execution rejected: {}", failure);
        ExecutionOutcome::Failure(failure)
    }
}
