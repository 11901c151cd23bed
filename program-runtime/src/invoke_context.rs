//! Program invocation context for Gamma VM
//!
//! One [`InvokeContext`] exists per execution. It owns the execution's
//! [`ResourceLedger`] and [`ExecutionContext`], tracks the contract call
//! stack, and buffers every contract-initiated effect until the engine
//! decides whether to forward it.

use std::collections::BTreeMap;

use crate::{
    context::ExecutionContext,
    cost::CostSchedule,
    error::{GammaVmError, Result},
    ledger::{BudgetExceeded, ResourceLedger},
    storage::{StateChange, StateUpdate, StorageProvider},
    value::Value,
};

/// Default maximum depth of nested contract calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Largest call depth an execution may be configured with
pub const MAX_CALL_DEPTH: usize = 128;

/// Maximum interpreter nesting (statements, expressions and calls) of an
/// execution, sized so the deepest execution fits a 2 MiB thread stack
pub const MAX_NESTING_DEPTH: usize = 512;

/// Program invocation context
///
/// Everything a running contract can observe or affect goes through this
/// value. It is confined to the thread running the execution.
pub struct InvokeContext<'a> {
    // === Metering ===
    /// Ledger charged by every metered primitive
    ledger: ResourceLedger,

    /// Cost of each operation category
    costs: &'a CostSchedule,

    // === Chain data ===
    /// Sanitized block/transaction data
    context: ExecutionContext,

    /// Read side of chain state
    storage: &'a dyn StorageProvider,

    // === Buffered effects ===
    /// Writes made during this execution: `Some` for values, `None` for deletions
    overlay: BTreeMap<(String, Vec<u8>), Option<Vec<u8>>>,

    /// Updates to forward on success, in the order they were produced
    pending_updates: Vec<StateUpdate>,

    /// Messages logged by contracts
    logs: Vec<String>,

    // === Call tracking ===
    /// Contracts currently executing, innermost last
    call_stack: Vec<String>,

    /// Maximum length of `call_stack`
    max_call_depth: usize,

    /// Interpreter frames currently open
    nesting: usize,

    /// Debug mode (echoes contract log messages through the `log` facade)
    pub debug_mode: bool,
}

/// Effects left behind by a finished execution
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationEffects {
    /// Gamma consumed
    pub consumed: u64,
    /// Budget of the execution
    pub budget: u64,
    /// Buffered updates, in production order
    pub state_updates: Vec<StateUpdate>,
    /// Messages logged by contracts
    pub logs: Vec<String>,
}

impl<'a> InvokeContext<'a> {
    /// Creates a new invocation context
    ///
    /// # Arguments
    /// * `ledger` - Fresh ledger for this execution
    /// * `context` - Block/transaction data for this execution
    /// * `costs` - Cost schedule used by metered primitives
    /// * `storage` - Storage provider for reads
    pub fn new(
        ledger: ResourceLedger,
        context: ExecutionContext,
        costs: &'a CostSchedule,
        storage: &'a dyn StorageProvider,
    ) -> Self {
        Self {
            ledger,
            costs,
            context,
            storage,
            overlay: BTreeMap::new(),
            pending_updates: Vec::new(),
            logs: Vec::new(),
            call_stack: Vec::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            nesting: 0,
            debug_mode: false,
        }
    }

    /// Override the maximum call depth, capped at [`MAX_CALL_DEPTH`]
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth.min(MAX_CALL_DEPTH);
        self
    }

    /// Enable debug mode
    pub fn enable_debug(&mut self) {
        self.debug_mode = true;
    }

    /// Cost schedule in effect
    pub fn costs(&self) -> &'a CostSchedule {
        self.costs
    }

    /// Block/transaction data
    pub fn execution_context(&self) -> &ExecutionContext {
        &self.context
    }

    /// The execution's ledger
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Charge the ledger
    ///
    /// Returns an error if the charge does not fit in the remaining budget.
    pub fn consume_checked(&mut self, amount: u64) -> std::result::Result<(), BudgetExceeded> {
        self.ledger.charge(amount)
    }

    /// Gamma consumed so far
    pub fn get_gamma_consumed(&self) -> u64 {
        self.ledger.consumed()
    }

    /// Gamma still available
    pub fn get_remaining(&self) -> u64 {
        self.ledger.remaining()
    }

    // === Call stack ===

    /// Push a contract onto the call stack
    pub fn enter_call(&mut self, contract: &str) -> Result<()> {
        if self.call_stack.len() >= self.max_call_depth {
            return Err(GammaVmError::fault(format!(
                "Call depth limit of {} exceeded",
                self.max_call_depth
            )));
        }
        self.call_stack.push(contract.to_string());
        Ok(())
    }

    /// Pop the innermost contract
    pub fn exit_call(&mut self) {
        self.call_stack.pop();
    }

    /// Number of active calls
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Open one interpreter frame
    ///
    /// Every nested statement, expression and call opens a frame, so the
    /// limit bounds native stack use whatever mix the contract nests.
    pub fn enter_nested(&mut self) -> Result<()> {
        if self.nesting >= MAX_NESTING_DEPTH {
            return Err(GammaVmError::fault(format!(
                "Nesting limit of {} exceeded",
                MAX_NESTING_DEPTH
            )));
        }
        self.nesting = self.nesting.saturating_add(1);
        Ok(())
    }

    /// Close the innermost interpreter frame
    pub fn exit_nested(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    /// Number of open interpreter frames
    pub fn nesting(&self) -> usize {
        self.nesting
    }

    /// Contract currently executing
    pub fn current_contract(&self) -> Result<&str> {
        self.call_stack
            .last()
            .map(String::as_str)
            .ok_or_else(|| GammaVmError::fault("No contract is executing"))
    }

    // === Storage ===

    /// Load a raw value from the current contract's storage
    ///
    /// Writes made earlier in this execution are visible.
    pub fn get_storage(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let contract = self.current_contract()?;
        if let Some(buffered) = self.overlay.get(&(contract.to_string(), key.to_vec())) {
            return Ok(buffered.clone());
        }
        self.storage.get(contract, key)
    }

    /// Store a raw value in the current contract's storage
    pub fn set_storage(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        let contract = self.current_contract()?.to_string();
        self.overlay
            .insert((contract.clone(), key.to_vec()), Some(value.clone()));
        self.push_update(
            contract,
            StateChange::Write {
                key: key.to_vec(),
                value,
            },
        );
        Ok(())
    }

    /// Delete a key from the current contract's storage
    ///
    /// Returns whether the key existed.
    pub fn delete_storage(&mut self, key: &[u8]) -> Result<bool> {
        let existed = self.get_storage(key)?.is_some();
        let contract = self.current_contract()?.to_string();
        self.overlay.insert((contract.clone(), key.to_vec()), None);
        self.push_update(contract, StateChange::Delete { key: key.to_vec() });
        Ok(existed)
    }

    // === Side channels ===

    /// Queue an explicit state update payload from the current contract
    pub fn queue_state_update(&mut self, payload: Value) -> Result<()> {
        let contract = self.current_contract()?.to_string();
        self.push_update(contract, StateChange::Payload(payload));
        Ok(())
    }

    fn push_update(&mut self, contract: String, change: StateChange) {
        self.pending_updates.push(StateUpdate {
            contract,
            transaction_id: self.context.transaction_id().to_string(),
            block_index: self.context.block_index(),
            change,
        });
    }

    /// Record a contract log message
    pub fn record_log(&mut self, message: String) {
        if self.debug_mode {
            let contract = self.call_stack.last().map(String::as_str).unwrap_or("?");
            log::info!("[Contract {}]: {}", contract, message);
        }
        self.logs.push(message);
    }

    /// Consume the context, keeping only what the engine needs afterwards
    pub fn into_effects(self) -> InvocationEffects {
        InvocationEffects {
            consumed: self.ledger.consumed(),
            budget: self.ledger.budget(),
            state_updates: self.pending_updates,
            logs: self.logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryChainState, NoOpStorage};

    fn context() -> ExecutionContext {
        ExecutionContext::new(12345, "ab12", 7, "tx-1").unwrap()
    }

    #[test]
    fn test_invoke_context_creation() {
        let costs = CostSchedule::default();
        let invoke_context =
            InvokeContext::new(ResourceLedger::new(100_000), context(), &costs, &NoOpStorage);
        assert_eq!(invoke_context.ledger().budget(), 100_000);
        assert_eq!(invoke_context.get_remaining(), 100_000);
        assert_eq!(invoke_context.get_gamma_consumed(), 0);
        assert_eq!(invoke_context.execution_context().block_index(), 12345);
        assert!(!invoke_context.debug_mode);
    }

    #[test]
    fn test_consume_checked() {
        let costs = CostSchedule::default();
        let mut invoke_context =
            InvokeContext::new(ResourceLedger::new(100), context(), &costs, &NoOpStorage);

        assert!(invoke_context.consume_checked(50).is_ok());
        assert_eq!(invoke_context.get_remaining(), 50);

        assert!(invoke_context.consume_checked(100).is_err());
        assert_eq!(invoke_context.get_remaining(), 50);

        // Terminal once rejected
        assert!(invoke_context.consume_checked(50).is_err());
        assert_eq!(invoke_context.get_gamma_consumed(), 50);
    }

    #[test]
    fn test_call_depth_limit() {
        let costs = CostSchedule::default();
        let mut invoke_context =
            InvokeContext::new(ResourceLedger::new(0), context(), &costs, &NoOpStorage)
                .with_max_call_depth(2);

        assert!(invoke_context.current_contract().is_err());
        invoke_context.enter_call("a").unwrap();
        invoke_context.enter_call("b").unwrap();
        assert_eq!(invoke_context.current_contract().unwrap(), "b");
        assert!(invoke_context.enter_call("c").is_err());

        invoke_context.exit_call();
        assert_eq!(invoke_context.current_contract().unwrap(), "a");
        assert_eq!(invoke_context.call_depth(), 1);
    }

    #[test]
    fn test_call_depth_capped() {
        let costs = CostSchedule::default();
        let mut invoke_context =
            InvokeContext::new(ResourceLedger::new(0), context(), &costs, &NoOpStorage)
                .with_max_call_depth(1_000_000);

        for _ in 0..MAX_CALL_DEPTH {
            invoke_context.enter_call("a").unwrap();
        }
        assert_eq!(
            invoke_context.enter_call("a").unwrap_err(),
            GammaVmError::fault("Call depth limit of 128 exceeded")
        );
    }

    #[test]
    fn test_nesting_limit() {
        let costs = CostSchedule::default();
        let mut invoke_context =
            InvokeContext::new(ResourceLedger::new(0), context(), &costs, &NoOpStorage);

        for _ in 0..MAX_NESTING_DEPTH {
            invoke_context.enter_nested().unwrap();
        }
        assert_eq!(
            invoke_context.enter_nested().unwrap_err(),
            GammaVmError::fault("Nesting limit of 512 exceeded")
        );
        assert_eq!(invoke_context.nesting(), MAX_NESTING_DEPTH);

        invoke_context.exit_nested();
        assert!(invoke_context.enter_nested().is_ok());

        for _ in 0..=MAX_NESTING_DEPTH {
            invoke_context.exit_nested();
        }
        assert_eq!(invoke_context.nesting(), 0);
    }

    #[test]
    fn test_storage_overlay_and_namespacing() {
        let costs = CostSchedule::default();
        let chain = InMemoryChainState::new();
        chain.insert("a", b"k", &Value::Int(1)).unwrap();
        let mut invoke_context =
            InvokeContext::new(ResourceLedger::new(0), context(), &costs, &chain);

        invoke_context.enter_call("a").unwrap();
        assert_eq!(
            invoke_context.get_storage(b"k").unwrap(),
            Some(Value::Int(1).encode().unwrap())
        );
        invoke_context.set_storage(b"k", vec![9]).unwrap();
        assert_eq!(invoke_context.get_storage(b"k").unwrap(), Some(vec![9]));

        invoke_context.enter_call("b").unwrap();
        assert_eq!(invoke_context.get_storage(b"k").unwrap(), None);
        assert!(!invoke_context.delete_storage(b"k").unwrap());
        invoke_context.exit_call();

        assert!(invoke_context.delete_storage(b"k").unwrap());
        assert_eq!(invoke_context.get_storage(b"k").unwrap(), None);

        // Nothing reached the provider
        assert_eq!(chain.value("a", b"k").unwrap(), Some(Value::Int(1)));

        let effects = invoke_context.into_effects();
        let changes: Vec<_> = effects
            .state_updates
            .iter()
            .map(|u| (u.contract.as_str(), u.change.clone()))
            .collect();
        assert_eq!(
            changes,
            vec![
                ("a", StateChange::Write { key: b"k".to_vec(), value: vec![9] }),
                ("b", StateChange::Delete { key: b"k".to_vec() }),
                ("a", StateChange::Delete { key: b"k".to_vec() }),
            ]
        );
        assert!(effects
            .state_updates
            .iter()
            .all(|u| u.transaction_id == "tx-1" && u.block_index == 12345));
    }

    #[test]
    fn test_logs_and_payloads() {
        let costs = CostSchedule::default();
        let mut invoke_context =
            InvokeContext::new(ResourceLedger::new(10), context(), &costs, &NoOpStorage);
        invoke_context.enable_debug();
        assert!(invoke_context.queue_state_update(Value::Int(1)).is_err());

        invoke_context.enter_call("c").unwrap();
        invoke_context.record_log("hello".into());
        invoke_context.queue_state_update(Value::from("p")).unwrap();
        invoke_context.consume_checked(4).unwrap();

        let effects = invoke_context.into_effects();
        assert_eq!(effects.logs, vec!["hello".to_string()]);
        assert_eq!(effects.consumed, 4);
        assert_eq!(effects.budget, 10);
        assert_eq!(effects.state_updates[0].change, StateChange::Payload(Value::from("p")));
    }
}
