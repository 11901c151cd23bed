//! Contract instances
//!
//! A [`ContractInstance`] is one loaded contract bound to one invocation
//! context, and therefore to one ledger. It is created by the engine for a
//! single execution and discarded afterwards.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use gamma_program_runtime::{GammaVmError, InvocationEffects, InvokeContext, Value};

use crate::contract::{ContractRegistry, LoadedContract};
use crate::interpreter::{CallOrigin, Interpreter};
use crate::outcome::{ExecutionFailure, ExecutionOutcome};

/// A contract bound to one execution
pub struct ContractInstance<'e, 'a> {
    contract: Arc<LoadedContract>,
    registry: &'e ContractRegistry,
    invoke_context: InvokeContext<'a>,
}

impl<'e, 'a> ContractInstance<'e, 'a> {
    /// Bind a contract to an invocation context
    ///
    /// `registry` is the lookup table for cross-contract invocation.
    pub fn new(
        contract: Arc<LoadedContract>,
        registry: &'e ContractRegistry,
        invoke_context: InvokeContext<'a>,
    ) -> Self {
        Self {
            contract,
            registry,
            invoke_context,
        }
    }

    /// The bound contract
    pub fn contract(&self) -> &LoadedContract {
        &self.contract
    }

    /// Run a public operation
    ///
    /// Entering the contract is free; everything the operation does is
    /// charged. Panics raised by native contract code are reported as
    /// runtime faults.
    pub fn invoke(&mut self, entry_point: &str, args: Vec<Value>) -> ExecutionOutcome {
        let contract = &self.contract;
        let registry = self.registry;
        let invoke_context = &mut self.invoke_context;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            Interpreter::new(registry, contract, invoke_context).call_operation(
                contract,
                entry_point,
                args,
                CallOrigin::Engine,
            )
        }))
        .unwrap_or_else(|payload| {
            Err(GammaVmError::fault(format!(
                "Contract panicked: {}",
                panic_message(payload.as_ref())
            )))
        });

        let ledger = self.invoke_context.ledger();
        match (result, ledger.rejection()) {
            // A budget error swallowed by native code still ends the execution
            (_, Some(rejection)) => {
                ExecutionOutcome::Failure(ExecutionFailure::from_error(
                    rejection.into(),
                    ledger.consumed(),
                    ledger.budget(),
                ))
            }
            (Ok(value), None) => ExecutionOutcome::Success {
                value,
                consumed: ledger.consumed(),
            },
            (Err(error), _) => ExecutionOutcome::Failure(ExecutionFailure::from_error(
                error,
                ledger.consumed(),
                ledger.budget(),
            )),
        }
    }

    /// Consume the instance, keeping its buffered effects
    pub fn into_effects(self) -> InvocationEffects {
        self.invoke_context.into_effects()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
