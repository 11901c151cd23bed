//! Contract interpreter
//!
//! Walks operation bodies and dispatches calls between operations and
//! contracts. All metering goes through `gamma_syscalls` or the
//! [`InvokeContext`] ledger; literals and variable reads are the only free
//! steps.
//!
//! Cost of each construct:
//! - `let` / assignment: `assign`, after the value is evaluated
//! - `if`: `branch`, after the condition is evaluated
//! - `while` / `for`: `loop_iteration` per iteration, before the condition or body
//! - helper call: `call`; cross-contract call: `external_call`
//! - operators and host functions: see `gamma_syscalls`
//!
//! Every statement, expression and operation call opens an interpreter frame
//! on the [`InvokeContext`]; nesting past its limit is a fault.

use std::collections::HashMap;
use std::sync::Arc;

use gamma_program_runtime::{GammaVmError, InvokeContext, Result, Value};
use gamma_syscalls::{BinaryOp, HostFunction};

use crate::contract::{ContractBody, ContractRegistry, LoadedContract};
use crate::definition::{Expr, OperationDef, Stmt, Visibility};

/// Where a call comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallOrigin {
    /// The engine entering the contract
    Engine,
    /// An operation of the same contract
    Internal,
    /// Another contract
    External,
}

enum Flow {
    Next,
    Return(Value),
}

type Frame = HashMap<String, Value>;

pub(crate) struct Interpreter<'e, 'a> {
    registry: &'e ContractRegistry,
    root: &'e Arc<LoadedContract>,
    invoke_context: &'e mut InvokeContext<'a>,
}

impl<'e, 'a> Interpreter<'e, 'a> {
    pub(crate) fn new(
        registry: &'e ContractRegistry,
        root: &'e Arc<LoadedContract>,
        invoke_context: &'e mut InvokeContext<'a>,
    ) -> Self {
        Self {
            registry,
            root,
            invoke_context,
        }
    }

    fn reborrow(&mut self) -> Interpreter<'_, 'a> {
        Interpreter {
            registry: self.registry,
            root: self.root,
            invoke_context: &mut *self.invoke_context,
        }
    }

    fn charge(&mut self, amount: u64) -> Result<()> {
        self.invoke_context.consume_checked(amount)?;
        Ok(())
    }

    fn resolve(&self, name: &str) -> Option<Arc<LoadedContract>> {
        if self.root.name() == name {
            return Some(Arc::clone(self.root));
        }
        self.registry.get(name).cloned()
    }

    /// Run one operation of `contract`
    ///
    /// Checks existence, visibility and arity, then tracks the call on the
    /// call stack for the duration of the operation.
    pub(crate) fn call_operation(
        &mut self,
        contract: &Arc<LoadedContract>,
        operation: &str,
        args: Vec<Value>,
        origin: CallOrigin,
    ) -> Result<Value> {
        self.invoke_context.enter_nested()?;
        let result = self.call_operation_inner(contract, operation, args, origin);
        self.invoke_context.exit_nested();
        result
    }

    fn call_operation_inner(
        &mut self,
        contract: &Arc<LoadedContract>,
        operation: &str,
        args: Vec<Value>,
        origin: CallOrigin,
    ) -> Result<Value> {
        let spec = contract.operation(operation).ok_or_else(|| {
            GammaVmError::fault(format!(
                "Contract {} has no operation {}",
                contract.name(),
                operation
            ))
        })?;
        if spec.visibility == Visibility::Internal && origin != CallOrigin::Internal {
            return Err(GammaVmError::fault(format!(
                "Operation {} of contract {} is internal",
                operation,
                contract.name()
            )));
        }
        if spec.arity != args.len() {
            return Err(GammaVmError::fault(format!(
                "Operation {} of contract {} expects {} arguments, got {}",
                operation,
                contract.name(),
                spec.arity,
                args.len()
            )));
        }

        self.invoke_context.enter_call(contract.name())?;
        let result = match &contract.body {
            ContractBody::Interpreted(bodies) => match bodies.get(operation) {
                Some(def) => self.run_operation(contract, def, args),
                None => Err(GammaVmError::fault(format!(
                    "Operation {} has no body",
                    operation
                ))),
            },
            ContractBody::Native(native) => {
                let mut env = NativeEnv {
                    interpreter: self.reborrow(),
                    contract: Arc::clone(contract),
                };
                native.call(operation, args, &mut env)
            }
        };
        self.invoke_context.exit_call();
        result
    }

    fn call_helper(
        &mut self,
        contract: &Arc<LoadedContract>,
        operation: &str,
        args: Vec<Value>,
    ) -> Result<Value> {
        let cost = self.invoke_context.costs().call;
        self.charge(cost)?;
        self.call_operation(contract, operation, args, CallOrigin::Internal)
    }

    fn call_external(&mut self, contract: &str, operation: &str, args: Vec<Value>) -> Result<Value> {
        let cost = self.invoke_context.costs().external_call;
        self.charge(cost)?;
        let target = self
            .resolve(contract)
            .ok_or_else(|| GammaVmError::fault(format!("Unknown contract {}", contract)))?;
        self.call_operation(&target, operation, args, CallOrigin::External)
    }

    fn run_operation(
        &mut self,
        contract: &Arc<LoadedContract>,
        def: &OperationDef,
        args: Vec<Value>,
    ) -> Result<Value> {
        let mut frame: Frame = def.params.iter().cloned().zip(args).collect();
        match self.block(contract, &def.body, &mut frame)? {
            Flow::Return(value) => Ok(value),
            Flow::Next => Ok(Value::Null),
        }
    }

    fn block(&mut self, contract: &Arc<LoadedContract>, body: &[Stmt], frame: &mut Frame) -> Result<Flow> {
        for stmt in body {
            if let Flow::Return(value) = self.stmt(contract, stmt, frame)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Next)
    }

    fn stmt(&mut self, contract: &Arc<LoadedContract>, stmt: &Stmt, frame: &mut Frame) -> Result<Flow> {
        self.invoke_context.enter_nested()?;
        let flow = self.stmt_inner(contract, stmt, frame);
        self.invoke_context.exit_nested();
        flow
    }

    fn stmt_inner(&mut self, contract: &Arc<LoadedContract>, stmt: &Stmt, frame: &mut Frame) -> Result<Flow> {
        let costs = self.invoke_context.costs();
        match stmt {
            Stmt::Let { name, value } => {
                let value = self.eval(contract, value, frame)?;
                self.charge(costs.assign)?;
                frame.insert(name.clone(), value);
            }
            Stmt::Assign { name, value } => {
                let value = self.eval(contract, value, frame)?;
                self.charge(costs.assign)?;
                let slot = frame.get_mut(name).ok_or_else(|| {
                    GammaVmError::fault(format!("Assignment to unbound variable {}", name))
                })?;
                *slot = value;
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.eval(contract, cond, frame)?;
                self.charge(costs.branch)?;
                let branch = if cond.as_bool("if condition")? {
                    then
                } else {
                    otherwise
                };
                return self.block(contract, branch, frame);
            }
            Stmt::While { cond, body } => loop {
                self.charge(costs.loop_iteration)?;
                if !self.eval(contract, cond, frame)?.as_bool("while condition")? {
                    break;
                }
                if let Flow::Return(value) = self.block(contract, body, frame)? {
                    return Ok(Flow::Return(value));
                }
            },
            Stmt::For {
                var,
                from,
                to,
                body,
            } => {
                let mut current = self.eval(contract, from, frame)?.as_int("for start")?;
                let end = self.eval(contract, to, frame)?.as_int("for end")?;
                while current < end {
                    self.charge(costs.loop_iteration)?;
                    frame.insert(var.clone(), Value::Int(current));
                    if let Flow::Return(value) = self.block(contract, body, frame)? {
                        return Ok(Flow::Return(value));
                    }
                    current = current.saturating_add(1);
                }
            }
            Stmt::Return(expr) => return Ok(Flow::Return(self.eval(contract, expr, frame)?)),
            Stmt::Expr(expr) => {
                self.eval(contract, expr, frame)?;
            }
            Stmt::Fail(expr) => {
                let message = self.eval(contract, expr, frame)?;
                return Err(GammaVmError::fault(format!("Contract failed: {}", message)));
            }
        }
        Ok(Flow::Next)
    }

    fn eval(&mut self, contract: &Arc<LoadedContract>, expr: &Expr, frame: &Frame) -> Result<Value> {
        self.invoke_context.enter_nested()?;
        let value = self.eval_inner(contract, expr, frame);
        self.invoke_context.exit_nested();
        value
    }

    fn eval_inner(&mut self, contract: &Arc<LoadedContract>, expr: &Expr, frame: &Frame) -> Result<Value> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Str(s) => Ok(Value::Str(Arc::clone(s))),
            Expr::Bytes(b) => Ok(Value::Bytes(Arc::clone(b))),
            Expr::Var(name) => frame
                .get(name)
                .cloned()
                .ok_or_else(|| GammaVmError::fault(format!("Undefined variable {}", name))),
            Expr::Unary { op, expr } => {
                let operand = self.eval(contract, expr, frame)?;
                gamma_syscalls::unary(self.invoke_context, *op, operand)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(contract, lhs, frame)?;
                let rhs = self.eval(contract, rhs, frame)?;
                gamma_syscalls::binary(self.invoke_context, *op, lhs, rhs)
            }
            Expr::Call { operation, args } => {
                let args = self.eval_all(contract, args, frame)?;
                self.call_helper(contract, operation, args)
            }
            Expr::Invoke {
                contract: target,
                operation,
                args,
            } => {
                let args = self.eval_all(contract, args, frame)?;
                self.call_external(target, operation, args)
            }
            Expr::Host { function, args } => {
                let args = self.eval_all(contract, args, frame)?;
                let host = HostFunction::from_name(function).ok_or_else(|| {
                    GammaVmError::fault(format!("Unknown host function {}", function))
                })?;
                host.invoke(self.invoke_context, args)
            }
        }
    }

    fn eval_all(&mut self, contract: &Arc<LoadedContract>, exprs: &[Expr], frame: &Frame) -> Result<Vec<Value>> {
        exprs
            .iter()
            .map(|expr| self.eval(contract, expr, frame))
            .collect()
    }
}

/// Metered environment handed to native contracts
///
/// Every method charges the same cost as the equivalent construct in an
/// interpreted definition.
pub struct NativeEnv<'e, 'a> {
    interpreter: Interpreter<'e, 'a>,
    contract: Arc<LoadedContract>,
}

impl NativeEnv<'_, '_> {
    /// Name of the running contract
    pub fn contract_name(&self) -> &str {
        self.contract.name()
    }

    /// Charge exactly `amount` gamma
    pub fn charge(&mut self, amount: u64) -> Result<()> {
        self.interpreter.charge(amount)
    }

    /// Call any host function by its identifier
    pub fn host(&mut self, function: HostFunction, args: Vec<Value>) -> Result<Value> {
        function.invoke(self.interpreter.invoke_context, args)
    }

    /// Apply a binary operator
    pub fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
        gamma_syscalls::binary(self.interpreter.invoke_context, op, lhs, rhs)
    }

    /// Call another operation of this contract, internal ones included
    pub fn call(&mut self, operation: &str, args: Vec<Value>) -> Result<Value> {
        let contract = Arc::clone(&self.contract);
        self.interpreter.call_helper(&contract, operation, args)
    }

    /// Call a public operation of another contract
    pub fn invoke(&mut self, contract: &str, operation: &str, args: Vec<Value>) -> Result<Value> {
        self.interpreter.call_external(contract, operation, args)
    }

    /// Current block index
    pub fn block_index(&mut self) -> Result<Value> {
        self.host(HostFunction::BlockIndex, Vec::new())
    }

    /// Current block hash
    pub fn block_hash(&mut self) -> Result<Value> {
        self.host(HostFunction::BlockHash, Vec::new())
    }

    /// Current block nonce
    pub fn block_nonce(&mut self) -> Result<Value> {
        self.host(HostFunction::BlockNonce, Vec::new())
    }

    /// Current transaction id
    pub fn transaction_id(&mut self) -> Result<Value> {
        self.host(HostFunction::TransactionId, Vec::new())
    }

    /// Read from this contract's storage; missing keys read as `null`
    pub fn storage_read(&mut self, key: impl Into<Value>) -> Result<Value> {
        self.host(HostFunction::StorageRead, vec![key.into()])
    }

    /// Write to this contract's storage
    pub fn storage_write(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        self.host(HostFunction::StorageWrite, vec![key.into(), value.into()])?;
        Ok(())
    }

    /// Delete from this contract's storage, returning whether the key existed
    pub fn storage_delete(&mut self, key: impl Into<Value>) -> Result<bool> {
        self.host(HostFunction::StorageDelete, vec![key.into()])?
            .as_bool("storage_delete result")
    }

    /// Queue a state update payload
    pub fn update_state(&mut self, payload: impl Into<Value>) -> Result<()> {
        self.host(HostFunction::UpdateState, vec![payload.into()])?;
        Ok(())
    }

    /// Log a message
    pub fn log(&mut self, message: impl Into<Value>) -> Result<()> {
        self.host(HostFunction::Log, vec![message.into()])?;
        Ok(())
    }

    /// Gamma left, after paying for this query
    pub fn gamma_remaining(&mut self) -> Result<u64> {
        let remaining = self.host(HostFunction::GammaRemaining, Vec::new())?;
        let remaining = remaining.as_int("gamma_remaining")?;
        u64::try_from(remaining).map_err(|_| GammaVmError::fault("Negative gamma_remaining"))
    }
}
