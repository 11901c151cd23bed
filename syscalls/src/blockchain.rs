//! Blockchain state host functions
//!
//! Read-only access to the execution context: block index, block hash,
//! block nonce, transaction id and the name of the running contract.

use gamma_program_runtime::{InvokeContext, Result, Value};

use crate::error::SyscallError;

fn charge_read(invoke_context: &mut InvokeContext) -> Result<()> {
    invoke_context.consume_checked(invoke_context.costs().context_read)?;
    Ok(())
}

/// Index of the current block
pub fn block_index(invoke_context: &mut InvokeContext) -> Result<Value> {
    charge_read(invoke_context)?;
    let index = invoke_context.execution_context().block_index();
    let index = i64::try_from(index).map_err(|_| SyscallError::OutOfRange("block_index"))?;
    Ok(Value::Int(index))
}

/// Hash of the current block
pub fn block_hash(invoke_context: &mut InvokeContext) -> Result<Value> {
    charge_read(invoke_context)?;
    Ok(Value::from(invoke_context.execution_context().block_hash()))
}

/// Nonce of the current block
pub fn block_nonce(invoke_context: &mut InvokeContext) -> Result<Value> {
    charge_read(invoke_context)?;
    let nonce = invoke_context.execution_context().block_nonce();
    let nonce = i64::try_from(nonce).map_err(|_| SyscallError::OutOfRange("block_nonce"))?;
    Ok(Value::Int(nonce))
}

/// Identifier of the current transaction
pub fn transaction_id(invoke_context: &mut InvokeContext) -> Result<Value> {
    charge_read(invoke_context)?;
    Ok(Value::from(invoke_context.execution_context().transaction_id()))
}

/// Name of the contract currently executing
pub fn contract_name(invoke_context: &mut InvokeContext) -> Result<Value> {
    charge_read(invoke_context)?;
    Ok(Value::from(invoke_context.current_contract()?))
}
