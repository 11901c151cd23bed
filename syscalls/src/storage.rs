//! Storage host functions for Gamma contracts
//!
//! This module provides host functions for contract persistent storage:
//! reading, writing, and deleting key-value pairs. Keys are namespaced by
//! the calling contract. Writes and deletes are buffered in the invocation
//! and only reach the chain after a successful execution.

use gamma_program_runtime::{InvokeContext, Result, Value};

use crate::error::SyscallError;

/// Maximum storage key size (256 bytes)
pub const MAX_KEY_SIZE: usize = 256;

/// Maximum encoded storage value size (64 KB)
pub const MAX_VALUE_SIZE: usize = 65_536;

fn storage_key(key: &Value) -> Result<Vec<u8>> {
    let len = key.key_len();
    if len > MAX_KEY_SIZE {
        return Err(SyscallError::KeyTooLarge(len, MAX_KEY_SIZE).into());
    }
    Ok(key.key_bytes())
}

/// Read a value from contract storage
///
/// The base cost is charged before the lookup, the per-byte cost once the
/// stored size is known. A missing key reads as `null`.
pub fn storage_read(invoke_context: &mut InvokeContext, key: &Value) -> Result<Value> {
    let key = storage_key(key)?;
    let costs = invoke_context.costs();
    invoke_context.consume_checked(costs.storage_read_base)?;

    let Some(stored) = invoke_context.get_storage(&key)? else {
        return Ok(Value::Null);
    };

    let per_byte = costs.storage_read(stored.len()).saturating_sub(costs.storage_read_base);
    invoke_context.consume_checked(per_byte)?;
    Value::decode(&stored)
}

/// Write a value to contract storage
///
/// Size limits are checked and the write is charged before the value is
/// encoded.
pub fn storage_write(invoke_context: &mut InvokeContext, key: &Value, value: &Value) -> Result<Value> {
    let key = storage_key(key)?;
    let encoded_len = value.encoded_len()?;
    if encoded_len > MAX_VALUE_SIZE {
        return Err(SyscallError::ValueTooLarge(encoded_len, MAX_VALUE_SIZE).into());
    }

    let cost = invoke_context.costs().storage_write(encoded_len);
    invoke_context.consume_checked(cost)?;
    log::trace!("storage write: {} key bytes, {} value bytes", key.len(), encoded_len);
    invoke_context.set_storage(&key, value.encode()?)?;
    Ok(Value::Null)
}

/// Delete a value from contract storage
///
/// Returns whether the key existed.
pub fn storage_delete(invoke_context: &mut InvokeContext, key: &Value) -> Result<Value> {
    let key = storage_key(key)?;
    invoke_context.consume_checked(invoke_context.costs().storage_delete)?;
    Ok(Value::Bool(invoke_context.delete_storage(&key)?))
}
