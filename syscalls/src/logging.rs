//! Logging host function for Gamma contracts
//!
//! Messages are kept with the invocation and echoed through the `log`
//! facade when the InvokeContext is in debug mode.

use gamma_program_runtime::{InvokeContext, Result, Value};

use crate::error::SyscallError;

/// Maximum length of a log message
pub const MAX_LOG_LENGTH: usize = 10_000;

/// Log the rendering of a value
///
/// Charged `log_base + log_byte * len`; messages longer than
/// [`MAX_LOG_LENGTH`] are rejected before any charge. The message is only
/// rendered once paid for.
pub fn log(invoke_context: &mut InvokeContext, message: &Value) -> Result<Value> {
    let len = message.rendered_len();
    if len > MAX_LOG_LENGTH {
        log::debug!("rejected {}-byte log message", len);
        return Err(SyscallError::MessageTooLong(len, MAX_LOG_LENGTH).into());
    }

    let cost = invoke_context.costs().log(len);
    invoke_context.consume_checked(cost)?;
    invoke_context.record_log(message.to_string());
    Ok(Value::Null)
}
