//! String and byte host functions
//!
//! Each function is charged `string_base + string_byte * n`, where `n` is
//! the number of bytes produced or inspected.

use gamma_program_runtime::{InvokeContext, Result, Value};

use crate::error::SyscallError;

fn charge_bytes(invoke_context: &mut InvokeContext, len: usize) -> Result<()> {
    invoke_context.consume_checked(invoke_context.costs().string_op(len))?;
    Ok(())
}

/// Concatenate strings, or byte strings
pub fn concat(invoke_context: &mut InvokeContext, args: Vec<Value>) -> Result<Value> {
    let total = args.iter().try_fold(0usize, |total, arg| match arg {
        Value::Str(s) => Ok(total.saturating_add(s.len())),
        Value::Bytes(b) => Ok(total.saturating_add(b.len())),
        other => Err(SyscallError::TypeMismatch {
            op: "concat",
            lhs: other.type_name(),
            rhs: other.type_name(),
        }),
    })?;

    let all_strings = args.iter().all(|arg| matches!(arg, Value::Str(_)));
    let all_bytes = args.iter().all(|arg| matches!(arg, Value::Bytes(_)));
    if !all_strings && !all_bytes {
        return Err(SyscallError::MixedConcat.into());
    }

    charge_bytes(invoke_context, total)?;

    if all_strings {
        let mut out = String::with_capacity(total);
        for arg in &args {
            if let Value::Str(s) = arg {
                out.push_str(s);
            }
        }
        Ok(Value::from(out))
    } else {
        let mut out = Vec::with_capacity(total);
        for arg in &args {
            if let Value::Bytes(b) = arg {
                out.extend_from_slice(b);
            }
        }
        Ok(Value::from(out))
    }
}

/// Length in bytes of a string or byte string
pub fn len(invoke_context: &mut InvokeContext, value: &Value) -> Result<Value> {
    let len = match value {
        Value::Str(s) => s.len(),
        Value::Bytes(b) => b.len(),
        other => {
            return Err(SyscallError::TypeMismatch {
                op: "len",
                lhs: other.type_name(),
                rhs: "nothing",
            }
            .into())
        }
    };
    charge_bytes(invoke_context, len)?;
    Ok(Value::Int(
        i64::try_from(len).map_err(|_| SyscallError::OutOfRange("len"))?,
    ))
}

/// Byte range `start..end` of a string or byte string
///
/// String slices must fall on character boundaries.
pub fn slice(
    invoke_context: &mut InvokeContext,
    value: &Value,
    start: &Value,
    end: &Value,
) -> Result<Value> {
    let start = start.as_int("slice start")?;
    let end = end.as_int("slice end")?;
    let total = match value {
        Value::Str(s) => s.len(),
        Value::Bytes(b) => b.len(),
        other => {
            return Err(SyscallError::TypeMismatch {
                op: "slice",
                lhs: other.type_name(),
                rhs: "int",
            }
            .into())
        }
    };

    let invalid = SyscallError::InvalidRange {
        start,
        end,
        len: total,
    };
    let (from, to) = match (usize::try_from(start), usize::try_from(end)) {
        (Ok(from), Ok(to)) if from <= to && to <= total => (from, to),
        _ => return Err(invalid.into()),
    };

    charge_bytes(invoke_context, to.saturating_sub(from))?;

    match value {
        Value::Str(s) => s
            .get(from..to)
            .map(Value::from)
            .ok_or_else(|| invalid.into()),
        Value::Bytes(b) => b
            .get(from..to)
            .map(Value::from)
            .ok_or_else(|| invalid.into()),
        _ => Err(invalid.into()),
    }
}

/// Render any value as a string
///
/// Charged on the rendered length before anything is rendered.
pub fn to_string(invoke_context: &mut InvokeContext, value: &Value) -> Result<Value> {
    charge_bytes(invoke_context, value.rendered_len())?;
    match value {
        Value::Str(_) => Ok(value.clone()),
        other => Ok(Value::from(other.to_string())),
    }
}

/// Byte representation of a value
///
/// Strings give their UTF-8 bytes, integers their 8-byte big-endian form,
/// booleans a single byte and null an empty byte string.
pub fn to_bytes(invoke_context: &mut InvokeContext, value: Value) -> Result<Value> {
    let len = match &value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 8,
        Value::Str(_) | Value::Bytes(_) => value.payload_len(),
    };
    charge_bytes(invoke_context, len)?;
    Ok(match value {
        Value::Null => Value::from(Vec::new()),
        Value::Bool(b) => Value::from(vec![u8::from(b)]),
        Value::Int(i) => Value::from(i.to_be_bytes().to_vec()),
        Value::Str(s) => Value::from(s.as_bytes()),
        bytes @ Value::Bytes(_) => bytes,
    })
}
