//! Operators available to contracts
//!
//! Operands arrive already evaluated (and already paid for). Each operator
//! charges its own cost before computing anything.

use gamma_program_runtime::{InvokeContext, Result, Value};
use serde::{Deserialize, Serialize};

use crate::error::SyscallError;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    /// Integer addition, or concatenation of two strings / two byte strings
    Add,
    /// Integer subtraction
    Sub,
    /// Integer multiplication
    Mul,
    /// Integer division, truncating
    Div,
    /// Integer remainder
    Mod,
    /// Structural equality
    Eq,
    /// Structural inequality
    Ne,
    /// Less than (integers or strings)
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Boolean and
    And,
    /// Boolean or
    Or,
}

impl BinaryOp {
    /// Operator name used in fault messages
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    /// Whether the operator compares its operands
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// Integer negation
    Neg,
    /// Boolean negation
    Not,
}

/// Apply a binary operator
///
/// `add` on two strings or two byte strings is a concatenation and is
/// charged as a string operation over the result length. Comparisons with a
/// string or byte string operand are charged as a string operation over both
/// payloads. Every other combination is charged the arithmetic cost.
pub fn binary(
    invoke_context: &mut InvokeContext,
    op: BinaryOp,
    lhs: Value,
    rhs: Value,
) -> Result<Value> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => {
            let len = a.len().saturating_add(b.len());
            invoke_context.consume_checked(invoke_context.costs().string_op(len))?;
            let mut out = String::with_capacity(len);
            out.push_str(&a);
            out.push_str(&b);
            Ok(Value::from(out))
        }
        (BinaryOp::Add, Value::Bytes(a), Value::Bytes(b)) => {
            let len = a.len().saturating_add(b.len());
            invoke_context.consume_checked(invoke_context.costs().string_op(len))?;
            let mut out = Vec::with_capacity(len);
            out.extend_from_slice(&a);
            out.extend_from_slice(&b);
            Ok(Value::from(out))
        }
        (op, lhs, rhs) => {
            let cost = if op.is_comparison() && (has_payload(&lhs) || has_payload(&rhs)) {
                invoke_context
                    .costs()
                    .string_op(lhs.payload_len().saturating_add(rhs.payload_len()))
            } else {
                invoke_context.costs().arithmetic
            };
            invoke_context.consume_checked(cost)?;
            apply(op, lhs, rhs)
        }
    }
}

fn has_payload(value: &Value) -> bool {
    matches!(value, Value::Str(_) | Value::Bytes(_))
}

fn apply(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
    let mismatch = |lhs: &Value, rhs: &Value| SyscallError::TypeMismatch {
        op: op.name(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    };

    let value = match (op, &lhs, &rhs) {
        (BinaryOp::Eq, a, b) => Value::Bool(a == b),
        (BinaryOp::Ne, a, b) => Value::Bool(a != b),

        (BinaryOp::Add, Value::Int(a), Value::Int(b)) => {
            Value::Int(a.checked_add(*b).ok_or(SyscallError::Overflow("add"))?)
        }
        (BinaryOp::Sub, Value::Int(a), Value::Int(b)) => {
            Value::Int(a.checked_sub(*b).ok_or(SyscallError::Overflow("sub"))?)
        }
        (BinaryOp::Mul, Value::Int(a), Value::Int(b)) => {
            Value::Int(a.checked_mul(*b).ok_or(SyscallError::Overflow("mul"))?)
        }
        (BinaryOp::Div, Value::Int(_), Value::Int(0))
        | (BinaryOp::Mod, Value::Int(_), Value::Int(0)) => {
            return Err(SyscallError::DivisionByZero.into())
        }
        (BinaryOp::Div, Value::Int(a), Value::Int(b)) => {
            Value::Int(a.checked_div(*b).ok_or(SyscallError::Overflow("div"))?)
        }
        (BinaryOp::Mod, Value::Int(a), Value::Int(b)) => {
            Value::Int(a.checked_rem(*b).ok_or(SyscallError::Overflow("mod"))?)
        }

        (BinaryOp::Lt, Value::Int(a), Value::Int(b)) => Value::Bool(a < b),
        (BinaryOp::Le, Value::Int(a), Value::Int(b)) => Value::Bool(a <= b),
        (BinaryOp::Gt, Value::Int(a), Value::Int(b)) => Value::Bool(a > b),
        (BinaryOp::Ge, Value::Int(a), Value::Int(b)) => Value::Bool(a >= b),
        (BinaryOp::Lt, Value::Str(a), Value::Str(b)) => Value::Bool(a < b),
        (BinaryOp::Le, Value::Str(a), Value::Str(b)) => Value::Bool(a <= b),
        (BinaryOp::Gt, Value::Str(a), Value::Str(b)) => Value::Bool(a > b),
        (BinaryOp::Ge, Value::Str(a), Value::Str(b)) => Value::Bool(a >= b),

        (BinaryOp::And, Value::Bool(a), Value::Bool(b)) => Value::Bool(*a && *b),
        (BinaryOp::Or, Value::Bool(a), Value::Bool(b)) => Value::Bool(*a || *b),

        _ => return Err(mismatch(&lhs, &rhs).into()),
    };
    Ok(value)
}

/// Apply a unary operator, charged the arithmetic cost
pub fn unary(invoke_context: &mut InvokeContext, op: UnaryOp, operand: Value) -> Result<Value> {
    invoke_context.consume_checked(invoke_context.costs().arithmetic)?;
    match (op, operand) {
        (UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(
            i.checked_neg().ok_or(SyscallError::Overflow("neg"))?,
        )),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, other) => Err(SyscallError::TypeMismatch {
            op: match op {
                UnaryOp::Neg => "neg",
                UnaryOp::Not => "not",
            },
            lhs: other.type_name(),
            rhs: "nothing",
        }
        .into()),
    }
}
