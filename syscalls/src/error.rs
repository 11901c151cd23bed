//! Host function failures

use gamma_program_runtime::GammaVmError;
use thiserror::Error as ThisError;

/// Syscall error types
///
/// Every variant surfaces as a runtime fault once it leaves this crate.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum SyscallError {
    /// Operator applied to operands it is not defined for
    #[error("Operator {op} not defined for {lhs} and {rhs}")]
    TypeMismatch {
        /// Operator name
        op: &'static str,
        /// Left operand type
        lhs: &'static str,
        /// Right operand type
        rhs: &'static str,
    },
    /// Integer arithmetic left the i64 range
    #[error("Integer overflow in {0}")]
    Overflow(&'static str),
    /// Division or remainder by zero
    #[error("Division by zero")]
    DivisionByZero,
    /// Host function called with the wrong number of arguments
    #[error("{function} expects {expected} arguments, got {got}")]
    Arity {
        /// Host function name
        function: &'static str,
        /// Human-readable expectation
        expected: String,
        /// Arguments supplied
        got: usize,
    },
    /// Slice bounds outside the input or not on a character boundary
    #[error("Invalid range {start}..{end} for length {len}")]
    InvalidRange {
        /// Range start
        start: i64,
        /// Range end
        end: i64,
        /// Input length in bytes
        len: usize,
    },
    /// `concat` over mixed strings and bytes
    #[error("concat expects only strings or only bytes")]
    MixedConcat,
    /// Storage key is too large
    #[error("Key too large: {0} bytes (max {1})")]
    KeyTooLarge(usize, usize),
    /// Storage value is too large
    #[error("Value too large: {0} bytes (max {1})")]
    ValueTooLarge(usize, usize),
    /// Message exceeds maximum length
    #[error("Message too long: {0} bytes (max {1})")]
    MessageTooLong(usize, usize),
    /// `charge` with a negative amount
    #[error("Cannot charge a negative amount: {0}")]
    NegativeCharge(i64),
    /// Chain data that does not fit a contract integer
    #[error("{0} does not fit in a contract integer")]
    OutOfRange(&'static str),
}

impl From<SyscallError> for GammaVmError {
    fn from(err: SyscallError) -> Self {
        GammaVmError::fault(err.to_string())
    }
}
