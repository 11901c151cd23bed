//! Error types for Gamma VM

use thiserror::Error;

use crate::ledger::BudgetExceeded;

/// Result type for Gamma VM operations
pub type Result<T> = std::result::Result<T, GammaVmError>;

/// Errors that can occur while loading or executing a contract
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GammaVmError {
    /// A charge would have pushed consumption past the budget
    #[error(transparent)]
    BudgetExceeded(#[from] BudgetExceeded),

    /// The contract definition could not be resolved into callable operations
    #[error("Failed to load contract: {reason}")]
    LoadError {
        /// Why resolution failed
        reason: String,
    },

    /// A required context field is missing or malformed
    #[error("Invalid execution context field: {field}")]
    InvalidContext {
        /// Name of the offending field
        field: String,
    },

    /// Contract logic failed for a reason unrelated to metering
    #[error("Runtime fault: {cause}")]
    RuntimeFault {
        /// What went wrong
        cause: String,
    },

    /// Engine configuration rejected at construction time
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}

impl GammaVmError {
    /// Shorthand for a [`GammaVmError::LoadError`]
    pub fn load(reason: impl Into<String>) -> Self {
        GammaVmError::LoadError {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`GammaVmError::RuntimeFault`]
    pub fn fault(cause: impl Into<String>) -> Self {
        GammaVmError::RuntimeFault {
            cause: cause.into(),
        }
    }

    /// Shorthand for a [`GammaVmError::InvalidContext`]
    pub fn invalid_context(field: impl Into<String>) -> Self {
        GammaVmError::InvalidContext {
            field: field.into(),
        }
    }
}

impl From<bincode::Error> for GammaVmError {
    fn from(err: bincode::Error) -> Self {
        GammaVmError::fault(format!("Value encoding failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_exceeded_is_transparent() {
        let err: GammaVmError = BudgetExceeded {
            consumed: 30,
            budget: 50,
            attempted: 40,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Out of gamma: consumed 30 of 50, attempted 40"
        );
    }

    #[test]
    fn test_shorthand_constructors() {
        assert_eq!(
            GammaVmError::load("empty"),
            GammaVmError::LoadError {
                reason: "empty".into()
            }
        );
        assert_eq!(
            GammaVmError::invalid_context("block_hash").to_string(),
            "Invalid execution context field: block_hash"
        );
        assert_eq!(
            GammaVmError::fault("division by zero").to_string(),
            "Runtime fault: division by zero"
        );
    }
}
