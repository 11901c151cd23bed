//! Execution outcomes
//!
//! Every execution ends in an [`ExecutionOutcome`]; nothing else crosses the
//! engine boundary.

use std::fmt;

use gamma_program_runtime::{GammaVmError, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Why an execution failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// A charge would have exceeded the budget
    BudgetExceeded,
    /// The contract could not be resolved into callable operations
    LoadError {
        /// Why loading failed
        reason: String,
    },
    /// A required context field was missing or malformed
    InvalidContext {
        /// Offending field
        field: String,
    },
    /// Contract logic failed for a reason unrelated to metering
    RuntimeFault {
        /// What went wrong
        cause: String,
    },
}

impl FailureKind {
    /// Kind name used in the serialized outcome
    pub fn name(&self) -> &'static str {
        match self {
            FailureKind::BudgetExceeded => "budget_exceeded",
            FailureKind::LoadError { .. } => "load_error",
            FailureKind::InvalidContext { .. } => "invalid_context",
            FailureKind::RuntimeFault { .. } => "runtime_fault",
        }
    }
}

/// A failed execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    /// Failure kind
    pub kind: FailureKind,
    /// Gamma consumed before the failure
    pub consumed: u64,
    /// Budget of the execution
    pub budget: u64,
    /// Rejected charge for `BudgetExceeded`, 0 otherwise
    pub attempted: u64,
}

impl ExecutionFailure {
    /// Build a failure from an error and the ledger figures at the time
    pub fn from_error(error: GammaVmError, consumed: u64, budget: u64) -> Self {
        let (kind, consumed, attempted) = match error {
            GammaVmError::BudgetExceeded(e) => (FailureKind::BudgetExceeded, e.consumed, e.attempted),
            GammaVmError::LoadError { reason } => (FailureKind::LoadError { reason }, consumed, 0),
            GammaVmError::InvalidContext { field } => {
                (FailureKind::InvalidContext { field }, consumed, 0)
            }
            GammaVmError::RuntimeFault { cause } => (FailureKind::RuntimeFault { cause }, consumed, 0),
            GammaVmError::InvalidConfig(cause) => (FailureKind::RuntimeFault { cause }, consumed, 0),
        };
        Self {
            kind,
            consumed,
            budget,
            attempted,
        }
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::BudgetExceeded => write!(
                f,
                "Out of gamma: consumed {} of {}, attempted {}",
                self.consumed, self.budget, self.attempted
            ),
            FailureKind::LoadError { reason } => write!(f, "Failed to load contract: {}", reason),
            FailureKind::InvalidContext { field } => {
                write!(f, "Invalid execution context field: {}", field)
            }
            FailureKind::RuntimeFault { cause } => write!(f, "Runtime fault: {}", cause),
        }
    }
}

/// Result of one execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The entry point returned
    Success {
        /// Returned value
        value: Value,
        /// Gamma consumed
        consumed: u64,
    },
    /// The execution failed
    Failure(ExecutionFailure),
}

impl ExecutionOutcome {
    /// Whether the execution succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }

    /// Gamma consumed, whatever the result
    pub fn consumed(&self) -> u64 {
        match self {
            ExecutionOutcome::Success { consumed, .. } => *consumed,
            ExecutionOutcome::Failure(failure) => failure.consumed,
        }
    }

    /// Returned value on success
    pub fn value(&self) -> Option<&Value> {
        match self {
            ExecutionOutcome::Success { value, .. } => Some(value),
            ExecutionOutcome::Failure(_) => None,
        }
    }

    /// Failure details
    pub fn failure(&self) -> Option<&ExecutionFailure> {
        match self {
            ExecutionOutcome::Success { .. } => None,
            ExecutionOutcome::Failure(failure) => Some(failure),
        }
    }

    /// JSON form: `{ok, value, consumed}` or `{ok, kind, consumed, budget, attempted, ...}`
    pub fn to_json(&self) -> serde_json::Value {
        // Serializing into a JSON value cannot fail for this type
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for ExecutionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExecutionOutcome::Success { value, consumed } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("value", &value.to_json())?;
                map.serialize_entry("consumed", consumed)?;
                map.end()
            }
            ExecutionOutcome::Failure(failure) => {
                let mut map = serializer.serialize_map(Some(6))?;
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("kind", failure.kind.name())?;
                map.serialize_entry("consumed", &failure.consumed)?;
                map.serialize_entry("budget", &failure.budget)?;
                map.serialize_entry("attempted", &failure.attempted)?;
                match &failure.kind {
                    FailureKind::BudgetExceeded => {}
                    FailureKind::LoadError { reason } => map.serialize_entry("reason", reason)?,
                    FailureKind::InvalidContext { field } => map.serialize_entry("field", field)?,
                    FailureKind::RuntimeFault { cause } => map.serialize_entry("cause", cause)?,
                }
                map.end()
            }
        }
    }
}
