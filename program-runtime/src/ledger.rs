//! Per-invocation resource ledger
//!
//! A [`ResourceLedger`] tracks how much gamma one execution has consumed
//! against its budget. Every execution owns a fresh ledger; ledgers are never
//! shared or carried over between executions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected charge: the ledger would have gone past its budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Out of gamma: consumed {consumed} of {budget}, attempted {attempted}")]
pub struct BudgetExceeded {
    /// Gamma consumed before the rejected charge
    pub consumed: u64,
    /// Budget of the ledger
    pub budget: u64,
    /// Amount of the rejected charge
    pub attempted: u64,
}

/// Ledger lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    /// Charges are accepted while they fit in the budget
    Active,
    /// A charge was rejected; every further charge fails
    Exhausted,
}

/// Cumulative gamma consumption against a fixed budget
#[derive(Debug)]
pub struct ResourceLedger {
    budget: u64,
    consumed: u64,
    state: LedgerState,
    rejection: Option<BudgetExceeded>,
}

impl ResourceLedger {
    /// Creates an active ledger with nothing consumed
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            consumed: 0,
            state: LedgerState::Active,
            rejection: None,
        }
    }

    /// Charge `amount` gamma
    ///
    /// Fails with [`BudgetExceeded`] when `consumed + amount` would exceed the
    /// budget. The first rejection moves the ledger to
    /// [`LedgerState::Exhausted`]; from then on every charge fails without
    /// touching `consumed`, including zero-amount charges.
    pub fn charge(&mut self, amount: u64) -> Result<(), BudgetExceeded> {
        let rejected = BudgetExceeded {
            consumed: self.consumed,
            budget: self.budget,
            attempted: amount,
        };

        if self.state == LedgerState::Exhausted {
            return Err(rejected);
        }

        match self.consumed.checked_add(amount) {
            Some(total) if total <= self.budget => {
                self.consumed = total;
                log::trace!("charged {} gamma ({}/{})", amount, total, self.budget);
                Ok(())
            }
            _ => {
                self.state = LedgerState::Exhausted;
                self.rejection = Some(rejected);
                log::debug!(
                    "ledger exhausted: consumed {} of {}, rejected charge of {}",
                    self.consumed,
                    self.budget,
                    amount
                );
                Err(rejected)
            }
        }
    }

    /// Gamma consumed so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Budget this ledger was created with
    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Gamma still available
    pub fn remaining(&self) -> u64 {
        self.budget.saturating_sub(self.consumed)
    }

    /// Current lifecycle state
    pub fn state(&self) -> LedgerState {
        self.state
    }

    /// Whether a charge has been rejected
    pub fn is_exhausted(&self) -> bool {
        self.state == LedgerState::Exhausted
    }

    /// The charge that exhausted the ledger, if any
    pub fn rejection(&self) -> Option<BudgetExceeded> {
        self.rejection
    }
}
