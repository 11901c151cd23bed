//! Meter host functions
//!
//! Let a contract inspect its own ledger and charge it explicitly.

use gamma_program_runtime::{InvokeContext, Result, Value};

use crate::error::SyscallError;

fn as_contract_int(amount: u64, what: &'static str) -> Result<Value> {
    let amount = i64::try_from(amount).map_err(|_| SyscallError::OutOfRange(what))?;
    Ok(Value::Int(amount))
}

/// Gamma consumed so far, including this query
pub fn gamma_used(invoke_context: &mut InvokeContext) -> Result<Value> {
    invoke_context.consume_checked(invoke_context.costs().context_read)?;
    as_contract_int(invoke_context.get_gamma_consumed(), "gamma_used")
}

/// Gamma left after this query
pub fn gamma_remaining(invoke_context: &mut InvokeContext) -> Result<Value> {
    invoke_context.consume_checked(invoke_context.costs().context_read)?;
    as_contract_int(invoke_context.get_remaining(), "gamma_remaining")
}

/// Charge exactly `amount` gamma
///
/// Returns the amount charged.
pub fn charge(invoke_context: &mut InvokeContext, amount: &Value) -> Result<Value> {
    let requested = amount.as_int("charge amount")?;
    let amount = u64::try_from(requested).map_err(|_| SyscallError::NegativeCharge(requested))?;
    invoke_context.consume_checked(amount)?;
    Ok(Value::Int(requested))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamma_program_runtime::{
        BudgetExceeded, CostSchedule, ExecutionContext, GammaVmError, NoOpStorage, ResourceLedger,
    };

    fn run(budget: u64, f: impl FnOnce(&mut InvokeContext)) {
        let costs = CostSchedule::default();
        let context = ExecutionContext::new(1, "h", 1, "tx").unwrap();
        let mut invoke_context =
            InvokeContext::new(ResourceLedger::new(budget), context, &costs, &NoOpStorage);
        f(&mut invoke_context);
    }

    #[test]
    fn test_charge_sequence() {
        run(50, |ctx| {
            assert_eq!(charge(ctx, &Value::Int(30)).unwrap(), Value::Int(30));
            let err = charge(ctx, &Value::Int(40)).unwrap_err();
            assert_eq!(
                err,
                GammaVmError::BudgetExceeded(BudgetExceeded {
                    consumed: 30,
                    budget: 50,
                    attempted: 40
                })
            );
            // The ledger stays exhausted
            assert!(charge(ctx, &Value::Int(5)).is_err());
            assert_eq!(ctx.get_gamma_consumed(), 30);
        });
    }

    #[test]
    fn test_charge_rejects_bad_amounts() {
        run(50, |ctx| {
            assert_eq!(
                charge(ctx, &Value::Int(-1)).unwrap_err(),
                GammaVmError::fault("Cannot charge a negative amount: -1")
            );
            assert!(charge(ctx, &Value::from("10")).is_err());
            assert_eq!(ctx.get_gamma_consumed(), 0);
        });
    }

    #[test]
    fn test_meter_queries_include_their_own_cost() {
        run(1_000, |ctx| {
            let read = CostSchedule::default().context_read;
            assert_eq!(gamma_used(ctx).unwrap(), Value::Int(read as i64));
            assert_eq!(
                gamma_remaining(ctx).unwrap(),
                Value::Int(1_000 - 2 * read as i64)
            );
        });
    }
}
