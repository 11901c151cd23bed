//! Explicit chain state updates
//!
//! `update_state` queues a contract-defined payload for the chain-state
//! collaborator. The payload is forwarded only if the whole execution
//! succeeds.

use gamma_program_runtime::{InvokeContext, Result, Value};

/// Queue a state update payload
///
/// Charged `state_update_base + state_update_byte * len` over the encoded
/// payload size, which is computed without encoding.
pub fn update_state(invoke_context: &mut InvokeContext, payload: Value) -> Result<Value> {
    let encoded_len = payload.encoded_len()?;
    let cost = invoke_context.costs().state_update(encoded_len);
    invoke_context.consume_checked(cost)?;
    invoke_context.queue_state_update(payload)?;
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamma_program_runtime::{
        CostSchedule, ExecutionContext, GammaVmError, NoOpStorage, ResourceLedger, StateChange,
    };

    #[test]
    fn test_update_state_is_buffered_with_provenance() {
        let costs = CostSchedule::default();
        let context = ExecutionContext::new(77, "h", 1, "tx-9").unwrap();
        let mut invoke_context =
            InvokeContext::new(ResourceLedger::new(10_000), context, &costs, &NoOpStorage);
        invoke_context.enter_call("token").unwrap();

        let payload = Value::from("minted");
        let encoded_len = payload.encode().unwrap().len();
        update_state(&mut invoke_context, payload.clone()).unwrap();
        assert_eq!(invoke_context.get_gamma_consumed(), costs.state_update(encoded_len));

        let effects = invoke_context.into_effects();
        let update = &effects.state_updates[0];
        assert_eq!(update.contract, "token");
        assert_eq!(update.transaction_id, "tx-9");
        assert_eq!(update.block_index, 77);
        assert_eq!(update.change, StateChange::Payload(payload));
    }

    #[test]
    fn test_large_payload_charged_by_size() {
        let costs = CostSchedule::default();
        let context = ExecutionContext::new(1, "h", 1, "tx").unwrap();
        let payload = Value::from("p".repeat(100_000));
        let cost = costs.state_update(payload.encode().unwrap().len());

        let mut invoke_context =
            InvokeContext::new(ResourceLedger::new(cost - 1), context.clone(), &costs, &NoOpStorage);
        invoke_context.enter_call("token").unwrap();
        match update_state(&mut invoke_context, payload.clone()).unwrap_err() {
            GammaVmError::BudgetExceeded(e) => assert_eq!(e.attempted, cost),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(invoke_context.into_effects().state_updates.is_empty());

        let mut invoke_context =
            InvokeContext::new(ResourceLedger::new(cost), context, &costs, &NoOpStorage);
        invoke_context.enter_call("token").unwrap();
        update_state(&mut invoke_context, payload).unwrap();
        assert_eq!(invoke_context.get_remaining(), 0);
    }

    #[test]
    fn test_update_state_insufficient_gamma() {
        let costs = CostSchedule::default();
        let context = ExecutionContext::new(1, "h", 1, "tx").unwrap();
        let mut invoke_context =
            InvokeContext::new(ResourceLedger::new(100), context, &costs, &NoOpStorage);
        invoke_context.enter_call("token").unwrap();

        let err = update_state(&mut invoke_context, Value::Null).unwrap_err();
        assert!(matches!(err, GammaVmError::BudgetExceeded(_)));
        assert!(invoke_context.into_effects().state_updates.is_empty());
    }
}
