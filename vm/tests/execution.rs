//! End-to-end execution through the engine

use std::sync::Arc;

use gamma_program_runtime::{ContextOptions, CostSchedule, InMemoryChainState, Result, Value};
use gamma_vm::{
    ContractCode, ContractDefinition, EngineConfig, ExecutionEngine, ExecutionFailure,
    ExecutionOutcome, Expr, FailureKind, NativeContract, NativeEnv, OperationDef, OperationSpec,
    Stmt, Visibility,
};

const MY_CONTRACT: &str = include_str!("fixtures/my_contract.json");

fn engine() -> ExecutionEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    ExecutionEngine::new(EngineConfig::default()).unwrap()
}

fn options() -> ContextOptions {
    ContextOptions::new(10, "abc123", 42, "tx1")
}

/// Contract whose entry point charges each amount in turn
fn charging(amounts: &[i64]) -> ContractCode {
    let body = amounts
        .iter()
        .map(|amount| Stmt::Expr(Expr::host("charge", vec![Expr::int(*amount)])))
        .chain(std::iter::once(Stmt::Return(Expr::str("done"))))
        .collect();
    ContractCode::Definition(ContractDefinition {
        name: "charging".into(),
        entry_point: "main".into(),
        operations: vec![OperationDef {
            name: "main".into(),
            visibility: Visibility::Public,
            params: vec![],
            body,
        }],
    })
}

#[test]
fn test_charges_within_budget() {
    let outcome = engine().execute(&charging(&[30, 40, 20]), &options(), 100);
    assert_eq!(
        outcome,
        ExecutionOutcome::Success {
            value: Value::from("done"),
            consumed: 90
        }
    );
}

#[test]
fn test_first_overrun_stops_execution() {
    let outcome = engine().execute(&charging(&[30, 40, 5]), &options(), 50);
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::BudgetExceeded);
    assert_eq!((failure.consumed, failure.budget, failure.attempted), (30, 50, 40));
}

#[test]
fn test_exact_budget_is_enough() {
    let outcome = engine().execute(&charging(&[30, 20]), &options(), 50);
    assert_eq!(outcome.consumed(), 50);
    assert!(outcome.is_success());

    let outcome = engine().execute(&charging(&[]), &options(), 0);
    assert_eq!(outcome.value(), Some(&Value::from("done")));
    assert_eq!(outcome.consumed(), 0);
}

#[test]
fn test_malformed_definition() {
    let engine = engine();
    for json in ["", "{", r#"{"name": "x"}"#, r#"{"name": "x", "operations": [{"body": 5}]}"#] {
        let outcome = engine.execute(&ContractCode::Json(json.into()), &options(), 1_000);
        let failure = outcome.failure().unwrap();
        assert!(
            matches!(failure.kind, FailureKind::LoadError { .. }),
            "{:?} gave {:?}",
            json,
            failure
        );
        assert_eq!(failure.consumed, 0);
        assert_eq!(failure.attempted, 0);
    }
}

#[test]
fn test_context_round_trip() {
    let definition = ContractDefinition {
        name: "context".into(),
        entry_point: "main".into(),
        operations: vec![OperationDef {
            name: "main".into(),
            visibility: Visibility::Public,
            params: vec![],
            body: vec![
                Stmt::let_("index", Expr::host("block_index", vec![])),
                Stmt::let_("hash", Expr::host("block_hash", vec![])),
                Stmt::let_("nonce", Expr::host("block_nonce", vec![])),
                Stmt::let_("tx", Expr::host("transaction_id", vec![])),
                Stmt::Return(Expr::host(
                    "concat",
                    vec![
                        Expr::host("to_string", vec![Expr::var("index")]),
                        Expr::str("/"),
                        Expr::var("hash"),
                        Expr::str("/"),
                        Expr::host("to_string", vec![Expr::var("nonce")]),
                        Expr::str("/"),
                        Expr::var("tx"),
                    ],
                )),
            ],
        }],
    };
    let outcome = engine().execute(
        &ContractCode::Definition(definition),
        &ContextOptions::new(10, "abc", 42, "tx1"),
        10_000,
    );
    assert_eq!(outcome.value(), Some(&Value::from("10/abc/42/tx1")));
}

#[test]
fn test_missing_context_fields() {
    let engine = engine();
    let code = charging(&[1]);

    let cases = [
        (ContextOptions::default(), "block_index"),
        (
            ContextOptions {
                block_nonce: None,
                ..options()
            },
            "block_nonce",
        ),
        (
            ContextOptions {
                transaction_id: Some("   ".into()),
                ..options()
            },
            "transaction_id",
        ),
    ];
    for (options, field) in cases {
        let outcome = engine.execute(&code, &options, 100);
        assert_eq!(
            outcome,
            ExecutionOutcome::Failure(ExecutionFailure {
                kind: FailureKind::InvalidContext {
                    field: field.into()
                },
                consumed: 0,
                budget: 100,
                attempted: 0,
            })
        );
    }
}

#[test]
fn test_options_from_json_ignore_unknown_fields() {
    let options: ContextOptions = serde_json::from_str(
        r#"{"block_index": 10, "block_hash": "abc", "block_nonce": 42, "transaction_id": "tx1", "sender": "me"}"#,
    )
    .unwrap();
    assert!(engine().execute(&charging(&[1]), &options, 10).is_success());
}

#[test]
fn test_my_contract_costs() {
    let costs = CostSchedule::default();
    let expected = costs.assign                // let x = 5
        + costs.call                           // other_function("hello")
        + costs.string_op(10)                  // value + value
        + costs.string_op(15)                  // ... + value
        + 2 * costs.arithmetic                 // 1 + 1 == 2
        + costs.branch
        + costs.arithmetic                     // x + 5
        + costs.assign
        + costs.context_read                   // block_hash
        + costs.string_op(19); // "The hash is: " + hash
    assert_eq!(expected, 101);

    let engine = engine();
    let code = ContractCode::Json(MY_CONTRACT.into());
    let outcome = engine.execute(&code, &options(), 101);
    assert_eq!(
        outcome,
        ExecutionOutcome::Success {
            value: Value::from("The hash is: abc123"),
            consumed: 101
        }
    );

    // One short: the final concatenation is refused
    let outcome = engine.execute(&code, &options(), 100);
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::BudgetExceeded);
    assert_eq!((failure.consumed, failure.attempted), (77, 24));
}

#[test]
fn test_helper_is_not_an_entry_point() {
    let outcome = engine().execute_call(
        &ContractCode::Json(MY_CONTRACT.into()),
        &options(),
        1_000,
        "other_function",
        vec![Value::from("x")],
    );
    assert_eq!(
        outcome.failure().unwrap().kind,
        FailureKind::RuntimeFault {
            cause: "Operation other_function of contract my_contract is internal".into()
        }
    );
    assert_eq!(outcome.consumed(), 0);
}

#[test]
fn test_concurrent_executions_are_isolated() {
    let engine = engine();
    let code = ContractCode::Json(MY_CONTRACT.into());

    let outcomes: Vec<(u64, ExecutionOutcome)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let engine = &engine;
                let code = &code;
                scope.spawn(move || {
                    let budget = 95 + i;
                    let options = ContextOptions::new(i, "abc123", i, format!("tx{}", i));
                    let outcome = (0..20)
                        .map(|_| engine.execute(code, &options, budget))
                        .last()
                        .unwrap();
                    (budget, outcome)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (budget, outcome) in outcomes {
        if budget >= 101 {
            assert_eq!(outcome.consumed(), 101);
            assert!(outcome.is_success());
        } else {
            let failure = outcome.failure().unwrap();
            assert_eq!(failure.kind, FailureKind::BudgetExceeded);
            assert_eq!(failure.budget, budget);
            assert_eq!(failure.consumed, 77);
        }
    }
}

struct Vault;

impl NativeContract for Vault {
    fn name(&self) -> &str {
        "vault"
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![
            OperationSpec::public("main", 0),
            OperationSpec::public("deposit", 1),
            OperationSpec::public("balance", 0),
            OperationSpec::internal("audit", 0),
        ]
    }

    fn call(&self, operation: &str, args: Vec<Value>, env: &mut NativeEnv<'_, '_>) -> Result<Value> {
        match operation {
            "deposit" => {
                let amount = args.into_iter().next().unwrap_or(Value::Null);
                let current = env.storage_read("balance")?;
                let current = if current == Value::Null {
                    Value::Int(0)
                } else {
                    current
                };
                let total = env.binary(gamma_syscalls::BinaryOp::Add, current, amount)?;
                env.storage_write("balance", total.clone())?;
                let transaction = env.transaction_id()?;
                env.log(format!("deposit in tx {}", transaction))?;
                env.call("audit", vec![])?;
                Ok(total)
            }
            "balance" => env.storage_read("balance"),
            "audit" => {
                env.update_state("audited")?;
                Ok(Value::Null)
            }
            _ => Ok(Value::from(env.contract_name())),
        }
    }
}

#[test]
fn test_native_contract_storage_and_effects() {
    let chain = Arc::new(InMemoryChainState::new());
    chain.insert("vault", b"balance", &Value::Int(100)).unwrap();
    let engine = ExecutionEngine::new(EngineConfig::default())
        .unwrap()
        .with_storage(chain.clone())
        .with_state_sink(chain.clone());
    let code = ContractCode::Native(Arc::new(Vault));

    let outcome = engine.execute_call(&code, &options(), 100_000, "deposit", vec![Value::Int(25)]);
    assert_eq!(outcome.value(), Some(&Value::Int(125)));
    assert_eq!(chain.value("vault", b"balance").unwrap(), Some(Value::Int(125)));
    assert_eq!(chain.updates().unwrap().len(), 2);

    let outcome = engine.execute_call(&code, &options(), 100_000, "balance", vec![]);
    assert_eq!(outcome.value(), Some(&Value::Int(125)));

    let outcome = engine.execute(&code, &options(), 0);
    assert_eq!(outcome.value(), Some(&Value::from("vault")));

    let outcome = engine.execute_call(&code, &options(), 100_000, "audit", vec![]);
    assert!(!outcome.is_success());
}

#[test]
fn test_native_failure_discards_effects() {
    let chain = Arc::new(InMemoryChainState::new());
    let engine = ExecutionEngine::new(EngineConfig::default())
        .unwrap()
        .with_storage(chain.clone())
        .with_state_sink(chain.clone());

    // Enough for the write but not for the log that follows it
    let costs = CostSchedule::default();
    let encoded = Value::Int(1).encode().unwrap().len();
    let budget = costs.storage_read_base + costs.arithmetic + costs.storage_write(encoded) + costs.context_read;
    let outcome = engine.execute_call(
        &ContractCode::Native(Arc::new(Vault)),
        &options(),
        budget,
        "deposit",
        vec![Value::Int(1)],
    );
    assert_eq!(outcome.failure().unwrap().kind, FailureKind::BudgetExceeded);
    assert!(chain.updates().unwrap().is_empty());
    assert_eq!(chain.value("vault", b"balance").unwrap(), None);
}

#[test]
fn test_cross_contract_invocation() {
    let mut engine = engine();
    engine.register(ContractCode::Native(Arc::new(Vault))).unwrap();

    let caller = ContractDefinition {
        name: "caller".into(),
        entry_point: "main".into(),
        operations: vec![OperationDef {
            name: "main".into(),
            visibility: Visibility::Public,
            params: vec![],
            body: vec![Stmt::Return(Expr::invoke("vault", "main", vec![]))],
        }],
    };
    let outcome = engine.execute(&ContractCode::Definition(caller.clone()), &options(), 10_000);
    assert_eq!(
        outcome,
        ExecutionOutcome::Success {
            value: Value::from("vault"),
            consumed: CostSchedule::default().external_call
        }
    );

    // Internal operations stay internal across contracts
    let mut sneaky = caller.clone();
    sneaky.operations[0].body = vec![Stmt::Return(Expr::invoke("vault", "audit", vec![]))];
    let outcome = engine.execute(&ContractCode::Definition(sneaky), &options(), 10_000);
    assert_eq!(
        outcome.failure().unwrap().kind,
        FailureKind::RuntimeFault {
            cause: "Operation audit of contract vault is internal".into()
        }
    );

    let mut lost = caller;
    lost.operations[0].body = vec![Stmt::Return(Expr::invoke("nobody", "main", vec![]))];
    let outcome = engine.execute(&ContractCode::Definition(lost), &options(), 10_000);
    assert_eq!(
        outcome.failure().unwrap().kind,
        FailureKind::RuntimeFault {
            cause: "Unknown contract nobody".into()
        }
    );
}

#[test]
fn test_outcome_json() {
    let outcome = engine().execute(&charging(&[30, 40]), &options(), 50);
    assert_eq!(
        outcome.to_json(),
        serde_json::json!({
            "ok": false,
            "kind": "budget_exceeded",
            "consumed": 30,
            "budget": 50,
            "attempted": 40
        })
    );
}

fn single_operation(name: &str, body: Vec<Stmt>) -> ContractDefinition {
    ContractDefinition {
        name: name.into(),
        entry_point: "main".into(),
        operations: vec![OperationDef {
            name: "main".into(),
            visibility: Visibility::Public,
            params: vec![],
            body,
        }],
    }
}

/// Engine sharing one chain state, with a registered callee that writes
/// storage and then charges `amount`
fn engine_with_callee(amount: i64) -> (ExecutionEngine, Arc<InMemoryChainState>) {
    let chain = Arc::new(InMemoryChainState::new());
    let mut engine = engine()
        .with_storage(chain.clone())
        .with_state_sink(chain.clone());
    let callee = single_operation(
        "callee",
        vec![
            Stmt::Expr(Expr::host("storage_write", vec![Expr::str("k"), Expr::int(1)])),
            Stmt::Expr(Expr::host("charge", vec![Expr::int(amount)])),
            Stmt::Return(Expr::int(1)),
        ],
    );
    engine.register(ContractCode::Definition(callee)).unwrap();
    (engine, chain)
}

fn calling_callee() -> ContractCode {
    ContractCode::Definition(single_operation(
        "caller",
        vec![
            Stmt::let_("result", Expr::invoke("callee", "main", vec![])),
            Stmt::Expr(Expr::host("charge", vec![Expr::int(10)])),
            Stmt::Return(Expr::var("result")),
        ],
    ))
}

#[test]
fn test_callee_charges_the_caller_ledger() {
    let costs = CostSchedule::default();
    let write = costs.storage_write(Value::Int(1).encode().unwrap().len());
    let (engine, chain) = engine_with_callee(100);

    let outcome = engine.execute(&calling_callee(), &options(), 100_000);
    assert_eq!(
        outcome,
        ExecutionOutcome::Success {
            value: Value::Int(1),
            consumed: costs.external_call + write + 100 + costs.assign + 10
        }
    );
    assert_eq!(chain.value("callee", b"k").unwrap(), Some(Value::Int(1)));
    assert_eq!(chain.value("caller", b"k").unwrap(), None);
}

#[test]
fn test_callee_overrun_fails_the_whole_execution() {
    let costs = CostSchedule::default();
    let write = costs.storage_write(Value::Int(1).encode().unwrap().len());
    let (engine, chain) = engine_with_callee(100);

    // The callee's write fits, its charge does not
    let budget = costs.external_call + write + 50;
    let outcome = engine.execute(&calling_callee(), &options(), budget);
    assert_eq!(
        outcome,
        ExecutionOutcome::Failure(ExecutionFailure {
            kind: FailureKind::BudgetExceeded,
            consumed: costs.external_call + write,
            budget,
            attempted: 100,
        })
    );
    assert!(chain.updates().unwrap().is_empty());
    assert_eq!(chain.value("callee", b"k").unwrap(), None);

    // A budget that stops right after the call refuses the caller's own charge
    let budget = costs.external_call + write + 100 + costs.assign;
    let outcome = engine.execute(&calling_callee(), &options(), budget);
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::BudgetExceeded);
    assert_eq!((failure.consumed, failure.attempted), (budget, 10));
    assert!(chain.updates().unwrap().is_empty());
}

#[test]
fn test_string_comparison_cost_scales_with_length() {
    let costs = CostSchedule::default();
    let compare = |len: usize| {
        let text = "x".repeat(len);
        let definition = single_operation(
            "compare",
            vec![
                Stmt::let_("text", Expr::str(text)),
                Stmt::Return(Expr::binary(
                    gamma_syscalls::BinaryOp::Eq,
                    Expr::var("text"),
                    Expr::var("text"),
                )),
            ],
        );
        engine().execute(&ContractCode::Definition(definition), &options(), u64::MAX)
    };

    let short = compare(10);
    assert_eq!(short.value(), Some(&Value::Bool(true)));
    assert_eq!(short.consumed(), costs.assign + costs.string_op(20));

    let long = compare(100_000);
    assert_eq!(long.value(), Some(&Value::Bool(true)));
    assert_eq!(long.consumed(), costs.assign + costs.string_op(200_000));
}

#[test]
fn test_deeply_nested_recursion_is_a_fault() {
    // Twenty additions around a recursive call at every level
    let mut expr = Expr::call("main", vec![]);
    for _ in 0..20 {
        expr = Expr::binary(gamma_syscalls::BinaryOp::Add, Expr::int(1), expr);
    }
    let definition = single_operation("nested", vec![Stmt::Return(expr)]);

    let outcome = engine().execute(&ContractCode::Definition(definition), &options(), u64::MAX);
    assert_eq!(
        outcome.failure().unwrap().kind,
        FailureKind::RuntimeFault {
            cause: "Nesting limit of 512 exceeded".into()
        }
    );
}
