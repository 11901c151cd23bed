//! Contract loading
//!
//! Turns a [`ContractDefinition`] or a [`NativeContract`] into a
//! [`LoadedContract`]. Everything that can be checked without running code
//! is checked here, so a contract that loads can only fail at runtime for
//! data-dependent reasons.

use std::collections::HashSet;
use std::sync::Arc;

use gamma_program_runtime::{GammaVmError, Result};
use gamma_syscalls::HostFunction;
use indexmap::IndexMap;

use crate::contract::{ContractBody, LoadedContract, NativeContract, OperationSpec};
use crate::definition::{ContractDefinition, Expr, OperationDef, Stmt, Visibility};

/// Load an interpreted contract definition
pub fn load_definition(definition: ContractDefinition) -> Result<LoadedContract> {
    let specs = definition
        .operations
        .iter()
        .map(|op| OperationSpec {
            name: op.name.clone(),
            visibility: op.visibility,
            arity: op.params.len(),
        })
        .collect();
    let operations = index_operations(&definition.name, &definition.entry_point, specs)?;

    for op in &definition.operations {
        check_operation(&operations, op)
            .map_err(|reason| GammaVmError::load(format!("Operation {}: {}", op.name, reason)))?;
    }

    let bodies = definition
        .operations
        .into_iter()
        .map(|op| (op.name.clone(), op))
        .collect();

    log::debug!(
        "loaded contract {} ({} operations)",
        definition.name,
        operations.len()
    );

    Ok(LoadedContract {
        name: definition.name,
        entry_point: definition.entry_point,
        operations,
        body: ContractBody::Interpreted(bodies),
    })
}

/// Load a native contract
pub fn load_native(contract: Arc<dyn NativeContract>) -> Result<LoadedContract> {
    let name = contract.name().to_string();
    let entry_point = contract.entry_point().to_string();
    let operations = index_operations(&name, &entry_point, contract.operations())?;

    log::debug!(
        "loaded native contract {} ({} operations)",
        name,
        operations.len()
    );

    Ok(LoadedContract {
        name,
        entry_point,
        operations,
        body: ContractBody::Native(contract),
    })
}

fn index_operations(
    name: &str,
    entry_point: &str,
    specs: Vec<OperationSpec>,
) -> Result<IndexMap<String, OperationSpec>> {
    if name.trim().is_empty() {
        return Err(GammaVmError::load("Contract name is empty"));
    }
    if specs.is_empty() {
        return Err(GammaVmError::load(format!("Contract {} declares no operations", name)));
    }

    let mut operations = IndexMap::with_capacity(specs.len());
    for spec in specs {
        if spec.name.is_empty() {
            return Err(GammaVmError::load(format!("Contract {} has an unnamed operation", name)));
        }
        if operations.contains_key(&spec.name) {
            return Err(GammaVmError::load(format!(
                "Contract {} declares operation {} twice",
                name, spec.name
            )));
        }
        operations.insert(spec.name.clone(), spec);
    }

    match operations.get(entry_point) {
        None => Err(GammaVmError::load(format!(
            "Contract {} has no entry point {}",
            name, entry_point
        ))),
        Some(spec) if spec.visibility != Visibility::Public => Err(GammaVmError::load(format!(
            "Entry point {} of contract {} is not public",
            entry_point, name
        ))),
        Some(_) => Ok(operations),
    }
}

/// Deepest statement and expression nesting a definition may use
pub const MAX_DEFINITION_DEPTH: usize = 64;

type CheckResult = std::result::Result<(), String>;

fn descend(depth: usize) -> std::result::Result<usize, String> {
    if depth >= MAX_DEFINITION_DEPTH {
        return Err(format!("nesting deeper than {}", MAX_DEFINITION_DEPTH));
    }
    Ok(depth.saturating_add(1))
}

/// Static checks over one operation body
struct Checker<'a> {
    operations: &'a IndexMap<String, OperationSpec>,
    declared: HashSet<&'a str>,
}

fn check_operation(operations: &IndexMap<String, OperationSpec>, op: &OperationDef) -> CheckResult {
    let mut declared = HashSet::new();
    for param in &op.params {
        if !declared.insert(param.as_str()) {
            return Err(format!("parameter {} declared twice", param));
        }
    }
    collect_bindings(&op.body, &mut declared, 0)?;

    let checker = Checker {
        operations,
        declared,
    };
    checker.block(&op.body, 0)
}

// Variables are scoped to the whole operation
fn collect_bindings<'a>(body: &'a [Stmt], declared: &mut HashSet<&'a str>, depth: usize) -> CheckResult {
    let depth = descend(depth)?;
    for stmt in body {
        match stmt {
            Stmt::Let { name, .. } => {
                declared.insert(name);
            }
            Stmt::For { var, body, .. } => {
                declared.insert(var);
                collect_bindings(body, declared, depth)?;
            }
            Stmt::If { then, otherwise, .. } => {
                collect_bindings(then, declared, depth)?;
                collect_bindings(otherwise, declared, depth)?;
            }
            Stmt::While { body, .. } => collect_bindings(body, declared, depth)?,
            Stmt::Assign { .. } | Stmt::Return(_) | Stmt::Expr(_) | Stmt::Fail(_) => {}
        }
    }
    Ok(())
}

impl Checker<'_> {
    fn block(&self, body: &[Stmt], depth: usize) -> CheckResult {
        body.iter().try_for_each(|stmt| self.stmt(stmt, depth))
    }

    fn stmt(&self, stmt: &Stmt, depth: usize) -> CheckResult {
        let depth = descend(depth)?;
        match stmt {
            Stmt::Let { value, .. } => self.expr(value, depth),
            Stmt::Assign { name, value } => {
                self.variable(name)?;
                self.expr(value, depth)
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                self.expr(cond, depth)?;
                self.block(then, depth)?;
                self.block(otherwise, depth)
            }
            Stmt::While { cond, body } => {
                self.expr(cond, depth)?;
                self.block(body, depth)
            }
            Stmt::For { from, to, body, .. } => {
                self.expr(from, depth)?;
                self.expr(to, depth)?;
                self.block(body, depth)
            }
            Stmt::Return(expr) | Stmt::Expr(expr) | Stmt::Fail(expr) => self.expr(expr, depth),
        }
    }

    fn expr(&self, expr: &Expr, depth: usize) -> CheckResult {
        let depth = descend(depth)?;
        match expr {
            Expr::Null | Expr::Int(_) | Expr::Bool(_) | Expr::Str(_) | Expr::Bytes(_) => Ok(()),
            Expr::Var(name) => self.variable(name),
            Expr::Unary { expr, .. } => self.expr(expr, depth),
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs, depth)?;
                self.expr(rhs, depth)
            }
            Expr::Call { operation, args } => {
                let spec = self
                    .operations
                    .get(operation)
                    .ok_or_else(|| format!("call to undefined operation {}", operation))?;
                if spec.arity != args.len() {
                    return Err(format!(
                        "{} expects {} arguments, got {}",
                        operation,
                        spec.arity,
                        args.len()
                    ));
                }
                self.exprs(args, depth)
            }
            // Other contracts are resolved at runtime
            Expr::Invoke { args, .. } => self.exprs(args, depth),
            Expr::Host { function, args } => {
                let host = HostFunction::from_name(function)
                    .ok_or_else(|| format!("unknown host function {}", function))?;
                host.check_arity(args.len()).map_err(|e| e.to_string())?;
                self.exprs(args, depth)
            }
        }
    }

    fn exprs(&self, exprs: &[Expr], depth: usize) -> CheckResult {
        exprs.iter().try_for_each(|expr| self.expr(expr, depth))
    }

    fn variable(&self, name: &str) -> CheckResult {
        if self.declared.contains(name) {
            Ok(())
        } else {
            Err(format!("undeclared variable {}", name))
        }
    }
}
