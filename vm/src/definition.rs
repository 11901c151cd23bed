//! Contract definitions
//!
//! A contract definition is plain data: a name, an entry point and a list of
//! operations whose bodies are small statement trees. Definitions are read
//! from JSON with serde and checked by the [`loader`](crate::loader) before
//! anything runs.
//!
//! ```json
//! {
//!   "name": "counter",
//!   "operations": [
//!     { "name": "main", "body": [ { "return": { "int": 1 } } ] }
//!   ]
//! }
//! ```

use std::sync::Arc;

use gamma_program_runtime::{GammaVmError, Result};
use gamma_syscalls::{BinaryOp, UnaryOp};
use serde::{Deserialize, Serialize};

/// Entry point used when a definition does not name one
pub const DEFAULT_ENTRY_POINT: &str = "main";

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_string()
}

/// A complete contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDefinition {
    /// Contract name, also its storage namespace
    pub name: String,
    /// Operation run by `execute`
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    /// Declared operations
    pub operations: Vec<OperationDef>,
}

impl ContractDefinition {
    /// Parse a definition from JSON
    ///
    /// Malformed JSON is a [`GammaVmError::LoadError`].
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| GammaVmError::load(format!("Malformed contract definition: {}", e)))
    }

    /// Render as JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GammaVmError::load(format!("Cannot render contract definition: {}", e)))
    }
}

/// Who may call an operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Callable by the engine and by other contracts
    #[default]
    Public,
    /// Callable only from within the same contract
    Internal,
}

/// One operation of a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDef {
    /// Operation name
    pub name: String,
    /// Who may call it
    #[serde(default)]
    pub visibility: Visibility,
    /// Parameter names
    #[serde(default)]
    pub params: Vec<String>,
    /// Statements run in order
    #[serde(default)]
    pub body: Vec<Stmt>,
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// `null` literal
    Null,
    /// Integer literal
    Int(i64),
    /// Boolean literal
    Bool(bool),
    /// String literal
    Str(Arc<str>),
    /// Byte string literal
    Bytes(Arc<[u8]>),
    /// Variable read
    Var(String),
    /// Unary operator
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        expr: Box<Expr>,
    },
    /// Binary operator
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Call another operation of the same contract
    Call {
        /// Operation name
        operation: String,
        /// Arguments
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// Call a public operation of another contract
    Invoke {
        /// Contract name
        contract: String,
        /// Operation name
        operation: String,
        /// Arguments
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// Call a host function
    Host {
        /// Host function name
        function: String,
        /// Arguments
        #[serde(default)]
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Integer literal
    pub fn int(value: i64) -> Self {
        Expr::Int(value)
    }

    /// String literal
    pub fn str(value: impl Into<String>) -> Self {
        Expr::Str(Arc::from(value.into()))
    }

    /// Variable read
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    /// Unary operator
    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    /// Binary operator
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Helper call
    pub fn call(operation: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            operation: operation.into(),
            args,
        }
    }

    /// Cross-contract call
    pub fn invoke(contract: impl Into<String>, operation: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Invoke {
            contract: contract.into(),
            operation: operation.into(),
            args,
        }
    }

    /// Host function call
    pub fn host(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Host {
            function: function.into(),
            args,
        }
    }
}

/// Statements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// Bind a variable
    Let {
        /// Variable name
        name: String,
        /// Initial value
        value: Expr,
    },
    /// Rebind an existing variable
    Assign {
        /// Variable name
        name: String,
        /// New value
        value: Expr,
    },
    /// Conditional
    If {
        /// Must evaluate to a boolean
        cond: Expr,
        /// Run when `cond` is true
        then: Vec<Stmt>,
        /// Run when `cond` is false
        #[serde(rename = "else", default)]
        otherwise: Vec<Stmt>,
    },
    /// Loop while `cond` is true
    While {
        /// Must evaluate to a boolean
        cond: Expr,
        /// Loop body
        body: Vec<Stmt>,
    },
    /// Loop `var` over `from..to` (end exclusive)
    For {
        /// Loop variable
        var: String,
        /// First value
        from: Expr,
        /// End, exclusive
        to: Expr,
        /// Loop body
        body: Vec<Stmt>,
    },
    /// Return from the operation
    Return(Expr),
    /// Evaluate for effect
    Expr(Expr),
    /// Abort with a runtime fault carrying the rendered value
    Fail(Expr),
}

impl Stmt {
    /// `let name = value`
    pub fn let_(name: impl Into<String>, value: Expr) -> Self {
        Stmt::Let {
            name: name.into(),
            value,
        }
    }

    /// `name = value`
    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Stmt::Assign {
            name: name.into(),
            value,
        }
    }
}
