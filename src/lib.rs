//! # Tua
//!
//! A small, statically typed dialect of Lua with a tree-walking interpreter.
//!
//! Tua programs are nominally typed with no implicit conversions: every
//! binding carries a declared type, operators check their operand types at
//! evaluation time, and lists are homogeneous with a parametric element type
//! (`List[int]`, `List[List[string]]`, ...). Functions are called with
//! by-value argument copies and a fresh scope, and built-ins such as
//! `ipairs` feed the generic `for k, v in ...` loop through a lazy key/value
//! stream.
//!
//! ## Quick start
//!
//! ```
//! use tua::{Evaluator, Parser, Scanner, Value};
//!
//! # fn main() -> tua::Result<()> {
//! let code = r#"
//!     let s: int = 0
//!     for i = 1, i <= 10, 1 do s = s + i end
//! "#;
//!
//! // Tokenize
//! let mut scanner = Scanner::new(code);
//! let tokens = scanner.scan_tokens()?;
//!
//! // Parse into a syntax tree
//! let mut parser = Parser::new(tokens);
//! let program = parser.parse()?;
//!
//! // Execute
//! let mut evaluator = Evaluator::new();
//! evaluator.execute(&program)?;
//!
//! assert_eq!(evaluator.scope.get("s"), Some(&Value::Int(55)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Source Code -> Scanner -> Tokens -> Parser -> AST -> Evaluator
//! ```
//!
//! - [`Scanner`] - tokenizes source code
//! - [`Parser`] - parses tokens into the syntax tree
//! - [`Evaluator`] - walks the tree, enforcing the type discipline
//! - [`Value`] / [`Type`] - runtime values and their nominal types
//! - [`ScopeStack`] - nested lexical frames over a persistent program frame
//! - [`ToolRegistry`] - the fixed set of built-ins (`print`, `type`, `len`,
//!   `concat`, `append`, `pop`, `ipairs`, `dump_stack`)
//!
//! ## Errors
//!
//! Scan, parse, and semantic errors all abort the current program with an
//! [`Error`] naming the offending identifier, operator, or types; nothing is
//! recovered locally.
//!
//! ```
//! use tua::{Evaluator, Parser, Scanner};
//!
//! let code = r#"
//!     let x: int = 1
//!     x = "hi"
//! "#;
//!
//! let tokens = Scanner::new(code).scan_tokens().unwrap();
//! let program = Parser::new(tokens).parse().unwrap();
//! let err = Evaluator::new().execute(&program).unwrap_err();
//! assert!(err.to_string().contains("Type mismatch"));
//! ```

/// Version of the Tua interpreter
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod tools;

// Re-export main types
pub use error::{Error, Result};
pub use lexer::{Scanner, Token, TokenKind};
pub use parser::{
    BinaryOp, Block, Expression, FunctionCall, IfArm, Parser, Program, Statement, TypedName,
    UnaryOp,
};
pub use runtime::{Evaluator, Function, List, ScopeStack, Type, Value};
pub use tools::{PairStream, Tool, ToolOutput, ToolRegistry};
