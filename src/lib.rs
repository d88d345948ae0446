//! `trash` library crate.
//!
//! High-level layout:
//! - `combinator`: generic backtracking parser combinators with
//!   committed-alternative semantics
//! - frontend: `lexer` + `parser` produce the shared AST (`ast`)
//! - `interpreter`: tree-walking evaluator over host-extensible values
//!
//! Hosts drive the crate through [`parse`] and [`Evaluator::execute`],
//! supplying globals (native functions, custom objects) via
//! [`Env::with_bindings`] and the [`Callable`]/[`Indexable`] traits.

pub mod ast;
pub mod combinator;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod token;

pub use interpreter::{Callable, Env, Evaluator, Indexable, RuntimeError, ScriptObject, Value};
pub use parser::{ParseError, parse};
