//! Core runtime for a tree-walking interpreter: the value model, scope
//! chain, procedure/closure call protocol, and symbolic term converter
//! that a full language front-end sits on top of.
//!
//! This crate does not parse program source and does not ship a
//! standard library. What it guarantees is the shape every one of those
//! outer layers has to agree on: how a value compares and clones, how a
//! name resolves through nested scopes, how a call links a callee's
//! frame to the right ancestor, and how any value can be turned into
//! and read back from a symbolic term.

pub mod ast;
pub mod config;
pub mod error;
pub mod ident;
pub mod interpreter;
pub mod object;
pub mod param;
pub mod predefined;
pub mod procedure;
pub mod scope;
pub mod term;
pub mod value;
pub mod writeback;

pub use config::InterpreterConfig;
pub use error::{Error, Result};
pub use ident::Identifier;
pub use interpreter::{Flow, Interpreter};
pub use param::{ParamMode, ParameterDescriptor};
pub use procedure::{ProcKind, ProcedureHandle};
pub use scope::{Lookup, Scope};
pub use term::Term;
pub use value::{Rational, Value};
