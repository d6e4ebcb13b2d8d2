//! Compiler and lazy evaluator for stack-based queries over debug information.
//!
//! A query arrives as a [`Tree`] built by a front end. [`build`] allocates
//! register slots for every value the query keeps on its stack, rewrites
//! the tree where `count` or `?last` need to know how many values a
//! producer yields, simplifies it, and lowers it onto a chain of pipeline
//! nodes. The resulting [`Program`] is pulled one [`ValFile`] (register
//! bank) at a time.
//!
//! The data being queried is reached through [`dwquery_core::DebugInfo`].

pub mod compiler;
pub mod engine;
pub mod error;
pub mod tree;

pub use compiler::{BuildOptions, build, build_pred, build_with_options};
pub use engine::{PredProgram, PredResult, Program, Results, SlotValue, ValFile, Value};
pub use error::{BuildError, EvalError, SlotError};
pub use tree::{Arity, BinaryKind, CstKind, Literal, NullaryKind, Slot, Tree, TreeKind, UnaryKind};

