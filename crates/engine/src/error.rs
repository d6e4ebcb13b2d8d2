use dwquery_core::{InfoError, SlotType};

use crate::tree::Slot;

/// A tree that cannot be compiled into a program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("unbalanced stack effects")]
    UnbalancedAlternation,
    #[error("iteration doesn't have neutral stack effect")]
    NonNeutralIteration,
    #[error("capture with too complex stack effects")]
    ComplexCapture,
    #[error("format piece leaves its result below the top of stack")]
    ComplexFormatPiece,
    #[error("directly nested X/ disallowed")]
    NestedTransform,
    #[error("application depth of X/ must be an unsigned constant")]
    InvalidTransformDepth,
    #[error("stack underrun")]
    StackUnderflow,
    #[error("program needs {width} slots, at most {max} allowed")]
    TooWide { width: usize, max: usize },
    #[error("{0} is not a predicate")]
    NotAPredicate(&'static str),
    #[error("{kind} needs {expected}, got {literal}")]
    InvalidLiteral { kind: &'static str, expected: &'static str, literal: String },
}

/// A register bank read that the bank cannot satisfy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("slot {0} is unset")]
    Unset(Slot),
    #[error("slot {slot} holds {found}, expected {expected}")]
    Type { slot: Slot, expected: SlotType, found: SlotType },
    #[error("slot {slot} is out of range for a bank of width {width}")]
    OutOfRange { slot: Slot, width: usize },
}

/// Faults that abort evaluation of a program.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Data(#[from] InfoError),
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("invalid regular expression: {0}")]
    Regex(#[source] Box<fancy_regex::Error>),
    #[error("internal error: {0}")]
    Defect(&'static str),
}
