use crate::dwarf::{At, Form};

/// Faults raised by a debug-info source while answering a query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InfoError {
    #[error("malformed {name} ({form}): {reason}")]
    Malformed { name: At, form: Form, reason: String },
    #[error("no DIE at offset {0:#x}")]
    UnknownDie(u64),
    #[error("not implemented: {0}")]
    Unimplemented(String),
}

impl InfoError {
    pub fn malformed(name: At, form: Form, reason: impl Into<String>) -> Self {
        InfoError::Malformed { name, form, reason: reason.into() }
    }
}
