//! Pipeline nodes.
//!
//! Every node pulls register banks from the single upstream node it owns
//! and yields banks of its own. Nodes keep just enough state between calls
//! to [`Op::next`] to resume where they stopped. A node that evaluates a
//! sub-expression per input owns a separate sub-pipeline ending in its own
//! [`Origin`], which it resets and rebinds for every input bank.

mod control;
mod select;
mod shuffle;
mod transform;

pub(crate) use control::{Alt, Capture, CloseStar, Format, Piece, Protect};
pub(crate) use select::{Attributes, Child, Each, Universe};
pub(crate) use shuffle::{Duplicate, Invalidate, Swap};
pub(crate) use transform::{Arith, ArithOp, Literal, Transform, UnaryFn};

use super::pred::{Pred, PredResult};
use super::valfile::ValFile;
use crate::error::EvalError;

pub(crate) type BoxOp = Box<dyn Op>;

pub trait Op {
    /// Next bank, or `None` once exhausted. Only valid after a [`Op::reset`]
    /// has reached the origin and the origin has been bound.
    fn next(&mut self) -> Result<Option<ValFile>, EvalError>;

    /// Returns to the initial state, all the way up to the origin.
    fn reset(&mut self);

    /// Hands `vf` to the origin of this pipeline.
    fn bind(&mut self, vf: ValFile);

    fn name(&self) -> String;
}

/// Source of a pipeline: yields the one bank it was bound to.
#[derive(Debug)]
pub(crate) struct Origin {
    vf: Option<ValFile>,
    reset: bool,
}

impl Origin {
    pub(crate) fn new() -> Self {
        Origin { vf: None, reset: true }
    }
}

impl Op for Origin {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        Ok(self.vf.take())
    }

    fn reset(&mut self) {
        self.vf = None;
        self.reset = true;
    }

    fn bind(&mut self, vf: ValFile) {
        assert!(self.reset, "origin rebound without a reset");
        self.reset = false;
        self.vf = Some(vf);
    }

    fn name(&self) -> String {
        "origin".into()
    }
}

/// Resets `op` and starts it over on `vf`.
pub(crate) fn restart(op: &mut dyn Op, vf: ValFile) {
    op.reset();
    op.bind(vf);
}

/// Passes on the upstream banks the predicate accepts.
pub(crate) struct Assert {
    upstream: BoxOp,
    pred: Box<dyn Pred>,
}

impl Assert {
    pub(crate) fn new(upstream: BoxOp, pred: Box<dyn Pred>) -> Self {
        Assert { upstream, pred }
    }
}

impl Op for Assert {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        while let Some(vf) = self.upstream.next()? {
            if self.pred.result(&vf)? == PredResult::Yes {
                return Ok(Some(vf));
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.pred.reset();
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        format!("assert<{}>", self.pred.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_hands_out_its_bank_once() {
        let mut origin = Origin::new();
        restart(&mut origin, ValFile::new(1));
        assert!(origin.next().unwrap().is_some());
        assert!(origin.next().unwrap().is_none());
        restart(&mut origin, ValFile::new(1));
        assert!(origin.next().unwrap().is_some());
    }

    #[test]
    #[should_panic(expected = "origin rebound without a reset")]
    fn rebinding_needs_a_reset() {
        let mut origin = Origin::new();
        origin.bind(ValFile::new(1));
        origin.bind(ValFile::new(1));
    }
}
