//! Lazy evaluation of compiled programs.
//!
//! A [`Program`] is a chain of pipeline nodes pulled from the end. Nothing
//! is computed until a result is asked for, and each pull computes just
//! enough to produce one more register bank.

pub(crate) mod op;
pub(crate) mod pred;
mod valfile;
mod value;

use tracing::trace;

pub use pred::PredResult;
pub use valfile::ValFile;
pub use value::{SlotValue, Value};

use self::op::{BoxOp, Op};
use self::pred::BoxPred;
use crate::error::EvalError;
use crate::tree::Tree;

/// A compiled query.
///
/// Programs are single-threaded and stateful: [`Program::run`] borrows the
/// program mutably for as long as its results are being pulled, and a
/// second run starts over from scratch.
pub struct Program {
    tree: Tree,
    width: usize,
    op: BoxOp,
}

impl Program {
    pub(crate) fn new(tree: Tree, width: usize, op: BoxOp) -> Self {
        Program { tree, width, op }
    }

    /// Number of register slots every bank of this program has.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The tree after simplification and slot allocation.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// An empty bank of the program's width, for programs that take no input.
    pub fn bank(&self) -> ValFile {
        ValFile::new(self.width)
    }

    /// Puts every node back into its initial state.
    pub fn reset(&mut self) {
        self.op.reset();
    }

    /// Evaluates the program on `bank`. The bank is resized to the program's
    /// width; its bottom slots are the program's inputs.
    ///
    /// Results are computed as they are pulled. After the first error the
    /// iterator is exhausted.
    #[must_use = "iterators are lazy and do nothing unless consumed"]
    pub fn run(&mut self, bank: &ValFile) -> Results<'_> {
        trace!(width = self.width, "starting run");
        self.op.reset();
        self.op.bind(bank.copy(self.width));
        Results { op: self.op.as_mut(), done: false }
    }
}

impl core::fmt::Debug for Program {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Program")
            .field("tree", &self.tree.to_string())
            .field("width", &self.width)
            .field("op", &self.op.name())
            .finish()
    }
}

/// Result banks of one [`Program::run`].
pub struct Results<'a> {
    op: &'a mut dyn Op,
    done: bool,
}

impl Iterator for Results<'_> {
    type Item = Result<ValFile, EvalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.op.next() {
            Ok(Some(vf)) => Some(Ok(vf)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl core::iter::FusedIterator for Results<'_> {}

/// A compiled predicate, answering yes, no or fail for a bank.
pub struct PredProgram {
    tree: Tree,
    width: usize,
    pred: BoxPred,
}

impl PredProgram {
    pub(crate) fn new(tree: Tree, width: usize, pred: BoxPred) -> Self {
        PredProgram { tree, width, pred }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn evaluate(&mut self, bank: &ValFile) -> Result<PredResult, EvalError> {
        self.pred.reset();
        self.pred.result(&bank.copy(self.width))
    }
}

impl core::fmt::Debug for PredProgram {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PredProgram")
            .field("tree", &self.tree.to_string())
            .field("width", &self.width)
            .field("pred", &self.pred.name())
            .finish()
    }
}
