//! Stack shuffling words, lowered onto slot moves.

use super::{BoxOp, Op};
use crate::engine::valfile::ValFile;
use crate::error::EvalError;
use crate::tree::Slot;

/// Copies `src` to `dst`, together with its position and count.
pub(crate) struct Duplicate {
    upstream: BoxOp,
    src: Slot,
    dst: Slot,
}

impl Duplicate {
    pub(crate) fn new(upstream: BoxOp, src: Slot, dst: Slot) -> Self {
        Duplicate { upstream, src, dst }
    }
}

impl Op for Duplicate {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        let Some(mut vf) = self.upstream.next()? else {
            return Ok(None);
        };
        let value = vf.get(self.src)?.clone();
        vf.set(self.dst, value)?;
        Ok(Some(vf))
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        format!("dup<{}->{}>", self.src, self.dst)
    }
}

/// Exchanges the contents of two slots.
pub(crate) struct Swap {
    upstream: BoxOp,
    a: Slot,
    b: Slot,
}

impl Swap {
    pub(crate) fn new(upstream: BoxOp, a: Slot, b: Slot) -> Self {
        Swap { upstream, a, b }
    }
}

impl Op for Swap {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        let Some(mut vf) = self.upstream.next()? else {
            return Ok(None);
        };
        let a = vf.get(self.a)?.clone();
        let b = vf.get(self.b)?.clone();
        vf.set(self.a, b)?;
        vf.set(self.b, a)?;
        Ok(Some(vf))
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        format!("swap<{}<->{}>", self.a, self.b)
    }
}

/// Unsets `dst`.
pub(crate) struct Invalidate {
    upstream: BoxOp,
    dst: Slot,
}

impl Invalidate {
    pub(crate) fn new(upstream: BoxOp, dst: Slot) -> Self {
        Invalidate { upstream, dst }
    }
}

impl Op for Invalidate {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        let Some(mut vf) = self.upstream.next()? else {
            return Ok(None);
        };
        vf.invalidate(self.dst);
        Ok(Some(vf))
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        format!("drop<{}>", self.dst)
    }
}
