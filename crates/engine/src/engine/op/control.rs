//! Nodes that evaluate sub-pipelines for every upstream bank.

use std::collections::HashSet;

use tracing::trace;

use super::{BoxOp, Op, restart};
use crate::engine::valfile::ValFile;
use crate::engine::value::Value;
use crate::error::EvalError;
use crate::tree::Slot;

fn drain(op: &mut dyn Op, vf: ValFile) -> Result<Vec<ValFile>, EvalError> {
    restart(op, vf);
    let mut ret = Vec::new();
    while let Some(r) = op.next()? {
        ret.push(r);
    }
    Ok(ret)
}

/// Results of every branch in turn, for each upstream bank.
pub(crate) struct Alt {
    upstream: BoxOp,
    branches: Vec<BoxOp>,
    vf: Option<ValFile>,
    branch: usize,
}

impl Alt {
    pub(crate) fn new(upstream: BoxOp, branches: Vec<BoxOp>) -> Self {
        Alt { upstream, branches, vf: None, branch: 0 }
    }
}

impl Op for Alt {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        loop {
            if let Some(vf) = &self.vf {
                while self.branch < self.branches.len() {
                    if let Some(r) = self.branches[self.branch].next()? {
                        return Ok(Some(r));
                    }
                    self.branch += 1;
                    if let Some(branch) = self.branches.get_mut(self.branch) {
                        restart(branch.as_mut(), vf.clone());
                    }
                }
                self.vf = None;
            }

            let Some(vf) = self.upstream.next()? else {
                return Ok(None);
            };
            self.branch = 0;
            if let Some(branch) = self.branches.first_mut() {
                restart(branch.as_mut(), vf.clone());
            }
            self.vf = Some(vf);
        }
    }

    fn reset(&mut self) {
        self.vf = None;
        for branch in &mut self.branches {
            branch.reset();
        }
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        let branches: Vec<_> = self.branches.iter().map(|b| b.name()).collect();
        format!("alt<{}>", branches.join("|"))
    }
}

/// Collects the `src` value of every body result into one sequence in `dst`.
pub(crate) struct Capture {
    upstream: BoxOp,
    body: BoxOp,
    src: Slot,
    dst: Slot,
}

impl Capture {
    pub(crate) fn new(upstream: BoxOp, body: BoxOp, src: Slot, dst: Slot) -> Self {
        Capture { upstream, body, src, dst }
    }
}

impl Op for Capture {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        let Some(mut vf) = self.upstream.next()? else {
            return Ok(None);
        };
        let values = drain(self.body.as_mut(), vf.clone())?
            .iter()
            .map(|r| r.value(self.src).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        vf.set_value(self.dst, Value::seq(values))?;
        Ok(Some(vf))
    }

    fn reset(&mut self) {
        self.body.reset();
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        format!("capture<{}>", self.body.name())
    }
}

/// `X*`: each upstream bank, then every bank reachable from it through
/// repeated application of the body, depth first. A bank whose `live` slots
/// hold values already yielded for the current upstream bank is not visited
/// again.
pub(crate) struct CloseStar {
    upstream: BoxOp,
    body: BoxOp,
    live: Vec<Slot>,
    stack: Vec<ValFile>,
    seen: HashSet<Vec<Option<Value>>>,
}

impl CloseStar {
    pub(crate) fn new(upstream: BoxOp, body: BoxOp, live: Vec<Slot>) -> Self {
        CloseStar { upstream, body, live, stack: Vec::new(), seen: HashSet::new() }
    }
}

fn live_key(live: &[Slot], vf: &ValFile) -> Vec<Option<Value>> {
    live.iter().map(|&slot| vf.value(slot).ok().cloned()).collect()
}

impl Op for CloseStar {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        loop {
            if let Some(vf) = self.stack.pop() {
                let fresh: Vec<_> = drain(self.body.as_mut(), vf.clone())?
                    .into_iter()
                    .filter(|r| self.seen.insert(live_key(&self.live, r)))
                    .collect();
                self.stack.extend(fresh.into_iter().rev());
                return Ok(Some(vf));
            }

            let Some(vf) = self.upstream.next()? else {
                return Ok(None);
            };
            if !self.seen.is_empty() {
                trace!(visited = self.seen.len(), "closure done with a bank");
            }
            self.seen.clear();
            self.seen.insert(live_key(&self.live, &vf));
            self.stack.push(vf);
        }
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.seen.clear();
        self.body.reset();
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        format!("close<{}>", self.body.name())
    }
}

/// Runs the body on a copy of each upstream bank and yields the upstream
/// bank with the body's `src` result placed in `dst`.
pub(crate) struct Protect {
    upstream: BoxOp,
    body: BoxOp,
    src: Slot,
    dst: Slot,
    vf: Option<ValFile>,
}

impl Protect {
    pub(crate) fn new(upstream: BoxOp, body: BoxOp, src: Slot, dst: Slot) -> Self {
        Protect { upstream, body, src, dst, vf: None }
    }
}

impl Op for Protect {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        loop {
            if let Some(vf) = &self.vf {
                if let Some(r) = self.body.next()? {
                    let mut ret = vf.clone();
                    ret.set(self.dst, r.get(self.src)?.clone())?;
                    return Ok(Some(ret));
                }
                self.vf = None;
            }

            let Some(vf) = self.upstream.next()? else {
                return Ok(None);
            };
            restart(self.body.as_mut(), vf.clone());
            self.vf = Some(vf);
        }
    }

    fn reset(&mut self) {
        self.vf = None;
        self.body.reset();
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        format!("protect<{}>", self.body.name())
    }
}

pub(crate) enum Piece {
    Lit(String),
    Computed { op: BoxOp, src: Slot },
}

/// Every combination of the rendered pieces, first piece outermost.
pub(crate) struct Format {
    upstream: BoxOp,
    pieces: Vec<Piece>,
    dst: Slot,
    vf: Option<ValFile>,
    rendered: Vec<Vec<String>>,
    odometer: Vec<usize>,
}

impl Format {
    pub(crate) fn new(upstream: BoxOp, pieces: Vec<Piece>, dst: Slot) -> Self {
        Format { upstream, pieces, dst, vf: None, rendered: Vec::new(), odometer: Vec::new() }
    }

    fn render(&mut self, vf: &ValFile) -> Result<(), EvalError> {
        self.rendered.clear();
        for piece in &mut self.pieces {
            let strings = match piece {
                Piece::Lit(s) => vec![s.clone()],
                Piece::Computed { op, src } => drain(op.as_mut(), vf.clone())?
                    .iter()
                    .map(|r| r.value(*src).map(ToString::to_string))
                    .collect::<Result<_, _>>()?,
            };
            self.rendered.push(strings);
        }
        Ok(())
    }

    fn advance(&mut self) -> bool {
        for (i, strings) in self.rendered.iter().enumerate().rev() {
            self.odometer[i] += 1;
            if self.odometer[i] < strings.len() {
                return true;
            }
            self.odometer[i] = 0;
        }
        false
    }
}

impl Op for Format {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        loop {
            if let Some(vf) = &self.vf {
                let text: String =
                    self.rendered.iter().zip(&self.odometer).map(|(strings, &i)| strings[i].as_str()).collect();
                let mut ret = vf.clone();
                ret.set_value(self.dst, text)?;
                if !self.advance() {
                    self.vf = None;
                }
                return Ok(Some(ret));
            }

            let Some(vf) = self.upstream.next()? else {
                return Ok(None);
            };
            self.render(&vf)?;
            if self.rendered.iter().any(Vec::is_empty) {
                continue;
            }
            self.odometer = vec![0; self.rendered.len()];
            self.vf = Some(vf);
        }
    }

    fn reset(&mut self) {
        self.vf = None;
        for piece in &mut self.pieces {
            if let Piece::Computed { op, .. } = piece {
                op.reset();
            }
        }
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        "format".into()
    }
}
