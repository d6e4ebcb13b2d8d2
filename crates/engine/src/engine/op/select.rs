//! Nodes that yield several banks per input bank.

use std::rc::Rc;

use dwquery_core::{AllDies, Attribute, DebugInfo, Die};
use tracing::trace;

use super::{BoxOp, Op};
use crate::engine::valfile::ValFile;
use crate::engine::value::{SlotValue, Value};
use crate::error::EvalError;
use crate::tree::Slot;

/// Every DIE of the store, for each input bank.
pub(crate) struct Universe {
    upstream: BoxOp,
    info: Rc<dyn DebugInfo>,
    dst: Slot,
    vf: Option<ValFile>,
    walk: Option<AllDies>,
    pos: usize,
}

impl Universe {
    pub(crate) fn new(upstream: BoxOp, info: Rc<dyn DebugInfo>, dst: Slot) -> Self {
        Universe { upstream, info, dst, vf: None, walk: None, pos: 0 }
    }
}

impl Op for Universe {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        loop {
            let (Some(vf), Some(walk)) = (&self.vf, &mut self.walk) else {
                let Some(vf) = self.upstream.next()? else {
                    return Ok(None);
                };
                self.walk = Some(AllDies::new(&*self.info)?);
                self.vf = Some(vf);
                self.pos = 0;
                continue;
            };

            if let Some(die) = walk.advance(&*self.info)? {
                let mut ret = vf.clone();
                ret.set(self.dst, SlotValue::at(die, self.pos))?;
                self.pos += 1;
                return Ok(Some(ret));
            }

            trace!(dies = self.pos, "universe exhausted");
            self.vf = None;
            self.walk = None;
        }
    }

    fn reset(&mut self) {
        self.vf = None;
        self.walk = None;
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        "sel_universe".into()
    }
}

/// Children of the DIE in `src`, in order.
pub(crate) struct Child {
    upstream: BoxOp,
    info: Rc<dyn DebugInfo>,
    src: Slot,
    dst: Slot,
    vf: Option<ValFile>,
    child: Option<Die>,
    pos: usize,
}

impl Child {
    pub(crate) fn new(upstream: BoxOp, info: Rc<dyn DebugInfo>, src: Slot, dst: Slot) -> Self {
        Child { upstream, info, src, dst, vf: None, child: None, pos: 0 }
    }
}

impl Op for Child {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        loop {
            if let (Some(vf), Some(child)) = (&self.vf, self.child) {
                let mut ret = vf.clone();
                if self.src == self.dst {
                    ret.invalidate(self.dst);
                }
                ret.set(self.dst, SlotValue::at(child, self.pos))?;
                self.pos += 1;
                self.child = self.info.next_sibling(child)?;
                if self.child.is_none() {
                    self.vf = None;
                }
                return Ok(Some(ret));
            }

            let Some(vf) = self.upstream.next()? else {
                return Ok(None);
            };
            if let Value::Die(die) = vf.value(self.src)? {
                self.child = self.info.first_child(*die)?;
                if self.child.is_some() {
                    self.vf = Some(vf);
                    self.pos = 0;
                }
            }
        }
    }

    fn reset(&mut self) {
        self.vf = None;
        self.child = None;
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        "f_child".into()
    }
}

/// Attributes of the DIE in `src`, in encoding order.
pub(crate) struct Attributes {
    upstream: BoxOp,
    info: Rc<dyn DebugInfo>,
    src: Slot,
    dst: Slot,
    vf: Option<ValFile>,
    pending: std::vec::IntoIter<Attribute>,
    pos: usize,
}

impl Attributes {
    pub(crate) fn new(upstream: BoxOp, info: Rc<dyn DebugInfo>, src: Slot, dst: Slot) -> Self {
        Attributes { upstream, info, src, dst, vf: None, pending: Vec::new().into_iter(), pos: 0 }
    }
}

impl Op for Attributes {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        loop {
            if let Some(vf) = &self.vf {
                if let Some(attr) = self.pending.next() {
                    let mut ret = vf.clone();
                    if self.src == self.dst {
                        ret.invalidate(self.dst);
                    }
                    ret.set(self.dst, SlotValue::at(attr, self.pos))?;
                    self.pos += 1;
                    return Ok(Some(ret));
                }
                self.vf = None;
            }

            let Some(vf) = self.upstream.next()? else {
                return Ok(None);
            };
            if let Value::Die(die) = vf.value(self.src)? {
                self.pending = self.info.attributes(*die)?.into_iter();
                self.pos = 0;
                self.vf = Some(vf);
            }
        }
    }

    fn reset(&mut self) {
        self.vf = None;
        self.pending = Vec::new().into_iter();
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        "f_attribute".into()
    }
}

/// Elements of the sequence in `src`, annotated with position and count.
/// A location-list entry explodes into its operations.
pub(crate) struct Each {
    upstream: BoxOp,
    src: Slot,
    dst: Slot,
    vf: Option<ValFile>,
    elements: Vec<Value>,
    pos: usize,
}

impl Each {
    pub(crate) fn new(upstream: BoxOp, src: Slot, dst: Slot) -> Self {
        Each { upstream, src, dst, vf: None, elements: Vec::new(), pos: 0 }
    }
}

impl Op for Each {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        loop {
            if let Some(vf) = &self.vf {
                if let Some(element) = self.elements.get(self.pos) {
                    let mut ret = vf.clone();
                    ret.set(self.dst, SlotValue::counted(element.clone(), self.pos, self.elements.len()))?;
                    self.pos += 1;
                    return Ok(Some(ret));
                }
                self.vf = None;
            }

            let Some(vf) = self.upstream.next()? else {
                return Ok(None);
            };
            self.elements = match vf.value(self.src)? {
                Value::Seq(values) => values.to_vec(),
                Value::LoclistEntry(entry) => {
                    entry.ops.iter().map(|op| Value::LoclistOp(Rc::new(op.clone()))).collect()
                }
                _ => continue,
            };
            self.pos = 0;
            self.vf = Some(vf);
        }
    }

    fn reset(&mut self) {
        self.vf = None;
        self.elements.clear();
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        "f_each".into()
    }
}
