//! Predicates over a single register bank.
//!
//! Besides yes and no, a predicate can fail: the slots it reads hold values
//! it has no answer for, such as a string compared with a constant. Failure
//! survives negation.

use core::cmp::Ordering;
use std::rc::Rc;

use dwquery_core::{At, DebugInfo, Tag};
use fancy_regex::Regex;

use super::op::{BoxOp, restart};
use super::valfile::ValFile;
use super::value::{SlotValue, Value};
use crate::error::EvalError;
use crate::tree::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredResult {
    Yes,
    No,
    Fail,
}

impl PredResult {
    fn from_bool(b: bool) -> Self {
        if b { PredResult::Yes } else { PredResult::No }
    }
}

impl core::ops::Not for PredResult {
    type Output = PredResult;

    fn not(self) -> PredResult {
        match self {
            PredResult::Yes => PredResult::No,
            PredResult::No => PredResult::Yes,
            PredResult::Fail => PredResult::Fail,
        }
    }
}

pub(crate) trait Pred {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError>;

    /// Drops any state kept from earlier evaluations.
    fn reset(&mut self);

    fn name(&self) -> String;
}

pub(crate) type BoxPred = Box<dyn Pred>;

pub(crate) struct Not(pub(crate) BoxPred);

impl Pred for Not {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError> {
        Ok(!self.0.result(vf)?)
    }

    fn reset(&mut self) {
        self.0.reset();
    }

    fn name(&self) -> String {
        format!("not<{}>", self.0.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Logic {
    And,
    Or,
}

/// Both operands are always evaluated.
pub(crate) struct Combine {
    logic: Logic,
    a: BoxPred,
    b: BoxPred,
}

impl Combine {
    pub(crate) fn new(logic: Logic, a: BoxPred, b: BoxPred) -> Self {
        Combine { logic, a, b }
    }
}

impl Pred for Combine {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError> {
        let a = self.a.result(vf)?;
        let b = self.b.result(vf)?;
        Ok(match (a, b) {
            (PredResult::Fail, _) | (_, PredResult::Fail) => PredResult::Fail,
            _ => match self.logic {
                Logic::And => PredResult::from_bool(a == PredResult::Yes && b == PredResult::Yes),
                Logic::Or => PredResult::from_bool(a == PredResult::Yes || b == PredResult::Yes),
            },
        })
    }

    fn reset(&mut self) {
        self.a.reset();
        self.b.reset();
    }

    fn name(&self) -> String {
        let word = match self.logic {
            Logic::And => "and",
            Logic::Or => "or",
        };
        format!("{word}<{};{}>", self.a.name(), self.b.name())
    }
}

/// `?AT_name`: a DIE has the attribute, possibly through an abstract origin,
/// or an attribute is the one named.
pub(crate) struct HasAttribute {
    info: Rc<dyn DebugInfo>,
    name: At,
    src: Slot,
}

impl HasAttribute {
    pub(crate) fn new(info: Rc<dyn DebugInfo>, name: At, src: Slot) -> Self {
        HasAttribute { info, name, src }
    }
}

impl Pred for HasAttribute {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError> {
        Ok(match vf.value(self.src)? {
            Value::Die(die) => PredResult::from_bool(self.info.has_attribute_integrate(*die, self.name)?),
            Value::Attr(attr) => PredResult::from_bool(attr.name == self.name),
            _ => PredResult::Fail,
        })
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        format!("?{}", self.name)
    }
}

/// `?TAG_name`
pub(crate) struct HasTag {
    info: Rc<dyn DebugInfo>,
    tag: Tag,
    src: Slot,
}

impl HasTag {
    pub(crate) fn new(info: Rc<dyn DebugInfo>, tag: Tag, src: Slot) -> Self {
        HasTag { info, tag, src }
    }
}

impl Pred for HasTag {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError> {
        Ok(match vf.value(self.src)? {
            Value::Die(die) => PredResult::from_bool(self.info.tag(*die)? == self.tag),
            _ => PredResult::Fail,
        })
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        format!("?{}", self.tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Lt,
    Gt,
}

/// Ordering comparison of two slots. `ne`, `ge` and `le` are the negations
/// of `eq`, `lt` and `gt`.
pub(crate) struct Compare {
    op: CmpOp,
    negate: bool,
    a: Slot,
    b: Slot,
}

impl Compare {
    pub(crate) fn new(op: CmpOp, negate: bool, a: Slot, b: Slot) -> Self {
        Compare { op, negate, a, b }
    }
}

impl Pred for Compare {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError> {
        let Some(ord) = vf.compare(self.a, self.b)? else {
            return Ok(PredResult::Fail);
        };
        let want = match self.op {
            CmpOp::Eq => Ordering::Equal,
            CmpOp::Lt => Ordering::Less,
            CmpOp::Gt => Ordering::Greater,
        };
        let ret = PredResult::from_bool(ord == want);
        Ok(if self.negate { !ret } else { ret })
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        let word = match (self.op, self.negate) {
            (CmpOp::Eq, false) => "eq",
            (CmpOp::Eq, true) => "ne",
            (CmpOp::Lt, false) => "lt",
            (CmpOp::Lt, true) => "ge",
            (CmpOp::Gt, false) => "gt",
            (CmpOp::Gt, true) => "le",
        };
        format!("?{word}")
    }
}

/// `?find`: substring of a string, or element of a sequence.
pub(crate) struct Find {
    haystack: Slot,
    needle: Slot,
}

impl Find {
    pub(crate) fn new(haystack: Slot, needle: Slot) -> Self {
        Find { haystack, needle }
    }
}

impl Pred for Find {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError> {
        Ok(match (vf.value(self.haystack)?, vf.value(self.needle)?) {
            (Value::Str(haystack), Value::Str(needle)) => PredResult::from_bool(haystack.contains(needle.as_str())),
            (Value::Seq(values), needle) => {
                PredResult::from_bool(values.iter().any(|value| value.compare(needle) == Some(Ordering::Equal)))
            }
            _ => PredResult::Fail,
        })
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        "?find".into()
    }
}

/// `?match`: the whole string matches a regular expression. The last
/// compiled pattern is kept.
pub(crate) struct Match {
    text: Slot,
    pattern: Slot,
    cache: Option<(String, Regex)>,
}

impl Match {
    pub(crate) fn new(text: Slot, pattern: Slot) -> Self {
        Match { text, pattern, cache: None }
    }

    fn regex(&mut self, pattern: &str) -> Result<&Regex, EvalError> {
        if self.cache.as_ref().is_none_or(|(cached, _)| cached != pattern) {
            let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| EvalError::Regex(Box::new(e)))?;
            self.cache = Some((pattern.to_owned(), re));
        }
        match &self.cache {
            Some((_, re)) => Ok(re),
            None => Err(EvalError::Defect("regex cache empty after compilation")),
        }
    }
}

impl Pred for Match {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError> {
        let (Value::Str(text), Value::Str(pattern)) = (vf.value(self.text)?, vf.value(self.pattern)?) else {
            return Ok(PredResult::Fail);
        };
        let matched = self.regex(pattern)?.is_match(text).map_err(|e| EvalError::Regex(Box::new(e)))?;
        Ok(PredResult::from_bool(matched))
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        "?match".into()
    }
}

/// `?empty`
pub(crate) struct Empty {
    src: Slot,
}

impl Empty {
    pub(crate) fn new(src: Slot) -> Self {
        Empty { src }
    }
}

impl Pred for Empty {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError> {
        Ok(match vf.value(self.src)? {
            Value::Seq(values) => PredResult::from_bool(values.is_empty()),
            Value::Str(s) => PredResult::from_bool(s.is_empty()),
            _ => PredResult::Fail,
        })
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        "?empty".into()
    }
}

/// `?root`: the DIE is the root of its unit. Walks the list of units.
pub(crate) struct Root {
    info: Rc<dyn DebugInfo>,
    src: Slot,
}

impl Root {
    pub(crate) fn new(info: Rc<dyn DebugInfo>, src: Slot) -> Self {
        Root { info, src }
    }
}

impl Pred for Root {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError> {
        Ok(match vf.value(self.src)? {
            Value::Die(die) => PredResult::from_bool(self.info.is_unit_root(*die)?),
            _ => PredResult::Fail,
        })
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        "?root".into()
    }
}

/// `?last`: the value is the last one its producer yielded.
pub(crate) struct Last {
    src: Slot,
}

impl Last {
    pub(crate) fn new(src: Slot) -> Self {
        Last { src }
    }
}

impl Pred for Last {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError> {
        let sv = vf.get(self.src)?;
        Ok(match sv.count {
            Some(count) => PredResult::from_bool(sv.pos + 1 == count),
            None => PredResult::Fail,
        })
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        "?last".into()
    }
}

/// `?{X}`: the sub-expression yields at least one bank.
pub(crate) struct SubxAny {
    op: BoxOp,
}

impl SubxAny {
    pub(crate) fn new(op: BoxOp) -> Self {
        SubxAny { op }
    }
}

impl Pred for SubxAny {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError> {
        restart(self.op.as_mut(), vf.clone());
        Ok(PredResult::from_bool(self.op.next()?.is_some()))
    }

    fn reset(&mut self) {
        self.op.reset();
    }

    fn name(&self) -> String {
        format!("?{{{}}}", self.op.name())
    }
}

/// `?all{X}`: the sub-expression yields for every element of the sequence
/// in `src`, with the element in place of the sequence.
pub(crate) struct SubxAll {
    op: BoxOp,
    src: Slot,
}

impl SubxAll {
    pub(crate) fn new(op: BoxOp, src: Slot) -> Self {
        SubxAll { op, src }
    }
}

impl Pred for SubxAll {
    fn result(&mut self, vf: &ValFile) -> Result<PredResult, EvalError> {
        let Value::Seq(values) = vf.value(self.src)? else {
            return Ok(PredResult::Fail);
        };
        let count = values.len();
        for (pos, value) in values.iter().enumerate() {
            let mut element = vf.clone();
            element.set(self.src, SlotValue::counted(value.clone(), pos, count))?;
            restart(self.op.as_mut(), element);
            if self.op.next()?.is_none() {
                return Ok(PredResult::No);
            }
        }
        Ok(PredResult::Yes)
    }

    fn reset(&mut self) {
        self.op.reset();
    }

    fn name(&self) -> String {
        format!("?all{{{}}}", self.op.name())
    }
}
