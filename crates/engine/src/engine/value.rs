use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::rc::Rc;

use dwquery_core::{Attribute, Constant, Die, LineRecord, LocOp, LoclistEntry, SlotType};

/// A value held by a register slot.
#[derive(Debug, Clone)]
pub enum Value {
    Cst(Constant),
    Str(String),
    Flt(f64),
    Seq(Rc<Vec<Value>>),
    Die(Die),
    Attr(Rc<Attribute>),
    Line(Rc<LineRecord>),
    LoclistEntry(Rc<LoclistEntry>),
    LoclistOp(Rc<LocOp>),
}

impl Value {
    pub fn seq(values: Vec<Value>) -> Self {
        Value::Seq(Rc::new(values))
    }

    pub fn slot_type(&self) -> SlotType {
        match self {
            Value::Cst(_) => SlotType::Cst,
            Value::Str(_) => SlotType::Str,
            Value::Flt(_) => SlotType::Flt,
            Value::Seq(_) => SlotType::Seq,
            Value::Die(_) => SlotType::Die,
            Value::Attr(_) => SlotType::Attribute,
            Value::Line(_) => SlotType::Line,
            Value::LoclistEntry(_) => SlotType::LoclistEntry,
            Value::LoclistOp(_) => SlotType::LoclistOp,
        }
    }

    /// Orders two values of the same type. `None` when the types differ or
    /// the values are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Cst(a), Value::Cst(b)) => a.compare(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Flt(a), Value::Flt(b)) => a.partial_cmp(b),
            (Value::Seq(a), Value::Seq(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => {}
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            (Value::Die(a), Value::Die(b)) => Some(a.cmp(b)),
            (Value::Attr(a), Value::Attr(b)) => Some(a.cmp(b)),
            (Value::Line(a), Value::Line(b)) => Some(a.cmp(b)),
            (Value::LoclistEntry(a), Value::LoclistEntry(b)) => Some(a.cmp(b)),
            (Value::LoclistOp(a), Value::LoclistOp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Cst(a), Value::Cst(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Flt(a), Value::Flt(b)) => a.to_bits() == b.to_bits(),
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Die(a), Value::Die(b)) => a == b,
            (Value::Attr(a), Value::Attr(b)) => a == b,
            (Value::Line(a), Value::Line(b)) => a == b,
            (Value::LoclistEntry(a), Value::LoclistEntry(b)) => a == b,
            (Value::LoclistOp(a), Value::LoclistOp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Cst(c) => c.hash(state),
            Value::Str(s) => s.hash(state),
            Value::Flt(f) => f.to_bits().hash(state),
            Value::Seq(values) => values.hash(state),
            Value::Die(d) => d.hash(state),
            Value::Attr(a) => a.hash(state),
            Value::Line(l) => l.hash(state),
            Value::LoclistEntry(e) => e.hash(state),
            Value::LoclistOp(o) => o.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Cst(c) => write!(f, "{c}"),
            Value::Str(s) => f.write_str(s),
            Value::Flt(x) => write!(f, "{x}"),
            Value::Seq(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match v {
                        Value::Str(s) => write!(f, "{s:?}")?,
                        _ => write!(f, "{v}")?,
                    }
                }
                f.write_str("]")
            }
            Value::Die(d) => write!(f, "{d}"),
            Value::Attr(a) => write!(f, "{a}"),
            Value::Line(l) => write!(f, "{l}"),
            Value::LoclistEntry(e) => write!(f, "{e}"),
            Value::LoclistOp(o) => write!(f, "{o}"),
        }
    }
}

impl From<Constant> for Value {
    fn from(value: Constant) -> Self {
        Value::Cst(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Die> for Value {
    fn from(value: Die) -> Self {
        Value::Die(value)
    }
}

impl From<Attribute> for Value {
    fn from(value: Attribute) -> Self {
        Value::Attr(Rc::new(value))
    }
}

/// A value together with where it came from in its producer's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotValue {
    pub value: Value,
    /// Index among the values the producer yielded for one input.
    pub pos: usize,
    /// Total number of those values, when the producer knows it.
    pub count: Option<usize>,
}

impl SlotValue {
    pub fn new(value: impl Into<Value>) -> Self {
        SlotValue { value: value.into(), pos: 0, count: None }
    }

    pub fn at(value: impl Into<Value>, pos: usize) -> Self {
        SlotValue { value: value.into(), pos, count: None }
    }

    pub fn counted(value: impl Into<Value>, pos: usize, count: usize) -> Self {
        SlotValue { value: value.into(), pos, count: Some(count) }
    }
}
