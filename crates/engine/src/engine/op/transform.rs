//! One-to-one nodes: every upstream bank yields at most one bank.

use std::rc::Rc;

use dwquery_core::{At, Constant, DebugInfo, Decoded, Domain};

use super::{BoxOp, Op};
use crate::engine::valfile::ValFile;
use crate::engine::value::{SlotValue, Value};
use crate::error::EvalError;
use crate::tree::Slot;

fn length(n: usize) -> Result<Value, EvalError> {
    u64::try_from(n).map(|n| Value::Cst(Constant::unsigned(n))).map_err(|_| EvalError::Overflow)
}

fn decoded(value: Decoded) -> Value {
    match value {
        Decoded::Str(s) => Value::Str(s),
        Decoded::Cst(c) => Value::Cst(c),
        Decoded::Ref(die) => Value::Die(die),
        Decoded::Bytes(bytes) => {
            Value::seq(bytes.into_iter().map(|b| Value::Cst(Constant::unsigned(u64::from(b)))).collect())
        }
    }
}

/// Function of a single slot value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryFn {
    Parent,
    Prev,
    Next,
    Offset,
    Tag,
    Name,
    Form,
    Value,
    AttrNamed(At),
    Type,
    Pos,
    Count,
    Length,
    Cast(Domain),
    Unit,
}

impl UnaryFn {
    /// Result for `sv`, or `None` when the function does not apply to it.
    pub(crate) fn apply(self, info: &dyn DebugInfo, sv: &SlotValue) -> Result<Option<Value>, EvalError> {
        let value = &sv.value;
        let ret = match (self, value) {
            (UnaryFn::Parent, Value::Die(die)) => info.parent(*die)?.map(Value::Die),
            (UnaryFn::Prev, Value::Die(die)) => info.prev_sibling(*die)?.map(Value::Die),
            (UnaryFn::Next, Value::Die(die)) => info.next_sibling(*die)?.map(Value::Die),
            (UnaryFn::Unit, Value::Die(die)) => Some(Value::Die(info.unit_of(*die)?)),

            (UnaryFn::Offset, Value::Die(die)) => Some(Value::Cst(Constant::unsigned(die.offset()))),
            (UnaryFn::Offset, Value::LoclistOp(op)) => Some(Value::Cst(Constant::unsigned(op.offset))),

            (UnaryFn::Tag, Value::Die(die)) => Some(Value::Cst(Constant::tag(info.tag(*die)?))),

            (UnaryFn::Name, Value::Die(die)) => match info.attribute_integrate(*die, At::NAME)? {
                Some(attr) => match attr.decode()? {
                    Decoded::Str(s) => Some(Value::Str(s)),
                    _ => None,
                },
                None => None,
            },
            (UnaryFn::Name, Value::Attr(attr)) => Some(Value::Cst(Constant::attribute(attr.name))),

            (UnaryFn::Form, Value::Attr(attr)) => Some(Value::Cst(Constant::form(attr.form))),

            (UnaryFn::Value, Value::Attr(attr)) => Some(decoded(attr.decode()?)),

            (UnaryFn::AttrNamed(name), Value::Die(die)) => {
                info.attribute_integrate(*die, name)?.map(|attr| attr.decode()).transpose()?.map(decoded)
            }

            (UnaryFn::Type, _) => Some(Value::Cst(Constant::slot_type(value.slot_type()))),

            (UnaryFn::Pos, _) => Some(length(sv.pos)?),
            (UnaryFn::Count, _) => {
                Some(length(sv.count.ok_or(EvalError::Defect("count of a value without count metadata"))?)?)
            }

            (UnaryFn::Length, Value::Seq(values)) => Some(length(values.len())?),
            (UnaryFn::Length, Value::Str(s)) => Some(length(s.chars().count())?),
            (UnaryFn::Length, Value::LoclistEntry(entry)) => Some(length(entry.ops.len())?),

            (UnaryFn::Cast(domain), Value::Cst(c)) => Some(Value::Cst(c.cast(domain))),

            _ => None,
        };
        Ok(ret)
    }

    pub(crate) fn name(self) -> String {
        match self {
            UnaryFn::Parent => "parent".into(),
            UnaryFn::Prev => "prev".into(),
            UnaryFn::Next => "next".into(),
            UnaryFn::Offset => "offset".into(),
            UnaryFn::Tag => "label".into(),
            UnaryFn::Name => "name".into(),
            UnaryFn::Form => "form".into(),
            UnaryFn::Value => "value".into(),
            UnaryFn::AttrNamed(at) => format!("@{at}"),
            UnaryFn::Type => "type".into(),
            UnaryFn::Pos => "pos".into(),
            UnaryFn::Count => "count".into(),
            UnaryFn::Length => "length".into(),
            UnaryFn::Cast(domain) => format!("cast<{domain:?}>"),
            UnaryFn::Unit => "unit".into(),
        }
    }
}

/// Applies a [`UnaryFn`] to `src` and writes the result to `dst`. Banks
/// the function does not apply to are dropped.
pub(crate) struct Transform {
    upstream: BoxOp,
    info: Rc<dyn DebugInfo>,
    func: UnaryFn,
    src: Slot,
    dst: Slot,
}

impl Transform {
    pub(crate) fn new(upstream: BoxOp, info: Rc<dyn DebugInfo>, func: UnaryFn, src: Slot, dst: Slot) -> Self {
        Transform { upstream, info, func, src, dst }
    }
}

impl Op for Transform {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        while let Some(mut vf) = self.upstream.next()? {
            if let Some(value) = self.func.apply(&*self.info, vf.get(self.src)?)? {
                vf.set_value(self.dst, value)?;
                return Ok(Some(vf));
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        self.func.name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::Mod => "mod",
        }
    }

    fn integer(self, a: i128, b: i128) -> Result<i128, EvalError> {
        if matches!(self, ArithOp::Div | ArithOp::Mod) && b == 0 {
            return Err(EvalError::DivisionByZero);
        }
        match self {
            ArithOp::Add => a.checked_add(b),
            ArithOp::Sub => a.checked_sub(b),
            ArithOp::Mul => a.checked_mul(b),
            ArithOp::Div => a.checked_div(b),
            ArithOp::Mod => a.checked_rem(b),
        }
        .ok_or(EvalError::Overflow)
    }

    fn float(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            ArithOp::Mod => a % b,
        }
    }

    /// `a op b`, or `None` when the operands do not combine.
    fn apply(self, a: &Value, b: &Value) -> Result<Option<Value>, EvalError> {
        let ret = match (a, b) {
            (Value::Cst(a), Value::Cst(b)) => {
                let Some(domain) = a.domain().merge(b.domain()) else {
                    return Ok(None);
                };
                let result = self.integer(a.as_i128(), b.as_i128())?;
                Constant::from_i128(result, domain).map(Value::Cst)
            }
            (Value::Flt(a), Value::Flt(b)) => Some(Value::Flt(self.float(*a, *b))),
            (Value::Str(a), Value::Str(b)) if self == ArithOp::Add => Some(Value::Str(format!("{a}{b}"))),
            (Value::Seq(a), Value::Seq(b)) if self == ArithOp::Add => {
                Some(Value::seq(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => None,
        };
        Ok(ret)
    }
}

/// `dst = a op b`
///
/// A bank is skipped when its operands do not combine, or when the result
/// does not fit the merged domain (`1 2 sub` on unsigned constants).
/// Division by zero ends the run.
pub(crate) struct Arith {
    upstream: BoxOp,
    op: ArithOp,
    a: Slot,
    b: Slot,
    dst: Slot,
}

impl Arith {
    pub(crate) fn new(upstream: BoxOp, op: ArithOp, a: Slot, b: Slot, dst: Slot) -> Self {
        Arith { upstream, op, a, b, dst }
    }
}

impl Op for Arith {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        while let Some(mut vf) = self.upstream.next()? {
            if let Some(value) = self.op.apply(vf.value(self.a)?, vf.value(self.b)?)? {
                vf.set_value(self.dst, value)?;
                return Ok(Some(vf));
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        self.op.name().into()
    }
}

/// Writes a fixed value to `dst` of every bank.
pub(crate) struct Literal {
    upstream: BoxOp,
    value: Value,
    dst: Slot,
}

impl Literal {
    pub(crate) fn new(upstream: BoxOp, value: Value, dst: Slot) -> Self {
        Literal { upstream, value, dst }
    }
}

impl Op for Literal {
    fn next(&mut self) -> Result<Option<ValFile>, EvalError> {
        let Some(mut vf) = self.upstream.next()? else {
            return Ok(None);
        };
        vf.set_value(self.dst, self.value.clone())?;
        Ok(Some(vf))
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn bind(&mut self, vf: ValFile) {
        self.upstream.bind(vf);
    }

    fn name(&self) -> String {
        format!("const<{}>", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Origin, restart};
    use super::*;
    use dwquery_core::memory::{die, unit};
    use dwquery_core::{Attribute, Die, Form, MemoryInfo, SlotType, Tag};
    use rstest::rstest;

    // [0] cu a.c
    //   [1] subprogram main
    //   [2] subprogram (abstract_origin -> 1)
    fn info() -> Rc<dyn DebugInfo> {
        Rc::new(MemoryInfo::new([unit("a.c")
            .child(die(Tag::SUBPROGRAM).name("main").udata(At::DECL_LINE, 12))
            .child(die(Tag::SUBPROGRAM).reference(At::ABSTRACT_ORIGIN, 1))]))
    }

    fn eval(func: UnaryFn, sv: SlotValue) -> Option<Value> {
        func.apply(&*info(), &sv).unwrap()
    }

    #[rstest]
    #[case(UnaryFn::Parent, Die(2), Some(Value::Die(Die(0))))]
    #[case(UnaryFn::Parent, Die(0), None)]
    #[case(UnaryFn::Prev, Die(2), Some(Value::Die(Die(1))))]
    #[case(UnaryFn::Next, Die(2), None)]
    #[case(UnaryFn::Unit, Die(2), Some(Value::Die(Die(0))))]
    #[case(UnaryFn::Offset, Die(2), Some(Value::Cst(Constant::unsigned(2))))]
    #[case(UnaryFn::Tag, Die(1), Some(Value::Cst(Constant::tag(Tag::SUBPROGRAM))))]
    #[case(UnaryFn::Name, Die(2), Some(Value::from("main")))]
    #[case(UnaryFn::AttrNamed(At::DECL_LINE), Die(2), Some(Value::Cst(Constant::unsigned(12))))]
    #[case(UnaryFn::AttrNamed(At::BYTE_SIZE), Die(2), None)]
    #[case(UnaryFn::Type, Die(2), Some(Value::Cst(Constant::slot_type(SlotType::Die))))]
    fn die_functions(#[case] func: UnaryFn, #[case] die: Die, #[case] expected: Option<Value>) {
        assert_eq!(eval(func, SlotValue::new(die)), expected);
    }

    #[test]
    fn attribute_functions() {
        let attr = SlotValue::new(Attribute::new(At::LOCATION, Form::EXPRLOC, vec![0x91u8, 0x7c]));
        assert_eq!(eval(UnaryFn::Name, attr.clone()), Some(Value::Cst(Constant::attribute(At::LOCATION))));
        assert_eq!(eval(UnaryFn::Form, attr.clone()), Some(Value::Cst(Constant::form(Form::EXPRLOC))));
        assert_eq!(
            eval(UnaryFn::Value, attr.clone()),
            Some(Value::seq(vec![Value::Cst(Constant::unsigned(0x91)), Value::Cst(Constant::unsigned(0x7c))]))
        );
        assert_eq!(eval(UnaryFn::Tag, attr), None);
    }

    #[test]
    fn position_and_count() {
        assert_eq!(eval(UnaryFn::Pos, SlotValue::counted("x", 2, 5)), Some(Value::Cst(Constant::unsigned(2))));
        assert_eq!(eval(UnaryFn::Count, SlotValue::counted("x", 2, 5)), Some(Value::Cst(Constant::unsigned(5))));
        assert!(matches!(UnaryFn::Count.apply(&*info(), &SlotValue::new("x")), Err(EvalError::Defect(_))));
        assert_eq!(eval(UnaryFn::Length, SlotValue::new("héllo")), Some(Value::Cst(Constant::unsigned(5))));
    }

    #[test]
    fn cast_rebrands_constants() {
        assert_eq!(
            eval(UnaryFn::Cast(Domain::Tag), SlotValue::new(Constant::unsigned(0x2e))),
            Some(Value::Cst(Constant::tag(Tag::SUBPROGRAM)))
        );
        assert_eq!(eval(UnaryFn::Cast(Domain::Tag), SlotValue::new("x")), None);
    }

    #[rstest]
    #[case(ArithOp::Add, Constant::unsigned(2), Constant::signed(-5), Ok(Some(Value::Cst(Constant::signed(-3)))))]
    #[case(ArithOp::Sub, Constant::unsigned(2), Constant::unsigned(5), Err("arithmetic overflow"))]
    #[case(ArithOp::Mod, Constant::signed(-7), Constant::unsigned(3), Ok(Some(Value::Cst(Constant::signed(-1)))))]
    #[case(ArithOp::Div, Constant::unsigned(1), Constant::unsigned(0), Err("division by zero"))]
    #[case(ArithOp::Add, Constant::address(0x10), Constant::unsigned(8), Ok(Some(Value::Cst(Constant::address(0x18)))))]
    #[case(ArithOp::Add, Constant::tag(Tag::SUBPROGRAM), Constant::unsigned(1), Ok(None))]
    fn constant_arithmetic(
        #[case] op: ArithOp,
        #[case] a: Constant,
        #[case] b: Constant,
        #[case] expected: Result<Option<Value>, &str>,
    ) {
        let got = op.apply(&Value::Cst(a), &Value::Cst(b)).map_err(|e| e.to_string());
        assert_eq!(got, expected.map_err(str::to_owned));
    }

    #[test]
    fn add_concatenates() {
        assert_eq!(ArithOp::Add.apply(&"ab".into(), &"c".into()).unwrap(), Some(Value::from("abc")));
        assert_eq!(ArithOp::Sub.apply(&"ab".into(), &"c".into()).unwrap(), None);
        let seq = Value::seq(vec![Value::from("a")]);
        assert_eq!(
            ArithOp::Add.apply(&seq, &seq).unwrap(),
            Some(Value::seq(vec![Value::from("a"), Value::from("a")]))
        );
    }

    #[test]
    fn transform_skips_banks_it_does_not_apply_to() {
        let mut op = Transform::new(Box::new(Origin::new()), info(), UnaryFn::Parent, 0, 0);
        restart(&mut op, ValFile::with_values(1, [SlotValue::new(Die(0))]).unwrap());
        assert!(op.next().unwrap().is_none());

        restart(&mut op, ValFile::with_values(1, [SlotValue::new(Die(1))]).unwrap());
        assert_eq!(op.next().unwrap().unwrap().die(0).unwrap(), Die(0));
    }

    #[test]
    fn arith_writes_dst() {
        let vf = ValFile::with_values(
            3,
            [SlotValue::new(Constant::unsigned(6)), SlotValue::new(Constant::unsigned(7))],
        )
        .unwrap();
        let mut op = Arith::new(Box::new(Origin::new()), ArithOp::Mul, 0, 1, 2);
        restart(&mut op, vf);
        assert_eq!(op.next().unwrap().unwrap().cst(2).unwrap(), Constant::unsigned(42));
    }

    #[test]
    fn unsigned_underflow_skips_only_its_bank() {
        let bank = |a, b| {
            ValFile::with_values(3, [SlotValue::new(Constant::unsigned(a)), SlotValue::new(Constant::unsigned(b))])
                .unwrap()
        };
        let mut op = Arith::new(Box::new(Origin::new()), ArithOp::Sub, 0, 1, 2);
        restart(&mut op, bank(1, 2));
        assert!(op.next().unwrap().is_none());

        restart(&mut op, bank(5, 2));
        assert_eq!(op.next().unwrap().unwrap().cst(2).unwrap(), Constant::unsigned(3));
    }
}
