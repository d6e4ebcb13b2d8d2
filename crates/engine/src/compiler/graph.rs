//! Lowering of a resolved tree onto pipeline nodes.

use std::rc::Rc;

use dwquery_core::DebugInfo;

use crate::engine::op::{
    Alt, Arith, ArithOp, Assert, Attributes, BoxOp, Capture, Child, CloseStar, Duplicate, Each, Format, Invalidate,
    Literal, Origin, Piece, Protect, Swap, Transform, UnaryFn, Universe,
};
use crate::engine::pred::{
    BoxPred, CmpOp, Combine, Compare, Empty, Find, HasAttribute, HasTag, Last, Logic, Match, Not, Root, SubxAll,
    SubxAny,
};
use crate::engine::Value;
use crate::error::BuildError;
use crate::tree::{Slot, Tree, TreeKind};

fn a(t: &Tree) -> Slot {
    t.src_a.unwrap_or_else(|| panic!("{} has no first operand", t.kind))
}

fn b(t: &Tree) -> Slot {
    t.src_b.unwrap_or_else(|| panic!("{} has no second operand", t.kind))
}

fn dst(t: &Tree) -> Slot {
    t.dst.unwrap_or_else(|| panic!("{} has no destination", t.kind))
}

fn invalid_literal(t: &Tree, expected: &'static str) -> BuildError {
    BuildError::InvalidLiteral {
        kind: t.kind.name(),
        expected,
        literal: t.literal.as_ref().map(ToString::to_string).unwrap_or_default(),
    }
}

/// A fresh pipeline for `t`, fed by its own origin.
pub(crate) fn isolated(t: &Tree, info: &Rc<dyn DebugInfo>) -> Result<BoxOp, BuildError> {
    build_op(t, Box::new(Origin::new()), info)
}

pub(crate) fn build_op(t: &Tree, upstream: BoxOp, info: &Rc<dyn DebugInfo>) -> Result<BoxOp, BuildError> {
    let transform =
        |upstream: BoxOp, func: UnaryFn| -> BoxOp { Box::new(Transform::new(upstream, info.clone(), func, a(t), dst(t))) };

    let op: BoxOp = match t.kind {
        TreeKind::Cat => {
            let mut op = upstream;
            for child in &t.children {
                op = build_op(child, op, info)?;
            }
            return Ok(op);
        }
        TreeKind::Nop => return Ok(upstream),

        TreeKind::Alt => {
            let branches = t.children.iter().map(|branch| isolated(branch, info)).collect::<Result<_, _>>()?;
            Box::new(Alt::new(upstream, branches))
        }
        TreeKind::Capture => Box::new(Capture::new(upstream, isolated(t.child(0), info)?, a(t), dst(t))),
        TreeKind::Protect => Box::new(Protect::new(upstream, isolated(t.child(0), info)?, a(t), dst(t))),
        TreeKind::CloseStar => Box::new(CloseStar::new(upstream, isolated(t.child(0), info)?, t.live.clone())),
        TreeKind::Assert => Box::new(Assert::new(upstream, build_pred(t.child(0), info)?)),

        TreeKind::EmptyList => Box::new(Literal::new(upstream, Value::seq(Vec::new()), dst(t))),
        TreeKind::Const => Box::new(Literal::new(upstream, Value::Cst(t.constant_value()), dst(t))),
        TreeKind::Str => Box::new(Literal::new(upstream, Value::Str(t.string().to_owned()), dst(t))),

        TreeKind::Format => {
            let pieces = t
                .children
                .iter()
                .map(|piece| {
                    Ok(match piece.kind {
                        TreeKind::Str => Piece::Lit(piece.string().to_owned()),
                        _ => Piece::Computed { op: isolated(piece, info)?, src: dst(piece) },
                    })
                })
                .collect::<Result<_, BuildError>>()?;
            Box::new(Format::new(upstream, pieces, dst(t)))
        }

        TreeKind::FAdd => Box::new(Arith::new(upstream, ArithOp::Add, a(t), b(t), dst(t))),
        TreeKind::FSub => Box::new(Arith::new(upstream, ArithOp::Sub, a(t), b(t), dst(t))),
        TreeKind::FMul => Box::new(Arith::new(upstream, ArithOp::Mul, a(t), b(t), dst(t))),
        TreeKind::FDiv => Box::new(Arith::new(upstream, ArithOp::Div, a(t), b(t), dst(t))),
        TreeKind::FMod => Box::new(Arith::new(upstream, ArithOp::Mod, a(t), b(t), dst(t))),

        TreeKind::SelUniverse => Box::new(Universe::new(upstream, info.clone(), dst(t))),
        TreeKind::FChild => Box::new(Child::new(upstream, info.clone(), a(t), dst(t))),
        TreeKind::FAttribute => Box::new(Attributes::new(upstream, info.clone(), a(t), dst(t))),
        TreeKind::FEach => Box::new(Each::new(upstream, a(t), dst(t))),

        TreeKind::FParent => transform(upstream, UnaryFn::Parent),
        TreeKind::FPrev => transform(upstream, UnaryFn::Prev),
        TreeKind::FNext => transform(upstream, UnaryFn::Next),
        TreeKind::FType => transform(upstream, UnaryFn::Type),
        TreeKind::FOffset => transform(upstream, UnaryFn::Offset),
        TreeKind::FName => transform(upstream, UnaryFn::Name),
        TreeKind::FTag => transform(upstream, UnaryFn::Tag),
        TreeKind::FForm => transform(upstream, UnaryFn::Form),
        TreeKind::FValue => transform(upstream, UnaryFn::Value),
        TreeKind::FPos => transform(upstream, UnaryFn::Pos),
        TreeKind::FCount => transform(upstream, UnaryFn::Count),
        TreeKind::FLength => transform(upstream, UnaryFn::Length),
        TreeKind::SelUnit => transform(upstream, UnaryFn::Unit),
        TreeKind::FAttrNamed => {
            let at = t.constant_value().as_attribute().ok_or_else(|| invalid_literal(t, "an attribute"))?;
            transform(upstream, UnaryFn::AttrNamed(at))
        }
        TreeKind::FCast => transform(upstream, UnaryFn::Cast(t.constant_value().domain())),

        TreeKind::ShfSwap => Box::new(Swap::new(upstream, a(t), dst(t))),
        TreeKind::ShfDup | TreeKind::ShfOver => Box::new(Duplicate::new(upstream, a(t), dst(t))),
        TreeKind::ShfDrop => Box::new(Invalidate::new(upstream, dst(t))),
        TreeKind::ShfRot => unimplemented!("ROT"),

        TreeKind::Transform | TreeKind::ClosePlus | TreeKind::Maybe => {
            unreachable!("{} survived slot allocation", t.kind)
        }

        // A bare predicate filters like an assertion.
        _ => Box::new(Assert::new(upstream, build_pred(t, info)?)),
    };
    Ok(op)
}

pub(crate) fn build_pred(t: &Tree, info: &Rc<dyn DebugInfo>) -> Result<BoxPred, BuildError> {
    let compare = |op, negate| Box::new(Compare::new(op, negate, a(t), b(t))) as BoxPred;

    let pred: BoxPred = match t.kind {
        TreeKind::PredAt => {
            let at = t.constant_value().as_attribute().ok_or_else(|| invalid_literal(t, "an attribute"))?;
            Box::new(HasAttribute::new(info.clone(), at, a(t)))
        }
        TreeKind::PredTag => {
            let tag = t.constant_value().as_tag().ok_or_else(|| invalid_literal(t, "a tag"))?;
            Box::new(HasTag::new(info.clone(), tag, a(t)))
        }
        TreeKind::PredEq => compare(CmpOp::Eq, false),
        TreeKind::PredNe => compare(CmpOp::Eq, true),
        TreeKind::PredLt => compare(CmpOp::Lt, false),
        TreeKind::PredGe => compare(CmpOp::Lt, true),
        TreeKind::PredGt => compare(CmpOp::Gt, false),
        TreeKind::PredLe => compare(CmpOp::Gt, true),
        TreeKind::PredFind => Box::new(Find::new(a(t), b(t))),
        TreeKind::PredMatch => Box::new(Match::new(a(t), b(t))),
        TreeKind::PredEmpty => Box::new(Empty::new(a(t))),
        TreeKind::PredRoot => Box::new(Root::new(info.clone(), a(t))),
        TreeKind::PredLast => Box::new(Last::new(a(t))),
        TreeKind::PredAnd | TreeKind::PredOr => {
            let logic = if t.kind == TreeKind::PredAnd { Logic::And } else { Logic::Or };
            Box::new(Combine::new(logic, build_pred(t.child(0), info)?, build_pred(t.child(1), info)?))
        }
        TreeKind::PredNot => Box::new(Not(build_pred(t.child(0), info)?)),
        TreeKind::PredSubxAny => Box::new(SubxAny::new(isolated(t.child(0), info)?)),
        TreeKind::PredSubxAll => Box::new(SubxAll::new(isolated(t.child(0), info)?, a(t))),
        kind => return Err(BuildError::NotAPredicate(kind.name())),
    };
    Ok(pred)
}
