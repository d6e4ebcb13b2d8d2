//! Slot allocation.
//!
//! Walks the tree with a symbolic stack and records on every node which
//! slots it reads (`src_a`, `src_b`) and writes (`dst`). With `elim` set,
//! stack shuffling is turned into renaming of slots where control flow
//! allows it.

use tracing::{debug, trace};

use super::stack::StackRefs;
use crate::error::BuildError;
use crate::tree::{Tree, TreeKind};

pub(crate) fn resolve_operands(t: &mut Tree, mut sr: StackRefs, elim: bool) -> Result<StackRefs, BuildError> {
    match t.kind {
        TreeKind::ClosePlus => {
            let body = t.children.remove(0);
            let star = Tree::with_children(TreeKind::CloseStar, vec![body.clone()]);
            *t = Tree::with_children(TreeKind::Cat, vec![body, star]);
            return resolve_operands(t, sr, elim);
        }

        TreeKind::Maybe => {
            let body = t.children.remove(0);
            *t = Tree::with_children(TreeKind::Alt, vec![body, Tree::bare(TreeKind::Nop)]);
            return resolve_operands(t, sr, elim);
        }

        TreeKind::Cat => {
            for child in &mut t.children {
                sr = resolve_operands(child, sr, elim)?;
            }
        }

        TreeKind::Alt => sr = resolve_alternation(t, sr)?,

        TreeKind::Capture => {
            let resolved = match resolve_capture(t, &sr, true)? {
                Some(resolved) => Some(resolved),
                None => resolve_capture(t, &sr, false)?,
            };
            let Some((child, sr2)) = resolved else {
                return Err(BuildError::ComplexCapture);
            };
            let top = sr2.top()?;
            t.children[0] = child;
            t.src_a = Some(top);
            t.dst = Some(top);
            sr = sr2;
        }

        TreeKind::SelUniverse | TreeKind::Const | TreeKind::EmptyList | TreeKind::Str => {
            sr.push();
            t.dst = Some(sr.top()?);
        }

        TreeKind::Format => {
            for child in t.children.iter_mut().filter(|child| child.kind != TreeKind::Str) {
                sr = resolve_operands(child, sr, elim)?;
                let top = sr.top()?;
                match child.dst {
                    Some(dst) if dst != top => return Err(BuildError::ComplexFormatPiece),
                    Some(_) => {}
                    None => child.dst = Some(top),
                }
                sr.drop(1)?;
            }
            sr.push();
            t.dst = Some(sr.top()?);
        }

        TreeKind::FAdd | TreeKind::FSub | TreeKind::FMul | TreeKind::FDiv | TreeKind::FMod => {
            let (a, a_age) = sr.below_w_age()?;
            let (b, b_age) = sr.top_w_age()?;
            t.src_a = Some(a);
            t.src_b = Some(b);
            // The older of the two operands receives the result.
            if b_age < a_age {
                sr.swap()?;
            }
            sr.drop(2)?;
            sr.push();
            t.dst = Some(sr.top()?);
        }

        TreeKind::FParent
        | TreeKind::FChild
        | TreeKind::FAttribute
        | TreeKind::FAttrNamed
        | TreeKind::FPrev
        | TreeKind::FNext
        | TreeKind::FType
        | TreeKind::FOffset
        | TreeKind::FName
        | TreeKind::FTag
        | TreeKind::FForm
        | TreeKind::FValue
        | TreeKind::FCast
        | TreeKind::FPos
        | TreeKind::FCount
        | TreeKind::FEach
        | TreeKind::FLength
        | TreeKind::SelUnit => {
            t.src_a = Some(sr.top()?);
            sr.drop(1)?;
            sr.push();
            t.dst = Some(sr.top()?);
        }

        TreeKind::Protect => {
            let mut sr2 = resolve_operands(&mut t.children[0], sr.clone(), elim)?;
            t.src_a = Some(sr2.top()?);
            sr2.drop(1)?;
            sr.accommodate(&sr2);
            sr.push();
            t.dst = Some(sr.top()?);
        }

        TreeKind::Nop => {}

        TreeKind::Assert | TreeKind::PredNot => {
            let sr2 = resolve_operands(&mut t.children[0], sr.clone(), elim)?;
            sr.accommodate(&sr2);
        }

        TreeKind::ShfSwap => {
            if elim {
                t.kind = TreeKind::Nop;
                sr.swap()?;
            } else {
                t.src_a = Some(sr.below()?);
                t.dst = Some(sr.top()?);
            }
        }

        TreeKind::ShfDup => {
            t.src_a = Some(sr.top()?);
            sr.push();
            t.dst = Some(sr.top()?);
        }

        TreeKind::ShfOver => {
            t.src_a = Some(sr.below()?);
            sr.push();
            t.dst = Some(sr.top()?);
        }

        TreeKind::ShfRot => unimplemented!("resolve_operands: ROT"),

        TreeKind::ShfDrop => {
            t.dst = Some(sr.top()?);
            sr.drop(1)?;
        }

        TreeKind::Transform => sr = resolve_transform(t, sr, elim)?,

        TreeKind::CloseStar => {
            let mut body = t.children[0].clone();
            let sr2 = resolve_operands(&mut body, sr.clone(), elim)?;
            if sr2.depth() != sr.depth() {
                return Err(BuildError::NonNeutralIteration);
            }
            if sr2.slots() == sr.slots() {
                t.children[0] = body;
                sr = sr2;
            } else {
                debug!(body = %t.children[0], "closure reshuffles its stack, keeping explicit shuffles");
                let sr2 = resolve_operands(&mut t.children[0], sr.clone(), false)?;
                if sr2.slots() != sr.slots() {
                    return Err(BuildError::NonNeutralIteration);
                }
                sr = sr2;
            }
            t.live = sr.slots().to_vec();
        }

        TreeKind::PredAt | TreeKind::PredTag | TreeKind::PredEmpty | TreeKind::PredRoot | TreeKind::PredLast => {
            t.src_a = Some(sr.top()?);
        }

        TreeKind::PredEq
        | TreeKind::PredNe
        | TreeKind::PredGt
        | TreeKind::PredGe
        | TreeKind::PredLt
        | TreeKind::PredLe
        | TreeKind::PredFind
        | TreeKind::PredMatch => {
            t.src_a = Some(sr.below()?);
            t.src_b = Some(sr.top()?);
        }

        TreeKind::PredSubxAny | TreeKind::PredSubxAll => {
            if t.kind == TreeKind::PredSubxAll {
                t.src_a = Some(sr.top()?);
            }
            let sr2 = resolve_operands(&mut t.children[0], sr.clone(), true)?;
            sr.accommodate(&sr2);
        }

        TreeKind::PredAnd | TreeKind::PredOr => {
            let sr1 = resolve_operands(&mut t.children[0], sr.clone(), elim)?;
            let sr2 = resolve_operands(&mut t.children[1], sr1, elim)?;
            sr.accommodate(&sr2);
        }
    }

    trace!(node = t.kind.name(), stack = %sr, "resolved");
    Ok(sr)
}

/// Branches first try to agree on a shuffle-free resolution. When their
/// resulting stacks differ, every branch is resolved again keeping its
/// shuffles, and the branches must then end on the same slots.
fn resolve_alternation(t: &mut Tree, sr: StackRefs) -> Result<StackRefs, BuildError> {
    let mut branches = t.children.clone();
    let mut merged = resolve_operands(&mut branches[0], sr.clone(), true)?;
    let mut uniform = true;
    for branch in &mut branches[1..] {
        let sr3 = resolve_operands(branch, sr.clone(), true)?;
        if sr3.depth() != merged.depth() {
            return Err(BuildError::UnbalancedAlternation);
        }
        merged.accommodate(&sr3);
        if sr3 != merged {
            uniform = false;
            break;
        }
    }
    if uniform {
        t.children = branches;
        return Ok(merged);
    }

    debug!(alt = %t, "branches disagree, keeping explicit shuffles");
    let mut merged = resolve_operands(&mut t.children[0], sr.clone(), false)?;
    for branch in &mut t.children[1..] {
        let sr3 = resolve_operands(branch, sr.clone(), false)?;
        if sr3.slots() != merged.slots() {
            return Err(BuildError::UnbalancedAlternation);
        }
        merged.accommodate(&sr3);
    }
    Ok(merged)
}

/// A capture may leave the stack as it was, or push exactly one value.
fn resolve_capture(t: &Tree, sr: &StackRefs, elim: bool) -> Result<Option<(Tree, StackRefs)>, BuildError> {
    let mut child = t.children[0].clone();
    let sr2 = resolve_operands(&mut child, sr.clone(), elim)?;
    let neutral = sr2.slots() == sr.slots();
    let one_push = sr2.depth() == sr.depth() + 1 && sr2.slots()[..sr.depth()] == *sr.slots();
    Ok((neutral || one_push).then_some((child, sr2)))
}

/// `N/X` becomes `N` copies of `X`, each applied one slot deeper.
fn resolve_transform(t: &mut Tree, mut sr: StackRefs, elim: bool) -> Result<StackRefs, BuildError> {
    if !t.child(0).is_unsigned_const() {
        return Err(BuildError::InvalidTransformDepth);
    }
    if t.child(1).kind == TreeKind::Transform {
        return Err(BuildError::NestedTransform);
    }
    let depth = usize::try_from(t.child(0).constant_value().value()).map_err(|_| BuildError::StackUnderflow)?;
    let mut slots = sr.drop_release(depth)?.reversed();

    let mut copies = Vec::with_capacity(depth);
    for _ in 0..depth {
        sr.push_one(&mut slots);
        let mut body = t.child(1).clone();
        sr = resolve_operands(&mut body, sr, elim)?;
        copies.push(body);
    }

    *t = Tree::with_children(TreeKind::Cat, copies);
    Ok(sr)
}
