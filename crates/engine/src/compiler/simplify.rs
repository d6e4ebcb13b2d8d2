//! Peephole simplification, run until nothing changes.
//!
//! Structural rules apply to any tree. Rules that look at slots only fire
//! once the slot allocator has filled them in.

use tracing::trace;

use crate::tree::{Slot, Tree, TreeKind};

pub(crate) fn simplify(t: &mut Tree) {
    loop {
        let before = t.clone();
        simplify_once(t);
        if *t == before {
            break;
        }
    }
}

fn simplify_once(t: &mut Tree) {
    for child in &mut t.children {
        simplify_once(child);
    }

    if matches!(t.kind, TreeKind::Cat | TreeKind::Alt) {
        flatten(t);
    }

    // A format piece keeps the slot its result is read from.
    if t.kind == TreeKind::Cat
        && t.children.len() == 1
        && (t.dst.is_none() || t.child(0).dst.is_none() || t.child(0).dst == t.dst)
    {
        let dst = t.dst;
        *t = t.children.remove(0);
        t.dst = t.dst.or(dst);
        return;
    }

    // (FORMAT (STR)) => (STR)
    if t.kind == TreeKind::Format && t.children.len() == 1 && t.child(0).kind == TreeKind::Str {
        let dst = t.dst;
        *t = t.children.remove(0);
        t.dst = dst;
        return;
    }

    if t.kind == TreeKind::Cat {
        forward_dups(t);
    }

    // (PROTECT[a=A;dst=B] X[dst=A]) => X[dst=B]
    if t.kind == TreeKind::Protect
        && t.src_a.is_some()
        && t.child(0).dst == t.src_a
        && !matches!(t.child(0).kind, TreeKind::Capture | TreeKind::ShfSwap)
    {
        let dst = t.dst;
        *t = t.children.remove(0);
        t.dst = dst;
        return;
    }

    if t.kind == TreeKind::Alt {
        merge_alternative_assertions(t);
        if t.kind != TreeKind::Alt {
            return;
        }
    }

    if t.kind == TreeKind::Cat {
        hoist_assertions(t);
        t.children.retain(|child| child.kind != TreeKind::Nop);
        if t.children.is_empty() {
            let dst = t.dst;
            *t = Tree::bare(TreeKind::Nop);
            t.dst = dst;
        }
    }
}

fn flatten(t: &mut Tree) {
    if t.children.iter().all(|child| child.kind != t.kind) {
        return;
    }
    let kind = t.kind;
    let children = core::mem::take(&mut t.children);
    for child in children {
        if child.kind == kind {
            t.children.extend(child.children);
        } else {
            t.children.push(child);
        }
    }
}

/// (DUP[a=A;dst=B] ... X[a=B;dst=B]) => (X[a=A;dst=B] ...)
///
/// Only for a one-operand consumer, and only when nothing in between
/// touches either slot.
fn forward_dups(t: &mut Tree) {
    let mut i = 0;
    while i < t.children.len() {
        let dup = t.child(i);
        if let (TreeKind::ShfDup, Some(a), Some(b)) = (dup.kind, dup.src_a, dup.dst) {
            let consumer = (i + 1..t.children.len())
                .take_while(|&j| j == i + 1 || !t.child(j - 1).mentions(a) && !t.child(j - 1).mentions(b))
                .find(|&j| {
                    let x = t.child(j);
                    x.kind.is_unary_transform() && x.src_b.is_none() && x.src_a == Some(b) && x.dst == Some(b)
                });
            if let Some(j) = consumer {
                trace!(dup = %t.child(i), x = %t.child(j), "forwarding dup");
                let mut x = t.children.remove(j);
                x.src_a = Some(a);
                t.children[i] = x;
            }
        }
        i += 1;
    }
}

/// Single slot a predicate tests, if there is one.
fn common_slot(t: &Tree) -> Option<Slot> {
    match t.kind {
        TreeKind::PredAt | TreeKind::PredTag | TreeKind::PredEmpty | TreeKind::PredRoot => t.src_a,
        TreeKind::PredAnd | TreeKind::PredOr => {
            let a = common_slot(t.child(0))?;
            (common_slot(t.child(1))? == a).then_some(a)
        }
        TreeKind::PredNot => common_slot(t.child(0)),
        _ => None,
    }
}

/// (ALT (ASSERT P) (ASSERT Q)) => (ASSERT (OR P Q)) when P and Q test the same slot.
fn merge_alternative_assertions(t: &mut Tree) {
    if t.children.len() < 2 || t.children.iter().any(|branch| branch.kind != TreeKind::Assert) {
        return;
    }
    let Some(a) = common_slot(t.child(0).child(0)) else {
        return;
    };
    if t.children[1..].iter().any(|branch| common_slot(branch.child(0)) != Some(a)) {
        return;
    }

    let pred = core::mem::take(&mut t.children)
        .into_iter()
        .map(|mut branch| branch.children.remove(0))
        .reduce(|acc, p| Tree::with_children(TreeKind::PredOr, vec![acc, p]));
    if let Some(pred) = pred {
        let dst = t.dst;
        *t = Tree::with_children(TreeKind::Assert, vec![pred]);
        t.dst = dst;
    }
}

/// Moves each assertion right behind the node that produces its slot.
fn hoist_assertions(t: &mut Tree) {
    for i in 1..t.children.len() {
        if t.child(i).kind != TreeKind::Assert {
            continue;
        }
        let Some(a) = common_slot(t.child(i).child(0)) else {
            continue;
        };
        for j in (0..i).rev() {
            let p = t.child(j);
            if matches!(p.kind, TreeKind::Alt | TreeKind::CloseStar) {
                break;
            }
            let writes = p.dst == Some(a) || (p.kind == TreeKind::ShfSwap && p.src_a == Some(a));
            if writes {
                if j + 1 != i {
                    let assertion = t.children.remove(i);
                    t.children.insert(j + 1, assertion);
                }
                break;
            }
        }
    }
}
