//! Cardinality resolution.
//!
//! `count` and `?last` need to know how many values the producer of their
//! operand yields. Instead of counting eagerly, the producer `X` of such a
//! slot is rewritten to `([X] each)`: the capture collects the values and
//! `each` replays them annotated with position and total count.
//!
//! The pass walks the tree backwards carrying the set of slots whose
//! producer has not been found yet.

use std::collections::BTreeSet;

use tracing::debug;

use crate::tree::{Slot, Tree, TreeKind};

pub(crate) type Unresolved = BTreeSet<Slot>;

pub(crate) fn resolve_count(t: &mut Tree, mut unresolved: Unresolved) -> Unresolved {
    match t.kind {
        TreeKind::FCount => {
            let src = t.src_a;
            can_resolve(t, &mut unresolved);
            unresolved.extend(src);
            unresolved
        }

        TreeKind::PredLast => {
            unresolved.extend(t.src_a);
            unresolved
        }

        TreeKind::Format | TreeKind::Capture => {
            can_resolve(t, &mut unresolved);
            resolve_sequence(t, unresolved)
        }

        TreeKind::Cat => resolve_sequence(t, unresolved),

        TreeKind::PredNot => resolve_count(&mut t.children[0], unresolved),

        TreeKind::Alt => {
            let mut ret = Unresolved::new();
            for branch in &mut t.children {
                ret.extend(resolve_count(branch, unresolved.clone()));
            }
            ret
        }

        TreeKind::PredAnd | TreeKind::PredOr | TreeKind::Assert | TreeKind::PredSubxAll | TreeKind::PredSubxAny => {
            for child in &mut t.children {
                isolated(child, &mut unresolved);
            }
            unresolved
        }

        TreeKind::Protect => {
            isolated(&mut t.children[0], &mut unresolved);
            can_resolve(t, &mut unresolved);
            unresolved
        }

        TreeKind::CloseStar => {
            // One iteration may resolve what the previous one left open.
            let once = resolve_count(&mut t.children[0], unresolved.clone());
            unresolved.extend(once.iter().copied());
            let twice = resolve_count(&mut t.children[0], once);
            unresolved.extend(twice);
            unresolved
        }

        TreeKind::ShfDrop => {
            if let Some(dst) = t.dst {
                assert!(!unresolved.contains(&dst), "count of dropped slot {dst}");
            }
            unresolved
        }

        TreeKind::ShfDup | TreeKind::ShfOver => {
            // The copy cannot annotate anything; whoever produced the
            // original has to.
            if let (Some(src), Some(dst)) = (t.src_a, t.dst)
                && unresolved.remove(&dst)
            {
                unresolved.insert(src);
            }
            unresolved
        }

        TreeKind::ShfSwap => {
            if let (Some(a), Some(b)) = (t.src_a, t.dst) {
                let has_a = unresolved.remove(&a);
                let has_b = unresolved.remove(&b);
                if has_a {
                    unresolved.insert(b);
                }
                if has_b {
                    unresolved.insert(a);
                }
            }
            unresolved
        }

        TreeKind::FEach => {
            if let Some(dst) = t.dst {
                unresolved.remove(&dst);
            }
            unresolved
        }

        TreeKind::EmptyList
        | TreeKind::Const
        | TreeKind::Str
        | TreeKind::FAdd
        | TreeKind::FSub
        | TreeKind::FMul
        | TreeKind::FDiv
        | TreeKind::FMod
        | TreeKind::FParent
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
        | TreeKind::FLength
        | TreeKind::SelUniverse
        | TreeKind::SelUnit => {
            can_resolve(t, &mut unresolved);
            unresolved
        }

        TreeKind::Nop
        | TreeKind::PredAt
        | TreeKind::PredTag
        | TreeKind::PredEq
        | TreeKind::PredNe
        | TreeKind::PredGt
        | TreeKind::PredGe
        | TreeKind::PredLt
        | TreeKind::PredLe
        | TreeKind::PredFind
        | TreeKind::PredMatch
        | TreeKind::PredEmpty
        | TreeKind::PredRoot => unresolved,

        TreeKind::ShfRot => unimplemented!("resolve_count: ROT"),

        TreeKind::ClosePlus | TreeKind::Maybe | TreeKind::Transform => {
            unreachable!("{} survived slot allocation", t.kind)
        }
    }
}

fn resolve_sequence(t: &mut Tree, mut unresolved: Unresolved) -> Unresolved {
    for child in t.children.iter_mut().rev().filter(|child| child.kind != TreeKind::Str) {
        unresolved = resolve_count(child, unresolved);
    }
    unresolved
}

/// Sub-expressions of assertions, logical operators, quantifiers and
/// protect do not resolve anything for their surroundings, but what they
/// leave open still has to be produced outside. In `(child ?[count])` the
/// child is rewritten, in `(?[child] count)` it is not.
fn isolated(child: &mut Tree, unresolved: &mut Unresolved) {
    unresolved.extend(resolve_count(child, Unresolved::new()));
}

/// Rewrites producer `t` to `([t] each)` if its result needs a count.
fn can_resolve(t: &mut Tree, unresolved: &mut Unresolved) {
    let Some(dst) = t.dst else {
        return;
    };
    if unresolved.remove(&dst) {
        debug!(producer = %t, "found producer");
        let producer = core::mem::replace(t, Tree::bare(TreeKind::Nop));
        let capture = Tree { src_a: Some(dst), dst: Some(dst), ..Tree::with_children(TreeKind::Capture, vec![producer]) };
        let each = Tree { src_a: Some(dst), dst: Some(dst), ..Tree::bare(TreeKind::FEach) };
        *t = Tree::with_children(TreeKind::Cat, vec![capture, each]);
        debug!(converted = %t, "converted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::operands::resolve_operands;
    use crate::compiler::stack::StackRefs;
    use crate::tree::NullaryKind as N;

    fn resolved(mut t: Tree) -> Tree {
        resolve_operands(&mut t, StackRefs::default(), true).unwrap();
        let open = resolve_count(&mut t, Unresolved::new());
        assert!(open.is_empty(), "left open: {open:?}");
        t
    }

    #[test]
    fn count_rewrites_its_producer() {
        let t = resolved(Tree::seq([
            Tree::nullary(N::SelUniverse),
            Tree::nullary(N::FChild),
            Tree::nullary(N::FCount),
        ]));
        assert_eq!(
            t.to_string(),
            "(CAT (SEL_UNIVERSE [dst=0;]) (CAT (CAPTURE [a=0;dst=0;] (F_CHILD [a=0;dst=0;])) \
             (F_EACH [a=0;dst=0;])) (F_COUNT [a=0;dst=0;]))"
        );
    }

    #[test]
    fn dup_hands_the_request_to_the_original() {
        let t = resolved(Tree::seq([
            Tree::nullary(N::SelUniverse),
            Tree::nullary(N::ShfDup),
            Tree::nullary(N::FCount),
        ]));
        assert_eq!(t.child(0).kind(), TreeKind::Cat);
        assert_eq!(t.child(0).child(0).kind(), TreeKind::Capture);
        assert_eq!(t.child(1).kind(), TreeKind::ShfDup);
    }

    #[test]
    fn last_inside_an_assertion_reaches_outside() {
        let t = resolved(Tree::seq([
            Tree::nullary(N::SelUniverse),
            Tree::nullary(N::FChild),
            Tree::assert(Tree::nullary(N::PredLast)),
        ]));
        assert_eq!(t.child(1).kind(), TreeKind::Cat);
        assert_eq!(t.child(1).child(1).kind(), TreeKind::FEach);
    }

    #[test]
    fn each_already_annotates() {
        let t = resolved(Tree::seq([
            Tree::nullary(N::EmptyList),
            Tree::nullary(N::FEach),
            Tree::nullary(N::FCount),
        ]));
        assert_eq!(t.child(1).kind(), TreeKind::FEach);
        assert_eq!(t.child(0).kind(), TreeKind::EmptyList);
    }

    #[test]
    fn every_alternative_resolves() {
        let t = resolved(Tree::seq([
            Tree::nullary(N::SelUniverse),
            Tree::alt(Tree::nullary(N::FChild), Tree::nullary(N::FParent)),
            Tree::nullary(N::FCount),
        ]));
        let alt = t.child(1);
        assert!(alt.children().iter().all(|branch| branch.kind() == TreeKind::Cat));
    }
}
