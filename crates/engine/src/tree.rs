//! Expression trees handed over by the front end.
//!
//! A tree is a plain value: children are owned, and the compiler passes
//! rewrite nodes in place by replacing whole subtrees. Every node carries
//! three operand slots which stay `None` until the slot allocator has run.

use core::fmt;

use dwquery_core::{Constant, Domain};

/// Index of a virtual register.
pub type Slot = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    Nullary,
    Unary,
    Binary,
    Str,
    Cst,
}

macro_rules! tree_kinds {
    ($($kind:ident = $name:literal, $arity:ident;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TreeKind {
            $($kind,)*
        }

        impl TreeKind {
            pub fn name(self) -> &'static str {
                match self {
                    $(TreeKind::$kind => $name,)*
                }
            }

            pub fn arity(self) -> Arity {
                match self {
                    $(TreeKind::$kind => Arity::$arity,)*
                }
            }
        }
    };
}

tree_kinds! {
    Cat = "CAT", Binary;
    Alt = "ALT", Binary;
    Capture = "CAPTURE", Unary;
    EmptyList = "EMPTY_LIST", Nullary;
    Transform = "TRANSFORM", Binary;
    Protect = "PROTECT", Unary;
    Nop = "NOP", Nullary;
    ClosePlus = "CLOSE_PLUS", Unary;
    CloseStar = "CLOSE_STAR", Unary;
    Maybe = "MAYBE", Unary;
    Assert = "ASSERT", Unary;
    PredAt = "PRED_AT", Cst;
    PredTag = "PRED_TAG", Cst;
    PredEq = "PRED_EQ", Nullary;
    PredNe = "PRED_NE", Nullary;
    PredGt = "PRED_GT", Nullary;
    PredGe = "PRED_GE", Nullary;
    PredLt = "PRED_LT", Nullary;
    PredLe = "PRED_LE", Nullary;
    PredFind = "PRED_FIND", Nullary;
    PredMatch = "PRED_MATCH", Nullary;
    PredEmpty = "PRED_EMPTY", Nullary;
    PredRoot = "PRED_ROOT", Nullary;
    PredAnd = "PRED_AND", Binary;
    PredOr = "PRED_OR", Binary;
    PredNot = "PRED_NOT", Unary;
    PredSubxAll = "PRED_SUBX_ALL", Unary;
    PredSubxAny = "PRED_SUBX_ANY", Unary;
    PredLast = "PRED_LAST", Nullary;
    Const = "CONST", Cst;
    Str = "STR", Str;
    Format = "FORMAT", Nullary;
    FAdd = "F_ADD", Nullary;
    FSub = "F_SUB", Nullary;
    FMul = "F_MUL", Nullary;
    FDiv = "F_DIV", Nullary;
    FMod = "F_MOD", Nullary;
    FParent = "F_PARENT", Nullary;
    FChild = "F_CHILD", Nullary;
    FAttribute = "F_ATTRIBUTE", Nullary;
    FAttrNamed = "F_ATTR_NAMED", Cst;
    FPrev = "F_PREV", Nullary;
    FNext = "F_NEXT", Nullary;
    FType = "F_TYPE", Nullary;
    FOffset = "F_OFFSET", Nullary;
    FName = "F_NAME", Nullary;
    FTag = "F_TAG", Nullary;
    FForm = "F_FORM", Nullary;
    FValue = "F_VALUE", Nullary;
    FPos = "F_POS", Nullary;
    FCount = "F_COUNT", Nullary;
    FEach = "F_EACH", Nullary;
    FLength = "F_LENGTH", Nullary;
    FCast = "F_CAST", Cst;
    SelUniverse = "SEL_UNIVERSE", Nullary;
    SelUnit = "SEL_UNIT", Nullary;
    ShfSwap = "SHF_SWAP", Nullary;
    ShfDup = "SHF_DUP", Nullary;
    ShfOver = "SHF_OVER", Nullary;
    ShfRot = "SHF_ROT", Nullary;
    ShfDrop = "SHF_DROP", Nullary;
}

impl TreeKind {
    pub fn is_predicate(self) -> bool {
        matches!(
            self,
            TreeKind::PredAt
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
                | TreeKind::PredRoot
                | TreeKind::PredAnd
                | TreeKind::PredOr
                | TreeKind::PredNot
                | TreeKind::PredSubxAll
                | TreeKind::PredSubxAny
                | TreeKind::PredLast
        )
    }

    /// Words that replace the top of the stack by a value computed from it.
    pub fn is_unary_transform(self) -> bool {
        matches!(
            self,
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
                | TreeKind::FPos
                | TreeKind::FCount
                | TreeKind::FEach
                | TreeKind::FLength
                | TreeKind::FCast
                | TreeKind::SelUnit
        )
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! sub_kind {
    ($(#[$meta:meta])* $sub:ident { $($kind:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $sub {
            $($kind,)*
        }

        impl From<$sub> for TreeKind {
            fn from(kind: $sub) -> TreeKind {
                match kind {
                    $($sub::$kind => TreeKind::$kind,)*
                }
            }
        }
    };
}

sub_kind!(
    /// Kinds built without children or payload.
    NullaryKind {
        EmptyList, Nop, PredEq, PredNe, PredGt, PredGe, PredLt, PredLe, PredFind, PredMatch,
        PredEmpty, PredRoot, PredLast, FAdd, FSub, FMul, FDiv, FMod, FParent, FChild,
        FAttribute, FPrev, FNext, FType, FOffset, FName, FTag, FForm, FValue, FPos, FCount,
        FEach, FLength, SelUniverse, SelUnit, ShfSwap, ShfDup, ShfOver, ShfRot, ShfDrop,
    }
);

sub_kind!(
    UnaryKind {
        Capture, Protect, ClosePlus, CloseStar, Maybe, Assert, PredNot, PredSubxAll, PredSubxAny,
    }
);

sub_kind!(
    BinaryKind { Cat, Alt, Transform, PredAnd, PredOr }
);

sub_kind!(
    /// Kinds that carry a typed constant.
    CstKind { PredAt, PredTag, Const, FAttrNamed, FCast }
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    Cst(Constant),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => f.write_str(s),
            Literal::Cst(c) => write!(f, "{c}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub(crate) kind: TreeKind,
    pub(crate) children: Vec<Tree>,
    pub(crate) literal: Option<Literal>,
    pub(crate) src_a: Option<Slot>,
    pub(crate) src_b: Option<Slot>,
    pub(crate) dst: Option<Slot>,
    /// Stack slots a closure carries from one iteration to the next.
    pub(crate) live: Vec<Slot>,
}

impl Tree {
    pub(crate) fn bare(kind: TreeKind) -> Self {
        Tree { kind, children: Vec::new(), literal: None, src_a: None, src_b: None, dst: None, live: Vec::new() }
    }

    pub(crate) fn with_children(kind: TreeKind, children: Vec<Tree>) -> Self {
        Tree { children, ..Tree::bare(kind) }
    }

    pub fn nullary(kind: NullaryKind) -> Self {
        Tree::bare(kind.into())
    }

    pub fn unary(kind: UnaryKind, child: Tree) -> Self {
        Tree::with_children(kind.into(), vec![child])
    }

    pub fn binary(kind: BinaryKind, lhs: Tree, rhs: Tree) -> Self {
        Tree::with_children(kind.into(), vec![lhs, rhs])
    }

    pub fn str(value: impl Into<String>) -> Self {
        Tree { literal: Some(Literal::Str(value.into())), ..Tree::bare(TreeKind::Str) }
    }

    pub fn cst(kind: CstKind, value: Constant) -> Self {
        Tree { literal: Some(Literal::Cst(value)), ..Tree::bare(kind.into()) }
    }

    pub fn constant(value: Constant) -> Self {
        Tree::cst(CstKind::Const, value)
    }

    /// A format string: `STR` pieces are copied verbatim, every other piece
    /// is evaluated and rendered.
    pub fn format(pieces: impl IntoIterator<Item = Tree>) -> Self {
        Tree::with_children(TreeKind::Format, pieces.into_iter().collect())
    }

    /// `depth/body`
    pub fn transform(depth: u64, body: Tree) -> Self {
        Tree::binary(BinaryKind::Transform, Tree::constant(Constant::unsigned(depth)), body)
    }

    pub fn assert(pred: Tree) -> Self {
        Tree::unary(UnaryKind::Assert, pred)
    }

    pub fn not(pred: Tree) -> Self {
        Tree::unary(UnaryKind::PredNot, pred)
    }

    /// Concatenation that appends to an existing `CAT` instead of nesting.
    pub fn cat(lhs: Tree, rhs: Tree) -> Self {
        Tree::merge(TreeKind::Cat, lhs, rhs)
    }

    /// Alternation that appends to an existing `ALT` instead of nesting.
    pub fn alt(lhs: Tree, rhs: Tree) -> Self {
        Tree::merge(TreeKind::Alt, lhs, rhs)
    }

    fn merge(kind: TreeKind, lhs: Tree, rhs: Tree) -> Self {
        let mut ret = if lhs.kind == kind { lhs } else { Tree::with_children(kind, vec![lhs]) };
        if rhs.kind == kind {
            ret.children.extend(rhs.children);
        } else {
            ret.children.push(rhs);
        }
        ret
    }

    /// Concatenation of any number of trees.
    pub fn seq(items: impl IntoIterator<Item = Tree>) -> Self {
        items.into_iter().fold(Tree::bare(TreeKind::Cat), Tree::cat)
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    pub fn children(&self) -> &[Tree] {
        &self.children
    }

    pub fn literal(&self) -> Option<&Literal> {
        self.literal.as_ref()
    }

    pub fn src_a(&self) -> Option<Slot> {
        self.src_a
    }

    pub fn src_b(&self) -> Option<Slot> {
        self.src_b
    }

    pub fn dst(&self) -> Option<Slot> {
        self.dst
    }

    pub(crate) fn child(&self, idx: usize) -> &Tree {
        &self.children[idx]
    }

    pub(crate) fn string(&self) -> &str {
        match &self.literal {
            Some(Literal::Str(s)) => s,
            _ => panic!("{} carries no string", self.kind),
        }
    }

    pub(crate) fn constant_value(&self) -> Constant {
        match &self.literal {
            Some(Literal::Cst(c)) => *c,
            _ => panic!("{} carries no constant", self.kind),
        }
    }

    /// Whether this node or any node below it reads or writes `slot`.
    pub(crate) fn mentions(&self, slot: Slot) -> bool {
        [self.src_a, self.src_b, self.dst].contains(&Some(slot))
            || self.children.iter().any(|child| child.mentions(slot))
    }

    pub(crate) fn is_unsigned_const(&self) -> bool {
        self.kind == TreeKind::Const
            && matches!(self.literal, Some(Literal::Cst(c)) if c.domain() == Domain::Unsigned)
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.kind)?;
        if let Some(literal) = &self.literal {
            write!(f, "<{literal}>")?;
        }
        if self.src_a.is_some() || self.src_b.is_some() || self.dst.is_some() {
            f.write_str(" [")?;
            if let Some(a) = self.src_a {
                write!(f, "a={a};")?;
            }
            if let Some(b) = self.src_b {
                write!(f, "b={b};")?;
            }
            if let Some(dst) = self.dst {
                write!(f, "dst={dst};")?;
            }
            f.write_str("]")?;
        }
        for child in &self.children {
            write!(f, " {child}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwquery_core::{At, Tag};

    #[test]
    fn cat_appends_instead_of_nesting() {
        let t = Tree::cat(
            Tree::cat(Tree::nullary(NullaryKind::SelUniverse), Tree::nullary(NullaryKind::FChild)),
            Tree::nullary(NullaryKind::FName),
        );
        assert_eq!(t.kind(), TreeKind::Cat);
        assert_eq!(t.children().len(), 3);

        let t = Tree::alt(Tree::nullary(NullaryKind::Nop), Tree::alt(Tree::str("a"), Tree::str("b")));
        assert_eq!(t.children().len(), 3);
    }

    #[test]
    fn dump_shows_literals_and_slots() {
        let mut t = Tree::seq([
            Tree::nullary(NullaryKind::SelUniverse),
            Tree::assert(Tree::cst(CstKind::PredTag, Constant::tag(Tag::SUBPROGRAM))),
            Tree::cst(CstKind::FAttrNamed, Constant::attribute(At::NAME)),
        ]);
        t.children[0].dst = Some(0);
        t.children[2].src_a = Some(0);
        t.children[2].dst = Some(0);
        assert_eq!(
            t.to_string(),
            "(CAT (SEL_UNIVERSE [dst=0;]) (ASSERT (PRED_TAG<DW_TAG_subprogram>)) \
             (F_ATTR_NAMED<DW_AT_name> [a=0;dst=0;]))"
        );
    }

    #[test]
    fn arity_follows_the_constructor() {
        assert_eq!(TreeKind::from(NullaryKind::FAdd).arity(), Arity::Nullary);
        assert_eq!(TreeKind::from(CstKind::FCast).arity(), Arity::Cst);
        assert_eq!(Tree::transform(2, Tree::nullary(NullaryKind::FParent)).children().len(), 2);
        assert!(Tree::transform(2, Tree::nullary(NullaryKind::FParent)).child(0).is_unsigned_const());
        assert!(TreeKind::PredSubxAny.is_predicate());
        assert!(!TreeKind::Assert.is_predicate());
    }
}
