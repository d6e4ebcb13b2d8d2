mod common;

use common::{has, info, init_tracing, render, run, tag};
use dwquery_core::{At, Constant, Die, Tag};
use dwquery_engine::{
    BuildError, BuildOptions, CstKind, EvalError, NullaryKind as N, SlotValue, Tree, UnaryKind, ValFile, build,
    build_with_options,
};
use rstest::rstest;

fn universe() -> Tree {
    Tree::nullary(N::SelUniverse)
}

fn query(items: impl IntoIterator<Item = Tree>) -> Vec<String> {
    init_tracing();
    let mut program = build(Tree::seq(items), info(), 16).unwrap();
    run(&mut program)
}

#[test]
fn names_of_subprograms_follow_abstract_origins() {
    let names = query([universe(), Tree::assert(tag(Tag::SUBPROGRAM)), Tree::nullary(N::FName)]);
    assert_eq!(names, ["main", "main"]);
}

#[test]
fn children_are_iterated_in_order() {
    let names = query([
        universe(),
        Tree::assert(tag(Tag::STRUCTURE_TYPE)),
        Tree::nullary(N::FChild),
        Tree::nullary(N::FName),
    ]);
    assert_eq!(names, ["x", "y", "z"]);
}

#[test]
fn child_of_an_input_die() {
    let options = BuildOptions::default().with_inputs(1);
    let mut program = build_with_options(Tree::nullary(N::FChild), info(), &options).unwrap();
    let bank = ValFile::with_values(1, [SlotValue::new(Die(2))]).unwrap();
    assert_eq!(render(&mut program, &bank, 0), ["[3]", "[4]", "[5]"]);

    let leaf = ValFile::with_values(1, [SlotValue::new(Die(3))]).unwrap();
    assert_eq!(program.run(&leaf).count(), 0);
}

#[test]
fn count_and_last_see_the_whole_producer() {
    let counts = query([
        universe(),
        Tree::assert(tag(Tag::STRUCTURE_TYPE)),
        Tree::nullary(N::FChild),
        Tree::nullary(N::FCount),
    ]);
    assert_eq!(counts, ["3", "3", "3"]);

    let last = query([
        universe(),
        Tree::assert(tag(Tag::STRUCTURE_TYPE)),
        Tree::nullary(N::FChild),
        Tree::assert(Tree::nullary(N::PredLast)),
        Tree::nullary(N::FName),
    ]);
    assert_eq!(last, ["z"]);
}

#[test]
fn positions_count_from_zero() {
    let positions = query([
        universe(),
        Tree::assert(tag(Tag::SUBPROGRAM)),
        Tree::nullary(N::FChild),
        Tree::nullary(N::FPos),
    ]);
    assert_eq!(positions, ["0", "1"]);
}

#[test]
fn attributes_and_their_values() {
    let names = query([
        universe(),
        Tree::assert(tag(Tag::BASE_TYPE)),
        Tree::nullary(N::FAttribute),
        Tree::nullary(N::FName),
    ]);
    assert_eq!(names, ["DW_AT_name", "DW_AT_byte_size"]);

    let values = query([
        universe(),
        Tree::assert(tag(Tag::BASE_TYPE)),
        Tree::nullary(N::FAttribute),
        Tree::nullary(N::FValue),
    ]);
    assert_eq!(values, ["int", "4"]);
}

#[test]
fn references_decode_to_dies() {
    let types = query([
        universe(),
        Tree::assert(tag(Tag::VARIABLE)),
        Tree::cst(CstKind::FAttrNamed, Constant::attribute(At::TYPE)),
        Tree::nullary(N::FName),
    ]);
    assert_eq!(types, ["point", "int"]);
}

#[test]
fn closure_walks_each_unit_depth_first() {
    let names = query([
        universe(),
        Tree::assert(Tree::nullary(N::PredRoot)),
        Tree::unary(UnaryKind::CloseStar, Tree::nullary(N::FChild)),
        Tree::nullary(N::FName),
    ]);
    assert_eq!(names, ["a.c", "int", "point", "x", "y", "z", "main", "argc", "p", "main", "b.c", "g"]);
}

#[test]
fn plus_closure_skips_the_start() {
    let offsets = query([
        universe(),
        Tree::assert(tag(Tag::STRUCTURE_TYPE)),
        Tree::unary(UnaryKind::ClosePlus, Tree::nullary(N::FChild)),
    ]);
    assert_eq!(offsets, ["[3]", "[4]", "[5]"]);
}

#[test]
fn maybe_yields_both_paths() {
    let dies = query([
        universe(),
        Tree::assert(tag(Tag::MEMBER)),
        Tree::unary(UnaryKind::Maybe, Tree::nullary(N::FParent)),
    ]);
    assert_eq!(dies, ["[2]", "[3]", "[2]", "[4]", "[2]", "[5]"]);
}

#[test]
fn units_of_variables() {
    let units = query([
        universe(),
        Tree::assert(tag(Tag::VARIABLE)),
        Tree::nullary(N::SelUnit),
        Tree::nullary(N::FName),
    ]);
    assert_eq!(units, ["a.c", "b.c"]);
}

#[test]
fn alternation_keeps_branch_order_per_bank() {
    let dies = query([
        universe(),
        Tree::assert(tag(Tag::STRUCTURE_TYPE)),
        Tree::alt(Tree::nullary(N::FChild), Tree::nullary(N::FParent)),
    ]);
    assert_eq!(dies, ["[3]", "[4]", "[5]", "[0]"]);
}

#[test]
fn format_renders_every_combination() {
    let lines = query([
        universe(),
        Tree::assert(tag(Tag::MEMBER)),
        Tree::format([Tree::str("member "), Tree::nullary(N::FName)]),
    ]);
    assert_eq!(lines, ["member x", "member y", "member z"]);

    let pairs = query([Tree::format([
        Tree::alt(Tree::str("a"), Tree::str("b")),
        Tree::str("-"),
        Tree::alt(Tree::str("1"), Tree::str("2")),
    ])]);
    assert_eq!(pairs, ["a-1", "a-2", "b-1", "b-2"]);
}

#[test]
fn format_with_an_empty_piece_yields_nothing() {
    let empty = Tree::seq([Tree::nullary(N::EmptyList), Tree::nullary(N::FEach)]);
    let lines = query([Tree::format([Tree::str("x"), empty])]);
    assert!(lines.is_empty());
}

#[test]
fn arithmetic_on_attribute_values() {
    let sizes = query([
        universe(),
        Tree::assert(tag(Tag::STRUCTURE_TYPE)),
        Tree::cst(CstKind::FAttrNamed, Constant::attribute(At::BYTE_SIZE)),
        Tree::constant(Constant::unsigned(2)),
        Tree::nullary(N::FMul),
    ]);
    assert_eq!(sizes, ["24"]);
}

#[rstest]
#[case(N::FAdd, "7")]
#[case(N::FSub, "3")]
#[case(N::FMul, "10")]
#[case(N::FDiv, "2")]
#[case(N::FMod, "1")]
fn arithmetic(#[case] op: N, #[case] expected: &str) {
    let result = query([
        Tree::constant(Constant::unsigned(5)),
        Tree::constant(Constant::unsigned(2)),
        Tree::nullary(op),
    ]);
    assert_eq!(result, [expected]);
}

#[test]
fn strings_concatenate() {
    assert_eq!(query([Tree::str("foo"), Tree::str("bar"), Tree::nullary(N::FAdd)]), ["foobar"]);
}

#[test]
fn mismatched_operands_drop_the_bank() {
    let result = query([Tree::str("a"), Tree::constant(Constant::unsigned(1)), Tree::nullary(N::FAdd)]);
    assert!(result.is_empty());
}

#[test]
fn division_by_zero_ends_the_run() {
    let tree = Tree::seq([
        Tree::constant(Constant::unsigned(1)),
        Tree::constant(Constant::unsigned(0)),
        Tree::nullary(N::FDiv),
    ]);
    let mut program = build(tree, info(), 4).unwrap();
    let bank = program.bank();
    let mut results = program.run(&bank);
    assert!(matches!(results.next(), Some(Err(EvalError::DivisionByZero))));
    assert!(results.next().is_none());
}

#[test]
fn swap_with_and_without_elimination() {
    let tree = Tree::seq([Tree::str("a"), Tree::str("b"), Tree::nullary(N::ShfSwap), Tree::nullary(N::FAdd)]);
    for eliminate in [true, false] {
        let options = BuildOptions::default().with_shuffle_elimination(eliminate);
        let mut program = build_with_options(tree.clone(), info(), &options).unwrap();
        assert_eq!(run(&mut program), ["ba"], "eliminate = {eliminate}");
    }
}

#[test]
fn protect_keeps_the_protected_value() {
    let tree = Tree::seq([
        universe(),
        Tree::assert(tag(Tag::MEMBER)),
        Tree::unary(UnaryKind::Protect, Tree::nullary(N::FName)),
    ]);
    for simplify in [true, false] {
        let options = BuildOptions::default().with_simplify(simplify);
        let mut program = build_with_options(tree.clone(), info(), &options).unwrap();
        let bank = program.bank();
        assert_eq!(render(&mut program, &bank, 0), ["[3]", "[4]", "[5]"]);
        assert_eq!(render(&mut program, &bank, 1), ["x", "y", "z"]);
    }
}

#[test]
fn transform_applies_at_every_depth() {
    let tree = Tree::seq([
        universe(),
        Tree::assert(tag(Tag::MEMBER)),
        Tree::nullary(N::ShfDup),
        Tree::transform(2, Tree::nullary(N::FParent)),
    ]);
    let mut program = build(tree, info(), 4).unwrap();
    let bank = program.bank();
    assert_eq!(render(&mut program, &bank, 0), ["[2]", "[2]", "[2]"]);
    assert_eq!(render(&mut program, &bank, 1), ["[2]", "[2]", "[2]"]);
}

#[test]
fn capture_collects_and_each_expands() {
    let captured = query([
        universe(),
        Tree::assert(tag(Tag::STRUCTURE_TYPE)),
        Tree::unary(UnaryKind::Capture, Tree::nullary(N::FChild)),
    ]);
    assert_eq!(captured, ["[[3], [4], [5]]"]);

    let lengths = query([
        universe(),
        Tree::assert(tag(Tag::STRUCTURE_TYPE)),
        Tree::unary(UnaryKind::Capture, Tree::nullary(N::FChild)),
        Tree::nullary(N::FLength),
    ]);
    assert_eq!(lengths, ["3"]);

    assert!(query([Tree::nullary(N::EmptyList), Tree::nullary(N::FEach)]).is_empty());
    assert_eq!(query([Tree::nullary(N::EmptyList), Tree::nullary(N::FLength)]), ["0"]);
}

#[test]
fn subexpression_quantifiers() {
    let with_children = query([
        universe(),
        Tree::assert(Tree::unary(UnaryKind::PredSubxAny, Tree::nullary(N::FChild))),
        Tree::nullary(N::FName),
    ]);
    assert_eq!(with_children, ["a.c", "point", "main", "b.c"]);

    let all_members = query([
        universe(),
        Tree::assert(tag(Tag::STRUCTURE_TYPE)),
        Tree::unary(UnaryKind::Capture, Tree::nullary(N::FChild)),
        Tree::assert(Tree::unary(UnaryKind::PredSubxAll, Tree::assert(tag(Tag::MEMBER)))),
        Tree::nullary(N::FLength),
    ]);
    assert_eq!(all_members, ["3"]);

    let all_named_y = query([
        universe(),
        Tree::assert(tag(Tag::STRUCTURE_TYPE)),
        Tree::unary(UnaryKind::Capture, Tree::nullary(N::FChild)),
        Tree::assert(Tree::unary(
            UnaryKind::PredSubxAll,
            Tree::seq([Tree::nullary(N::FName), Tree::str("y"), Tree::assert(Tree::nullary(N::PredEq))]),
        )),
    ]);
    assert!(all_named_y.is_empty());
}

#[test]
fn attribute_presence_and_negation() {
    // The concrete instance inherits from its abstract origin.
    let external = query([universe(), Tree::assert(has(At::EXTERNAL))]);
    assert_eq!(external, ["[6]", "[9]"]);

    let sizeless = query([
        universe(),
        Tree::assert(has(At::NAME)),
        Tree::assert(Tree::not(has(At::TYPE))),
        Tree::assert(Tree::not(has(At::BYTE_SIZE))),
        Tree::nullary(N::FName),
    ]);
    assert_eq!(sizeless, ["a.c", "main", "main", "b.c"]);
}

#[test]
fn regular_expressions_match_whole_strings() {
    let tree = Tree::seq([
        universe(),
        Tree::nullary(N::FName),
        Tree::str("[a-z]\\.c"),
        Tree::assert(Tree::nullary(N::PredMatch)),
    ]);
    let mut program = build(tree, info(), 4).unwrap();
    let bank = program.bank();
    assert_eq!(render(&mut program, &bank, 0), ["a.c", "b.c"]);
}

#[test]
fn type_and_cast() {
    assert_eq!(query([Tree::str("x"), Tree::nullary(N::FType)]), ["T_STR"]);
    let tag = query([
        Tree::constant(Constant::unsigned(0x2e)),
        Tree::cst(CstKind::FCast, Constant::tag(Tag::BASE_TYPE)),
    ]);
    assert_eq!(tag, ["DW_TAG_subprogram"]);
}

#[test]
fn literals_of_the_wrong_domain_are_rejected() {
    let tree = Tree::seq([universe(), Tree::assert(Tree::cst(CstKind::PredTag, Constant::unsigned(5)))]);
    assert_eq!(
        build(tree, info(), 4).unwrap_err(),
        BuildError::InvalidLiteral { kind: "PRED_TAG", expected: "a tag", literal: "5".into() }
    );
}
