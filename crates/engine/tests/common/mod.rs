#![allow(dead_code)]

use std::rc::Rc;

use dwquery_core::memory::{die, unit};
use dwquery_core::{At, Constant, DebugInfo, MemoryInfo, Tag};
use dwquery_engine::{CstKind, Program, Tree, TreeKind, ValFile, Value};

/// Routes engine logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// [0] cu a.c
//   [1] base_type int
//   [2] structure_type point
//     [3] member x
//     [4] member y
//     [5] member z
//   [6] subprogram main (external)
//     [7] formal_parameter argc
//     [8] variable p
//   [9] subprogram (abstract_origin -> 6)
// [10] cu b.c
//   [11] variable g
pub fn info() -> Rc<dyn DebugInfo> {
    Rc::new(MemoryInfo::new([
        unit("a.c")
            .child(die(Tag::BASE_TYPE).name("int").udata(At::BYTE_SIZE, 4))
            .child(
                die(Tag::STRUCTURE_TYPE)
                    .name("point")
                    .udata(At::BYTE_SIZE, 12)
                    .child(die(Tag::MEMBER).name("x").reference(At::TYPE, 1))
                    .child(die(Tag::MEMBER).name("y").reference(At::TYPE, 1))
                    .child(die(Tag::MEMBER).name("z").reference(At::TYPE, 1)),
            )
            .child(
                die(Tag::SUBPROGRAM)
                    .name("main")
                    .flag(At::EXTERNAL)
                    .child(die(Tag::FORMAL_PARAMETER).name("argc").reference(At::TYPE, 1))
                    .child(die(Tag::VARIABLE).name("p").reference(At::TYPE, 2)),
            )
            .child(die(Tag::SUBPROGRAM).reference(At::ABSTRACT_ORIGIN, 6)),
        unit("b.c").child(die(Tag::VARIABLE).name("g").reference(At::TYPE, 1)),
    ]))
}

pub fn tag(tag: Tag) -> Tree {
    Tree::cst(CstKind::PredTag, Constant::tag(tag))
}

pub fn has(at: At) -> Tree {
    Tree::cst(CstKind::PredAt, Constant::attribute(at))
}

/// Runs `program` on `bank` and renders the given slot of every result.
pub fn render(program: &mut Program, bank: &ValFile, slot: usize) -> Vec<String> {
    program.run(bank).map(|r| r.unwrap().value(slot).unwrap().to_string()).collect()
}

/// Slot the last word of a sequence leaves its result in.
pub fn result_slot(tree: &Tree) -> usize {
    match tree.kind() {
        TreeKind::Cat => tree.children().last().map_or(0, result_slot),
        _ => tree.dst().unwrap_or(0),
    }
}

/// Runs a program that takes no input and renders the slot its last word writes.
pub fn run(program: &mut Program) -> Vec<String> {
    let bank = program.bank();
    let slot = result_slot(program.tree());
    render(program, &bank, slot)
}

pub fn values(program: &mut Program, bank: &ValFile, slot: usize) -> Vec<Value> {
    program.run(bank).map(|r| r.unwrap().value(slot).unwrap().clone()).collect()
}
