//! Compilation of expression trees into programs.
//!
//! [`build`] runs the passes in order:
//!
//! 1. peephole simplification,
//! 2. slot allocation ([`Tree::src_a`], [`Tree::src_b`], [`Tree::dst`] get filled in),
//! 3. cardinality resolution for `count` and `?last`,
//! 4. simplification again, now that the slot rules can fire,
//! 5. lowering onto pipeline nodes.

mod cardinality;
mod graph;
mod operands;
mod simplify;
mod stack;

use std::rc::Rc;

use dwquery_core::DebugInfo;
use tracing::debug;

use self::cardinality::{Unresolved, resolve_count};
use self::operands::resolve_operands;
use self::stack::StackRefs;
use crate::engine::{PredProgram, Program};
use crate::error::BuildError;
use crate::tree::Tree;

/// Knobs for [`build_with_options`] and [`build_pred`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Upper bound on the number of register slots.
    pub max_width: Option<usize>,
    /// Number of slots already filled in the bank passed to
    /// [`Program::run`], bottom of the stack first.
    pub inputs: usize,
    pub simplify: bool,
    /// Turn stack shuffles into slot renaming where control flow allows.
    pub eliminate_shuffles: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions { max_width: None, inputs: 0, simplify: true, eliminate_shuffles: true }
    }
}

impl BuildOptions {
    #[must_use]
    pub fn with_max_width(mut self, max_width: usize) -> Self {
        self.max_width = Some(max_width);
        self
    }

    #[must_use]
    pub fn with_inputs(mut self, inputs: usize) -> Self {
        self.inputs = inputs;
        self
    }

    #[must_use]
    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }

    #[must_use]
    pub fn with_shuffle_elimination(mut self, eliminate: bool) -> Self {
        self.eliminate_shuffles = eliminate;
        self
    }
}

/// Compiles `tree` into a program evaluating over `info`.
///
/// # Errors
///
/// Fails if the tree's stack effects are inconsistent (unbalanced
/// alternation, non-neutral iteration, stack underflow and similar), or if
/// the program would need more than `max_width` slots.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use dwquery_core::memory::{die, unit};
/// use dwquery_core::{MemoryInfo, Tag};
/// use dwquery_engine::{NullaryKind, Tree, build};
///
/// let info = Rc::new(MemoryInfo::new([unit("a.c").child(die(Tag::VARIABLE).name("x"))]));
/// let tree = Tree::seq([
///     Tree::nullary(NullaryKind::SelUniverse),
///     Tree::nullary(NullaryKind::FName),
/// ]);
/// let mut program = build(tree, info, 8).unwrap();
/// let bank = program.bank();
/// let names: Vec<String> = program
///     .run(&bank)
///     .map(|r| r.unwrap().value(0).unwrap().to_string())
///     .collect();
/// assert_eq!(names, ["a.c", "x"]);
/// ```
pub fn build(tree: Tree, info: Rc<dyn DebugInfo>, max_width: usize) -> Result<Program, BuildError> {
    build_with_options(tree, info, &BuildOptions::default().with_max_width(max_width))
}

/// [`build`] with explicit [`BuildOptions`].
///
/// # Errors
///
/// See [`build`].
pub fn build_with_options(
    mut tree: Tree,
    info: Rc<dyn DebugInfo>,
    options: &BuildOptions,
) -> Result<Program, BuildError> {
    let width = resolve(&mut tree, options)?;
    let op = graph::isolated(&tree, &info)?;
    debug!(op = op.name(), "program built");
    Ok(Program::new(tree, width, op))
}

/// Compiles a tree whose root is a predicate. Its operands are read from
/// the `inputs` bottom slots of the bank passed to
/// [`PredProgram::evaluate`].
///
/// # Errors
///
/// [`BuildError::NotAPredicate`] if the root is not a predicate, otherwise
/// as for [`build`].
pub fn build_pred(mut tree: Tree, info: Rc<dyn DebugInfo>, options: &BuildOptions) -> Result<PredProgram, BuildError> {
    if !tree.kind().is_predicate() {
        return Err(BuildError::NotAPredicate(tree.kind().name()));
    }
    let width = resolve(&mut tree, options)?;
    let pred = graph::build_pred(&tree, &info)?;
    Ok(PredProgram::new(tree, width, pred))
}

/// Runs the tree passes and returns the number of slots the tree needs.
fn resolve(tree: &mut Tree, options: &BuildOptions) -> Result<usize, BuildError> {
    if options.simplify {
        simplify::simplify(tree);
    }

    let sr = resolve_operands(tree, StackRefs::with_inputs(options.inputs), options.eliminate_shuffles)?;
    let width = sr.max();

    // Counts of input slots are the caller's business.
    let mut open = resolve_count(tree, Unresolved::new());
    open.retain(|&slot| slot >= options.inputs);
    assert!(open.is_empty(), "no producer for the count of slots {open:?} in {tree}");

    if options.simplify {
        simplify::simplify(tree);
    }
    debug!(width, tree = %tree, "resolved");

    match options.max_width {
        Some(max) if width > max => Err(BuildError::TooWide { width, max }),
        _ => Ok(width),
    }
}
