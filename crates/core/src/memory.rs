//! In-memory debug-info store for tests and quick prototypes.
//!
//! Offsets are assigned in global pre-order starting at 0, so the third
//! DIE written (counting unit roots) has offset 2. Reference attributes hold
//! such global offsets.
//!
//! ```
//! use dwquery_core::memory::{MemoryInfo, die, unit};
//! use dwquery_core::{At, DebugInfo, Die, Tag};
//!
//! let info = MemoryInfo::new([unit("a.c")
//!     .child(die(Tag::BASE_TYPE).name("int").udata(At::BYTE_SIZE, 4))
//!     .child(die(Tag::VARIABLE).name("x").reference(At::TYPE, 1))]);
//!
//! assert_eq!(info.units().unwrap(), vec![Die(0)]);
//! assert_eq!(info.next_sibling(Die(1)).unwrap(), Some(Die(2)));
//! ```

use crate::attribute::{AttrValue, Attribute};
use crate::die::Die;
use crate::dwarf::{At, Form, Tag};
use crate::error::InfoError;
use crate::info::DebugInfo;

/// Builder of one DIE and its subtree.
#[derive(Debug, Clone)]
pub struct DieSpec {
    tag: Tag,
    attributes: Vec<Attribute>,
    children: Vec<DieSpec>,
}

pub fn die(tag: Tag) -> DieSpec {
    DieSpec { tag, attributes: Vec::new(), children: Vec::new() }
}

/// A `DW_TAG_compile_unit` named `name`.
pub fn unit(name: &str) -> DieSpec {
    die(Tag::COMPILE_UNIT).name(name)
}

impl DieSpec {
    pub fn attr(mut self, name: At, form: Form, value: impl Into<AttrValue>) -> Self {
        self.attributes.push(Attribute::new(name, form, value));
        self
    }

    pub fn name(self, name: &str) -> Self {
        self.attr(At::NAME, Form::STRING, name)
    }

    pub fn udata(self, name: At, value: u64) -> Self {
        self.attr(name, Form::UDATA, value)
    }

    pub fn sdata(self, name: At, value: i64) -> Self {
        self.attr(name, Form::SDATA, value)
    }

    pub fn flag(self, name: At) -> Self {
        self.attr(name, Form::FLAG_PRESENT, true)
    }

    /// Reference to the DIE at global offset `target`.
    pub fn reference(self, name: At, target: u64) -> Self {
        self.attr(name, Form::REF4, target)
    }

    pub fn child(mut self, child: DieSpec) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug)]
struct Entry {
    tag: Tag,
    parent: Option<Die>,
    first_child: Option<Die>,
    next_sibling: Option<Die>,
    attributes: Vec<Attribute>,
}

#[derive(Debug, Default)]
pub struct MemoryInfo {
    entries: Vec<Entry>,
    units: Vec<Die>,
}

impl MemoryInfo {
    pub fn new(units: impl IntoIterator<Item = DieSpec>) -> Self {
        let mut info = MemoryInfo::default();
        for spec in units {
            let root = info.insert(spec, None);
            info.units.push(root);
        }
        info
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, spec: DieSpec, parent: Option<Die>) -> Die {
        let die = Die(self.entries.len() as u64);
        self.entries.push(Entry {
            tag: spec.tag,
            parent,
            first_child: None,
            next_sibling: None,
            attributes: spec.attributes,
        });
        let mut prev: Option<Die> = None;
        for child in spec.children {
            let child = self.insert(child, Some(die));
            match prev {
                Some(prev) => self.entries[prev.0 as usize].next_sibling = Some(child),
                None => self.entries[die.0 as usize].first_child = Some(child),
            }
            prev = Some(child);
        }
        die
    }

    fn entry(&self, die: Die) -> Result<&Entry, InfoError> {
        usize::try_from(die.0)
            .ok()
            .and_then(|idx| self.entries.get(idx))
            .ok_or(InfoError::UnknownDie(die.0))
    }
}

impl DebugInfo for MemoryInfo {
    fn units(&self) -> Result<Vec<Die>, InfoError> {
        Ok(self.units.clone())
    }

    fn tag(&self, die: Die) -> Result<Tag, InfoError> {
        Ok(self.entry(die)?.tag)
    }

    fn first_child(&self, die: Die) -> Result<Option<Die>, InfoError> {
        Ok(self.entry(die)?.first_child)
    }

    fn next_sibling(&self, die: Die) -> Result<Option<Die>, InfoError> {
        Ok(self.entry(die)?.next_sibling)
    }

    fn parent(&self, die: Die) -> Result<Option<Die>, InfoError> {
        Ok(self.entry(die)?.parent)
    }

    fn attributes(&self, die: Die) -> Result<Vec<Attribute>, InfoError> {
        Ok(self.entry(die)?.attributes.clone())
    }

    fn attribute(&self, die: Die, name: At) -> Result<Option<Attribute>, InfoError> {
        Ok(self.entry(die)?.attributes.iter().find(|attr| attr.name == name).cloned())
    }
}
