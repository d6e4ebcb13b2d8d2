//! The capability set a debug-info store offers to the query engine.

use crate::attribute::{Attribute, Decoded};
use crate::die::Die;
use crate::dwarf::{At, Tag};
use crate::error::InfoError;

/// Links followed by integrated attribute lookup, in order of preference.
const INTEGRATE_LINKS: [At; 2] = [At::ABSTRACT_ORIGIN, At::SPECIFICATION];

/// Bound on the length of an abstract-origin/specification chain.
const MAX_INTEGRATE_DEPTH: usize = 64;

/// Read-only navigation over a tree of debugging information entries.
///
/// Implementors provide the primitive accessors; the lookups built on top
/// of them have default implementations that a store may override when it
/// can answer them faster.
pub trait DebugInfo {
    /// Root DIEs of every compilation unit, in section order.
    fn units(&self) -> Result<Vec<Die>, InfoError>;

    fn tag(&self, die: Die) -> Result<Tag, InfoError>;

    fn first_child(&self, die: Die) -> Result<Option<Die>, InfoError>;

    fn next_sibling(&self, die: Die) -> Result<Option<Die>, InfoError>;

    fn parent(&self, die: Die) -> Result<Option<Die>, InfoError>;

    /// Attributes of `die` in the order they were encoded.
    fn attributes(&self, die: Die) -> Result<Vec<Attribute>, InfoError>;

    fn has_children(&self, die: Die) -> Result<bool, InfoError> {
        Ok(self.first_child(die)?.is_some())
    }

    fn prev_sibling(&self, die: Die) -> Result<Option<Die>, InfoError> {
        let Some(parent) = self.parent(die)? else {
            return Ok(None);
        };
        let mut prev = None;
        let mut cursor = self.first_child(parent)?;
        while let Some(cur) = cursor {
            if cur == die {
                return Ok(prev);
            }
            prev = Some(cur);
            cursor = self.next_sibling(cur)?;
        }
        Ok(None)
    }

    /// Attribute attached directly to `die`.
    fn attribute(&self, die: Die, name: At) -> Result<Option<Attribute>, InfoError> {
        Ok(self.attributes(die)?.into_iter().find(|attr| attr.name == name))
    }

    /// Attribute of `die`, or of the DIEs it inherits from through
    /// `DW_AT_abstract_origin` and `DW_AT_specification`.
    fn attribute_integrate(&self, die: Die, name: At) -> Result<Option<Attribute>, InfoError> {
        let mut current = die;
        for _ in 0..MAX_INTEGRATE_DEPTH {
            let attributes = self.attributes(current)?;
            if let Some(attr) = attributes.iter().find(|attr| attr.name == name) {
                return Ok(Some(attr.clone()));
            }
            let link = INTEGRATE_LINKS
                .iter()
                .find_map(|link| attributes.iter().find(|attr| attr.name == *link));
            let Some(link) = link else {
                return Ok(None);
            };
            match link.decode()? {
                Decoded::Ref(target) => current = target,
                _ => return Err(InfoError::malformed(link.name, link.form, "not a reference")),
            }
        }
        tracing::debug!(%die, %name, "integrated lookup gave up on a long chain");
        Ok(None)
    }

    fn has_attribute_integrate(&self, die: Die, name: At) -> Result<bool, InfoError> {
        Ok(self.attribute_integrate(die, name)?.is_some())
    }

    /// Root DIE of the unit that contains `die`.
    fn unit_of(&self, die: Die) -> Result<Die, InfoError> {
        let mut current = die;
        while let Some(parent) = self.parent(current)? {
            current = parent;
        }
        Ok(current)
    }

    /// Whether `die` is the root of a compilation unit. Scans every unit.
    fn is_unit_root(&self, die: Die) -> Result<bool, InfoError> {
        Ok(self.units()?.contains(&die))
    }
}

/// Pre-order walk over every DIE of every unit.
#[derive(Debug, Clone)]
pub struct AllDies {
    units: Vec<Die>,
    unit: usize,
    next: Option<Die>,
}

impl AllDies {
    pub fn new(info: &dyn DebugInfo) -> Result<Self, InfoError> {
        let units = info.units()?;
        let next = units.first().copied();
        Ok(Self { units, unit: 0, next })
    }

    pub fn advance(&mut self, info: &dyn DebugInfo) -> Result<Option<Die>, InfoError> {
        let Some(current) = self.next else {
            return Ok(None);
        };
        self.next = self.successor(info, current)?;
        Ok(Some(current))
    }

    fn successor(&mut self, info: &dyn DebugInfo, die: Die) -> Result<Option<Die>, InfoError> {
        if let Some(child) = info.first_child(die)? {
            return Ok(Some(child));
        }
        let mut current = die;
        loop {
            if Some(&current) == self.units.get(self.unit) {
                self.unit += 1;
                return Ok(self.units.get(self.unit).copied());
            }
            if let Some(sibling) = info.next_sibling(current)? {
                return Ok(Some(sibling));
            }
            current = info.parent(current)?.ok_or(InfoError::UnknownDie(current.offset()))?;
        }
    }
}
