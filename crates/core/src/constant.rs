//! Typed integer constants.
//!
//! A constant is a 64-bit payload tagged with the domain that gives it
//! meaning. The domain decides signedness, how the value prints and which
//! other constants it can be compared with.

use core::cmp::Ordering;
use core::fmt;

use crate::dwarf::{At, Form, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Unsigned,
    Signed,
    Address,
    Bool,
    Tag,
    Attribute,
    Form,
    /// Runtime slot types, see [`SlotType`].
    Type,
}

impl Domain {
    /// Arithmetic domains mix freely with each other in comparisons and arithmetic.
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Domain::Unsigned | Domain::Signed | Domain::Address)
    }

    /// Domain of the result of an arithmetic operation over `self` and `other`.
    pub fn merge(self, other: Domain) -> Option<Domain> {
        if !self.is_arithmetic() || !other.is_arithmetic() {
            return None;
        }
        Some(if self == Domain::Signed || other == Domain::Signed {
            Domain::Signed
        } else if self == Domain::Address || other == Domain::Address {
            Domain::Address
        } else {
            Domain::Unsigned
        })
    }
}

/// Kinds of values a register slot can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SlotType {
    Invalid = 0,
    Cst,
    Str,
    Flt,
    Seq,
    Die,
    Attribute,
    Line,
    LoclistEntry,
    LoclistOp,
}

const SLOT_TYPES: [(SlotType, &str); 10] = [
    (SlotType::Invalid, "T_INVALID"),
    (SlotType::Cst, "T_CONST"),
    (SlotType::Str, "T_STR"),
    (SlotType::Flt, "T_FLOAT"),
    (SlotType::Seq, "T_SEQ"),
    (SlotType::Die, "T_NODE"),
    (SlotType::Attribute, "T_ATTR"),
    (SlotType::Line, "T_LINE"),
    (SlotType::LoclistEntry, "T_LOCLIST_ENTRY"),
    (SlotType::LoclistOp, "T_LOCLIST_OP"),
];

impl SlotType {
    pub fn from_code(code: u64) -> Option<SlotType> {
        SLOT_TYPES.iter().find(|(ty, _)| *ty as u64 == code).map(|(ty, _)| *ty)
    }

    pub fn name(self) -> &'static str {
        SLOT_TYPES[self as usize].1
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constant {
    value: u64,
    domain: Domain,
}

impl Constant {
    pub const fn new(value: u64, domain: Domain) -> Self {
        Self { value, domain }
    }

    pub const fn unsigned(value: u64) -> Self {
        Self::new(value, Domain::Unsigned)
    }

    pub const fn signed(value: i64) -> Self {
        Self::new(value.cast_unsigned(), Domain::Signed)
    }

    pub const fn address(value: u64) -> Self {
        Self::new(value, Domain::Address)
    }

    pub const fn boolean(value: bool) -> Self {
        Self::new(value as u64, Domain::Bool)
    }

    pub const fn tag(tag: Tag) -> Self {
        Self::new(tag.0 as u64, Domain::Tag)
    }

    pub const fn attribute(at: At) -> Self {
        Self::new(at.0 as u64, Domain::Attribute)
    }

    pub const fn form(form: Form) -> Self {
        Self::new(form.0 as u64, Domain::Form)
    }

    pub const fn slot_type(ty: SlotType) -> Self {
        Self::new(ty as u64, Domain::Type)
    }

    /// Builds a constant from a wide intermediate, `None` when it does not fit the domain.
    pub fn from_i128(value: i128, domain: Domain) -> Option<Self> {
        let raw = if domain == Domain::Signed {
            i64::try_from(value).ok()?.cast_unsigned()
        } else {
            u64::try_from(value).ok()?
        };
        Some(Self::new(raw, domain))
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// The value as the domain interprets it.
    pub fn as_i128(&self) -> i128 {
        if self.domain == Domain::Signed { i128::from(self.value.cast_signed()) } else { i128::from(self.value) }
    }

    pub fn as_tag(&self) -> Option<Tag> {
        (self.domain == Domain::Tag).then(|| u16::try_from(self.value).ok().map(Tag)).flatten()
    }

    pub fn as_attribute(&self) -> Option<At> {
        (self.domain == Domain::Attribute).then(|| u16::try_from(self.value).ok().map(At)).flatten()
    }

    /// Same payload, different domain.
    pub fn cast(&self, domain: Domain) -> Constant {
        Constant::new(self.value, domain)
    }

    /// Orders two constants, `None` when their domains cannot be compared.
    pub fn compare(&self, other: &Constant) -> Option<Ordering> {
        if self.domain == other.domain || (self.domain.is_arithmetic() && other.domain.is_arithmetic()) {
            Some(self.as_i128().cmp(&other.as_i128()))
        } else {
            None
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.domain {
            Domain::Unsigned | Domain::Signed => write!(f, "{}", self.as_i128()),
            Domain::Address => write!(f, "{:#x}", self.value),
            Domain::Bool => f.write_str(if self.value != 0 { "true" } else { "false" }),
            Domain::Tag => match u16::try_from(self.value) {
                Ok(v) => write!(f, "{}", Tag(v)),
                Err(_) => write!(f, "DW_TAG_{:#x}", self.value),
            },
            Domain::Attribute => match u16::try_from(self.value) {
                Ok(v) => write!(f, "{}", At(v)),
                Err(_) => write!(f, "DW_AT_{:#x}", self.value),
            },
            Domain::Form => match u16::try_from(self.value) {
                Ok(v) => write!(f, "{}", Form(v)),
                Err(_) => write!(f, "DW_FORM_{:#x}", self.value),
            },
            Domain::Type => match SlotType::from_code(self.value) {
                Some(ty) => write!(f, "{ty}"),
                None => write!(f, "T_{:#x}", self.value),
            },
        }
    }
}
