//! Data model shared by the dwquery engine and the stores it queries.
//!
//! The engine sees debugging information only through [`DebugInfo`]: a small
//! set of synchronous, read-only navigation and lookup primitives over DIEs.
//! [`MemoryInfo`] implements it over a tree built in memory.

pub mod attribute;
pub mod constant;
pub mod die;
pub mod dwarf;
pub mod error;
pub mod info;
pub mod location;
pub mod memory;

pub use attribute::{AttrValue, Attribute, Decoded, Signedness, data_signedness};
pub use constant::{Constant, Domain, SlotType};
pub use die::Die;
pub use dwarf::{At, Form, Tag};
pub use error::InfoError;
pub use info::{AllDies, DebugInfo};
pub use location::{LineRecord, LocOp, LoclistEntry};
pub use memory::{DieSpec, MemoryInfo};
