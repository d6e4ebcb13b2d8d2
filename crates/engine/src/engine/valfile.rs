//! Register banks.
//!
//! A bank is a fixed-width array of slots threaded through the pipeline.
//! Cloning is cheap: storage is shared until one of the copies writes.

use core::cmp::Ordering;
use std::rc::Rc;

use dwquery_core::{Constant, Die, SlotType};
use smallvec::SmallVec;

use super::value::{SlotValue, Value};
use crate::error::SlotError;
use crate::tree::Slot;

type Slots = SmallVec<[Option<SlotValue>; 8]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValFile {
    slots: Rc<Slots>,
}

impl ValFile {
    /// A bank of `width` unset slots.
    pub fn new(width: usize) -> Self {
        ValFile { slots: Rc::new(core::iter::repeat_n(None, width).collect()) }
    }

    /// Builds a bank whose bottom slots hold `values`, in order.
    pub fn with_values(width: usize, values: impl IntoIterator<Item = SlotValue>) -> Result<Self, SlotError> {
        let mut vf = ValFile::new(width);
        for (slot, value) in values.into_iter().enumerate() {
            vf.set(slot, value)?;
        }
        Ok(vf)
    }

    /// Copy of this bank resized to `width`: slots up to `width` are kept,
    /// any beyond the old width are unset.
    #[must_use]
    pub fn copy(&self, width: usize) -> Self {
        if width == self.width() {
            return self.clone();
        }
        let slots = (0..width).map(|slot| self.slots.get(slot).cloned().flatten()).collect();
        ValFile { slots: Rc::new(slots) }
    }

    pub fn width(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_type(&self, slot: Slot) -> SlotType {
        match self.slots.get(slot) {
            Some(Some(sv)) => sv.value.slot_type(),
            _ => SlotType::Invalid,
        }
    }

    pub fn get(&self, slot: Slot) -> Result<&SlotValue, SlotError> {
        match self.slots.get(slot) {
            Some(Some(sv)) => Ok(sv),
            Some(None) => Err(SlotError::Unset(slot)),
            None => Err(SlotError::OutOfRange { slot, width: self.width() }),
        }
    }

    pub fn value(&self, slot: Slot) -> Result<&Value, SlotError> {
        Ok(&self.get(slot)?.value)
    }

    pub fn set(&mut self, slot: Slot, value: SlotValue) -> Result<(), SlotError> {
        let width = self.width();
        match Rc::make_mut(&mut self.slots).get_mut(slot) {
            Some(entry) => {
                *entry = Some(value);
                Ok(())
            }
            None => Err(SlotError::OutOfRange { slot, width }),
        }
    }

    /// Stores a value produced one-to-one from its input.
    pub fn set_value(&mut self, slot: Slot, value: impl Into<Value>) -> Result<(), SlotError> {
        self.set(slot, SlotValue::new(value))
    }

    pub fn invalidate(&mut self, slot: Slot) {
        if self.slots.get(slot).is_some_and(Option::is_some) {
            Rc::make_mut(&mut self.slots)[slot] = None;
        }
    }

    pub fn cst(&self, slot: Slot) -> Result<Constant, SlotError> {
        match self.value(slot)? {
            Value::Cst(c) => Ok(*c),
            other => Err(self.mismatch(slot, SlotType::Cst, other)),
        }
    }

    pub fn str(&self, slot: Slot) -> Result<&str, SlotError> {
        match self.value(slot)? {
            Value::Str(s) => Ok(s),
            other => Err(self.mismatch(slot, SlotType::Str, other)),
        }
    }

    pub fn die(&self, slot: Slot) -> Result<Die, SlotError> {
        match self.value(slot)? {
            Value::Die(d) => Ok(*d),
            other => Err(self.mismatch(slot, SlotType::Die, other)),
        }
    }

    pub fn seq(&self, slot: Slot) -> Result<&[Value], SlotError> {
        match self.value(slot)? {
            Value::Seq(values) => Ok(values),
            other => Err(self.mismatch(slot, SlotType::Seq, other)),
        }
    }

    fn mismatch(&self, slot: Slot, expected: SlotType, found: &Value) -> SlotError {
        SlotError::Type { slot, expected, found: found.slot_type() }
    }

    /// Compares the values of two slots. `Ok(None)` when their types differ
    /// or the values cannot be ordered.
    pub fn compare(&self, a: Slot, b: Slot) -> Result<Option<Ordering>, SlotError> {
        Ok(self.value(a)?.compare(self.value(b)?))
    }
}
