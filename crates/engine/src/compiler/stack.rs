//! Symbolic stack used by the slot allocator.

use core::fmt;

use smallvec::SmallVec;

use crate::error::BuildError;
use crate::tree::Slot;

type Slots = SmallVec<[Slot; 8]>;

/// Slots taken off the stack, waiting to be handed back one at a time.
#[derive(Debug, Clone)]
pub(crate) struct SlotBuf {
    slots: Slots,
}

impl SlotBuf {
    fn release(&mut self) -> Slot {
        assert!(!self.slots.is_empty(), "slot buffer exhausted");
        self.slots.remove(0)
    }

    pub(crate) fn reversed(mut self) -> SlotBuf {
        self.slots.reverse();
        self
    }
}

/// Slot numbers live on the symbolic stack, plus the free list of retired
/// ones. Every push is stamped with an age, used only to pick destinations.
#[derive(Debug, Clone, Default)]
pub(crate) struct StackRefs {
    freelist: Slots,
    age: usize,
    max: usize,
    stk: Slots,
    ages: SmallVec<[usize; 8]>,
}

impl PartialEq for StackRefs {
    fn eq(&self, other: &Self) -> bool {
        self.freelist == other.freelist && self.stk == other.stk && self.max == other.max
    }
}

impl StackRefs {
    /// A stack whose bottom `inputs` slots are already live.
    pub(crate) fn with_inputs(inputs: usize) -> Self {
        let mut sr = StackRefs::default();
        for _ in 0..inputs {
            sr.push();
        }
        sr
    }

    pub(crate) fn depth(&self) -> usize {
        self.stk.len()
    }

    pub(crate) fn slots(&self) -> &[Slot] {
        &self.stk
    }

    pub(crate) fn max(&self) -> usize {
        self.max
    }

    pub(crate) fn push(&mut self) {
        let slot = self.freelist.pop().unwrap_or_else(|| {
            self.max += 1;
            self.max - 1
        });
        self.stk.push(slot);
        self.ages.push(self.age);
        self.age += 1;
    }

    fn take_one(&mut self, buf: &mut SlotBuf) {
        self.freelist.push(buf.release());
    }

    pub(crate) fn push_one(&mut self, buf: &mut SlotBuf) {
        self.take_one(buf);
        self.push();
    }

    pub(crate) fn accommodate(&mut self, other: &StackRefs) {
        self.max = self.max.max(other.max);
    }

    pub(crate) fn drop(&mut self, n: usize) -> Result<(), BuildError> {
        let mut buf = self.drop_release(n)?;
        while !buf.slots.is_empty() {
            self.take_one(&mut buf);
        }
        Ok(())
    }

    /// Pops `n` slots without retiring them, topmost first.
    pub(crate) fn drop_release(&mut self, n: usize) -> Result<SlotBuf, BuildError> {
        if self.stk.len() < n {
            return Err(BuildError::StackUnderflow);
        }
        let mut slots = Slots::new();
        for _ in 0..n {
            slots.extend(self.stk.pop());
            self.ages.pop();
        }
        Ok(SlotBuf { slots })
    }

    pub(crate) fn swap(&mut self) -> Result<(), BuildError> {
        let n = self.stk.len();
        if n < 2 {
            return Err(BuildError::StackUnderflow);
        }
        self.stk.swap(n - 2, n - 1);
        self.ages.swap(n - 2, n - 1);
        Ok(())
    }

    pub(crate) fn top(&self) -> Result<Slot, BuildError> {
        Ok(self.top_w_age()?.0)
    }

    pub(crate) fn top_w_age(&self) -> Result<(Slot, usize), BuildError> {
        self.nth_w_age(0)
    }

    pub(crate) fn below(&self) -> Result<Slot, BuildError> {
        Ok(self.below_w_age()?.0)
    }

    pub(crate) fn below_w_age(&self) -> Result<(Slot, usize), BuildError> {
        self.nth_w_age(1)
    }

    fn nth_w_age(&self, depth: usize) -> Result<(Slot, usize), BuildError> {
        let n = self.stk.len();
        if n <= depth {
            return Err(BuildError::StackUnderflow);
        }
        Ok((self.stk[n - 1 - depth], self.ages[n - 1 - depth]))
    }
}

impl fmt::Display for StackRefs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        for (i, slot) in self.stk.iter().enumerate() {
            let sep = if i == 0 { "" } else { ";" };
            write!(f, "{sep}x{slot}")?;
        }
        f.write_str(">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retired_slots_are_reused() {
        let mut sr = StackRefs::default();
        sr.push();
        sr.push();
        assert_eq!(sr.slots(), &[0, 1]);
        sr.drop(1).unwrap();
        sr.push();
        assert_eq!(sr.slots(), &[0, 1]);
        assert_eq!(sr.max(), 2);
    }

    #[test]
    fn dropping_two_reissues_the_lower_slot_first() {
        let mut sr = StackRefs::with_inputs(2);
        sr.drop(2).unwrap();
        sr.push();
        assert_eq!(sr.slots(), &[0]);
    }

    #[test]
    fn swap_exchanges_ages_too() {
        let mut sr = StackRefs::with_inputs(2);
        sr.swap().unwrap();
        assert_eq!(sr.top_w_age().unwrap(), (0, 0));
        assert_eq!(sr.below_w_age().unwrap(), (1, 1));
        assert_eq!(sr.to_string(), "<x1;x0>");
    }

    #[test]
    fn underrun_is_reported() {
        let mut sr = StackRefs::with_inputs(1);
        assert_eq!(sr.below(), Err(BuildError::StackUnderflow));
        assert_eq!(sr.swap(), Err(BuildError::StackUnderflow));
        assert_eq!(sr.drop(2), Err(BuildError::StackUnderflow));
        assert_eq!(sr.depth(), 1);
    }

    #[test]
    fn equality_ignores_ages() {
        let mut a = StackRefs::with_inputs(1);
        let mut b = StackRefs::with_inputs(1);
        a.push();
        a.drop(1).unwrap();
        b.push();
        b.drop(1).unwrap();
        b.push();
        b.drop(1).unwrap();
        assert_eq!(a, b);
        let mut c = a.clone();
        c.accommodate(&StackRefs::with_inputs(5));
        assert_ne!(a, c);
    }

    #[test]
    fn push_one_reacquires_released_slots_in_order() {
        let mut sr = StackRefs::with_inputs(3);
        let mut buf = sr.drop_release(2).unwrap().reversed();
        sr.push_one(&mut buf);
        assert_eq!(sr.top().unwrap(), 1);
        sr.drop(1).unwrap();
        sr.push_one(&mut buf);
        assert_eq!(sr.top().unwrap(), 2);
    }
}
