//! The root list: an ordered sequence of mutator-owned slot addresses, each
//! holding one managed pointer, that the collector must be able to find and
//! update on every cycle.
//!
//! Registration follows strict LIFO discipline: the mutator pushes a slot
//! before it can be overwritten by a collection and pops it when the slot
//! goes out of scope, in exactly the reverse order it was pushed (the same
//! discipline a call stack enforces on its frames).

use crate::linked_list::LinkedList;

pub type RootSlot = *mut *mut u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootError {
    /// `pop` was called with no roots registered.
    Underflow,
    /// `pop` named a slot that is not the most recently pushed one.
    Mismatch { expected: RootSlot, actual: RootSlot },
}

#[derive(Default)]
pub struct RootList {
    slots: LinkedList<RootSlot>,
}

impl RootList {
    pub fn new() -> Self {
        Self {
            slots: LinkedList::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn push(&mut self, slot: RootSlot) {
        self.slots.push_back(slot);
    }

    /// Pops `slot`, verifying it matches the top of the stack.
    ///
    /// The original runtime's `gc_pop_root` trusts the caller and pops
    /// unconditionally; a safe reimplementation can and should check, since
    /// a mismatched pop means some caller broke LIFO discipline and any
    /// later root forwarding would silently touch the wrong slot.
    pub fn pop(&mut self, slot: RootSlot) -> Result<(), RootError> {
        match self.slots.last() {
            None => Err(RootError::Underflow),
            Some(&top) if top != slot => Err(RootError::Mismatch {
                expected: top,
                actual: slot,
            }),
            Some(_) => {
                self.slots.pop_back();
                Ok(())
            }
        }
    }

    /// Iterates roots in push order (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &RootSlot> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(addr: usize) -> RootSlot {
        addr as RootSlot
    }

    #[test]
    fn push_pop_round_trip() {
        let mut roots = RootList::new();
        roots.push(slot(0x1000));
        roots.push(slot(0x2000));
        assert_eq!(roots.len(), 2);
        assert_eq!(roots.pop(slot(0x2000)), Ok(()));
        assert_eq!(roots.pop(slot(0x1000)), Ok(()));
        assert!(roots.is_empty());
    }

    #[test]
    fn pop_on_empty_underflows() {
        let mut roots = RootList::new();
        assert_eq!(roots.pop(slot(0x1)), Err(RootError::Underflow));
    }

    #[test]
    fn pop_out_of_order_mismatches() {
        let mut roots = RootList::new();
        roots.push(slot(0x1000));
        roots.push(slot(0x2000));
        assert_eq!(
            roots.pop(slot(0x1000)),
            Err(RootError::Mismatch {
                expected: slot(0x2000),
                actual: slot(0x1000),
            })
        );
        // the failed pop must not have mutated the stack
        assert_eq!(roots.len(), 2);
    }

    #[test]
    fn iterates_in_push_order() {
        let mut roots = RootList::new();
        roots.push(slot(1));
        roots.push(slot(2));
        roots.push(slot(3));
        let seen: Vec<_> = roots.iter().copied().collect();
        assert_eq!(seen, vec![slot(1), slot(2), slot(3)]);
    }
}
