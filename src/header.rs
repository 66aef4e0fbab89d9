//! Object header layout.
//!
//! Every managed cell begins with a single machine word split into a tag and
//! a field count, the same way comet packs `GCInfoIndex`/size/mark bits into
//! `HeapObjectHeader`: a bitfield half plus platform padding so the whole
//! header is exactly one word wide.

use crate::tag::Tag;
use modular_bitfield::prelude::*;
use std::mem::size_of;

#[bitfield(bits = 32)]
#[derive(Clone, Copy)]
pub struct HeaderBits {
    pub tag: B8,
    pub field_count: B24,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct Header {
    bits: HeaderBits,
    #[cfg(target_pointer_width = "64")]
    _padding: u32,
}

pub const HEADER_SIZE: usize = size_of::<Header>();

impl Header {
    pub fn new(tag: Tag, field_count: usize) -> Self {
        let mut bits = HeaderBits::new();
        bits.set_tag(tag as u8);
        bits.set_field_count(field_count as u32);
        Self {
            bits,
            #[cfg(target_pointer_width = "64")]
            _padding: 0,
        }
    }

    #[inline(always)]
    pub fn tag(&self) -> Tag {
        Tag::from_u8(self.bits.tag())
    }

    #[inline(always)]
    pub fn field_count(&self) -> usize {
        self.bits.field_count() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_word_sized() {
        assert_eq!(HEADER_SIZE, size_of::<usize>().max(8));
    }

    #[test]
    fn tag_and_field_count_survive_packing() {
        let h = Header::new(Tag::Cons, 2);
        assert_eq!(h.tag(), Tag::Cons);
        assert_eq!(h.field_count(), 2);
    }
}
