//! Fixed-offset EEPROM layouts, one per layout revision.

use crate::error::{MetadataError, Result};

/// Byte offset of the 3-byte layout revision tag.
pub const REVISION_OFFSET: usize = 0x04;

const REVISION_LEN: usize = 3;

/// `(offset, length)` of every field of an address-mapped record, in
/// declared field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressMap {
    pub revision: &'static [u8; 3],
    pub fields: &'static [(usize, usize)],
}

/// Layout revision 1.1.
pub const V11: AddressMap = AddressMap {
    revision: b"1.1",
    fields: &[
        (0x04, 3),
        (0x07, 4),
        (0x0B, 17),
        (0x2B, 7),
        (0x3B, 37),
        (0x61, 8),
        (0x69, 8),
        (0x71, 3),
        (0x75, 22),
        (0x8E, 13),
        (0xA7, 11),
        (0xBB, 4),
    ],
};

/// Layout revision 1.2. Widens the serial number to 7 bytes and shifts
/// every later field accordingly.
pub const V12: AddressMap = AddressMap {
    revision: b"1.2",
    fields: &[
        (0x04, 3),
        (0x07, 7),
        (0x11, 17),
        (0x31, 7),
        (0x41, 37),
        (0x67, 8),
        (0x6F, 8),
        (0x77, 3),
        (0x7B, 22),
        (0x94, 13),
        (0xAD, 11),
        (0xC1, 4),
    ],
};

static KNOWN: [AddressMap; 2] = [V11, V12];

impl AddressMap {
    /// Select the layout named by the revision tag embedded in `block`.
    pub fn for_block(block: &[u8]) -> Result<&'static AddressMap> {
        let tag = block
            .get(REVISION_OFFSET..REVISION_OFFSET + REVISION_LEN)
            .unwrap_or_default();
        KNOWN
            .iter()
            .find(|map| map.revision.as_slice() == tag)
            .ok_or_else(|| MetadataError::UnsupportedRevision(String::from_utf8_lossy(tag).into()))
    }

    /// Raw bytes of field `index`, or `None` if the block is too short.
    pub fn slice<'a>(&self, block: &'a [u8], index: usize) -> Option<&'a [u8]> {
        let (offset, len) = *self.fields.get(index)?;
        block.get(offset..offset + len)
    }
}
