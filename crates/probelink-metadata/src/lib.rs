//! Probe identity metadata and identifier tables.
//!
//! Every probe and power supply stores an identity record in a 256-byte
//! EEPROM block (16 pages of 16 bytes). This crate decodes and encodes that
//! block, and provides the one-to-one tables used to translate between
//! model names and the internal codes stored in it.

pub mod bijection;
pub mod error;
pub mod field;
pub mod layout;
pub mod mapping;
pub mod record;

pub use bijection::{Bijection, BijectionMap};
pub use error::{MetadataError, Result};
pub use field::{FieldDef, FieldKind, Value, DATE_FORMAT};
pub use layout::{AddressMap, REVISION_OFFSET, V11, V12};
pub use mapping::{UserMapping, UUIDS};
pub use record::{
    FireFlyMetadata, Metadata, MetadataRecord, BLOCK_SIZE, FILLER, NUM_PAGES, PAGE_SIZE,
};
