use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::NaiveDate;
use tracing::warn;

use crate::error::{MetadataError, Result};
use crate::field::{FieldDef, FieldKind, Value};
use crate::layout::AddressMap;
use crate::mapping::UUIDS;

/// EEPROM page size in bytes.
pub const PAGE_SIZE: usize = 16;

/// Number of pages in a metadata block.
pub const NUM_PAGES: usize = 16;

/// Size of a serialized metadata block.
pub const BLOCK_SIZE: usize = PAGE_SIZE * NUM_PAGES;

/// Byte used to pad a serialized block (`?`).
pub const FILLER: u8 = 0x3F;

/// Erased EEPROM cells read back as this byte.
const ERASED: u8 = 0xFF;

const FIELD_SEPARATOR: u8 = b'\n';

const BASE_FIELDS: [FieldDef; 11] = [
    FieldDef::new("eeprom_layout_revision", FieldKind::Text),
    FieldDef::new("serial_number", FieldKind::Text),
    FieldDef::new("manufacturer", FieldKind::Text),
    FieldDef::new("model", FieldKind::Text),
    FieldDef::new("description", FieldKind::Text),
    FieldDef::new("production_date", FieldKind::Date),
    FieldDef::new("calibration_due_date", FieldKind::Date),
    FieldDef::new("calibration_instance", FieldKind::Text),
    FieldDef::new("hardware_revision", FieldKind::Text),
    FieldDef::new("software_revision", FieldKind::Text),
    FieldDef::new("uuid", FieldKind::Text),
];

const FIREFLY_FIELDS: [FieldDef; 12] = [
    BASE_FIELDS[0],
    BASE_FIELDS[1],
    BASE_FIELDS[2],
    BASE_FIELDS[3],
    BASE_FIELDS[4],
    BASE_FIELDS[5],
    BASE_FIELDS[6],
    BASE_FIELDS[7],
    BASE_FIELDS[8],
    BASE_FIELDS[9],
    BASE_FIELDS[10],
    FieldDef::new("propagation_delay", FieldKind::Float),
];

/// A device identity record stored in a metadata block.
///
/// Every record serializes to the same textual form: each field followed by
/// a newline, absent fields as empty lines, padded with [`FILLER`] to
/// [`BLOCK_SIZE`] bytes. Records differ only in their field table and in how
/// a block is parsed back.
pub trait MetadataRecord: Sized {
    /// Declared fields, in serialization order.
    const FIELDS: &'static [FieldDef];

    /// Decode a record from a metadata block.
    fn from_bytes(block: &[u8]) -> Result<Self>;

    /// Field values in declared order.
    fn values(&self) -> Vec<Option<Value>>;

    /// Serialize to exactly [`BLOCK_SIZE`] bytes.
    ///
    /// Text containing a newline or the filler byte is rejected, since the
    /// block could not be parsed back into the same fields.
    fn to_bytes(&self) -> Result<Bytes> {
        let values = self.values();
        for (def, value) in Self::FIELDS.iter().zip(&values) {
            if let Some(Value::Text(text)) = value {
                if text.bytes().any(|byte| byte == FIELD_SEPARATOR || byte == FILLER) {
                    return Err(MetadataError::InvalidFieldText { field: def.name });
                }
            }
        }
        let text = text_form(&values);
        if text.len() > BLOCK_SIZE {
            return Err(MetadataError::BlockOverflow {
                size: text.len(),
                max: BLOCK_SIZE,
            });
        }
        let mut block = BytesMut::with_capacity(BLOCK_SIZE);
        block.put_slice(&text);
        block.put_bytes(FILLER, BLOCK_SIZE - text.len());
        Ok(block.freeze())
    }

    /// The serialized block split into [`NUM_PAGES`] pages of [`PAGE_SIZE`] bytes.
    fn as_pages(&self) -> Result<Vec<Bytes>> {
        let block = self.to_bytes()?;
        Ok((0..NUM_PAGES)
            .map(|page| block.slice(page * PAGE_SIZE..(page + 1) * PAGE_SIZE))
            .collect())
    }

    /// `(field name, value)` pairs in declared order.
    fn named_values(&self) -> Vec<(&'static str, Option<Value>)> {
        Self::FIELDS
            .iter()
            .map(|def| def.name)
            .zip(self.values())
            .collect()
    }
}

/// Identity record shared by all probes and power supplies.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub eeprom_layout_revision: Option<String>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub production_date: Option<NaiveDate>,
    pub calibration_due_date: Option<NaiveDate>,
    pub calibration_instance: Option<String>,
    pub hardware_revision: Option<String>,
    pub software_revision: Option<String>,
    /// Internal model code. Codes missing from [`UUIDS`] are treated as absent.
    pub uuid: Option<String>,
}

macro_rules! setters {
    ($($field:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $field(mut self, value: impl Into<$ty>) -> Self {
                self.$field = Some(value.into());
                self
            }
        )*
    };
}

impl Metadata {
    /// An empty record, to be filled with the builder setters.
    ///
    /// ```
    /// use probelink_metadata::Metadata;
    ///
    /// let record = Metadata::new().model("BumbleBee2kV").uuid("886-102-504");
    /// assert_eq!(record.probe_model(), Some("BumbleBee2kV"));
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    setters! {
        eeprom_layout_revision: String,
        serial_number: String,
        manufacturer: String,
        model: String,
        description: String,
        production_date: NaiveDate,
        calibration_due_date: NaiveDate,
        calibration_instance: String,
        hardware_revision: String,
        software_revision: String,
    }

    /// Set the internal model code. Codes missing from [`UUIDS`] leave the
    /// field absent.
    pub fn uuid(mut self, uuid: impl Into<String>) -> Self {
        let uuid = uuid.into();
        if UUIDS.contains_internal(uuid.as_str()) {
            self.uuid = Some(uuid);
        } else {
            warn!(%uuid, "unknown internal code; leaving uuid empty");
            self.uuid = None;
        }
        self
    }

    /// The model name registered for this record's internal code.
    pub fn probe_model(&self) -> Option<&'static str> {
        let uuid = self.known_uuid()?;
        UUIDS.to_user(uuid).ok().copied()
    }

    fn known_uuid(&self) -> Option<&str> {
        self.uuid
            .as_deref()
            .filter(|uuid| UUIDS.contains_internal(*uuid))
    }

    fn from_values(values: Vec<Option<Value>>) -> Self {
        let mut values = values.into_iter();
        let mut record = Self {
            eeprom_layout_revision: next_text(&mut values),
            serial_number: next_text(&mut values),
            manufacturer: next_text(&mut values),
            model: next_text(&mut values),
            description: next_text(&mut values),
            production_date: next_date(&mut values),
            calibration_due_date: next_date(&mut values),
            calibration_instance: next_text(&mut values),
            hardware_revision: next_text(&mut values),
            software_revision: next_text(&mut values),
            uuid: next_text(&mut values),
        };
        if record.uuid.is_some() && record.known_uuid().is_none() {
            warn!(uuid = ?record.uuid, "unknown internal code; clearing uuid");
            record.uuid = None;
        }
        record
    }
}

impl MetadataRecord for Metadata {
    const FIELDS: &'static [FieldDef] = &BASE_FIELDS;

    /// Sequential layout: fields are newline-separated in declared order.
    fn from_bytes(block: &[u8]) -> Result<Self> {
        Ok(Self::from_values(decode_sequential(block, Self::FIELDS)))
    }

    fn values(&self) -> Vec<Option<Value>> {
        vec![
            self.eeprom_layout_revision.clone().map(Value::Text),
            self.serial_number.clone().map(Value::Text),
            self.manufacturer.clone().map(Value::Text),
            self.model.clone().map(Value::Text),
            self.description.clone().map(Value::Text),
            self.production_date.map(Value::Date),
            self.calibration_due_date.map(Value::Date),
            self.calibration_instance.clone().map(Value::Text),
            self.hardware_revision.clone().map(Value::Text),
            self.software_revision.clone().map(Value::Text),
            self.known_uuid().map(|uuid| Value::Text(uuid.to_string())),
        ]
    }
}

/// Identity record of the FireFly probe, which adds a propagation delay.
///
/// The probe stores its block at fixed offsets that depend on the layout
/// revision, so decoding is address-mapped. Encoding uses the common
/// textual form.
#[derive(Debug, Clone, Default)]
pub struct FireFlyMetadata {
    pub base: Metadata,
    /// Signal propagation delay of the probe head.
    pub propagation_delay: Option<f32>,
}

impl MetadataRecord for FireFlyMetadata {
    const FIELDS: &'static [FieldDef] = &FIREFLY_FIELDS;

    fn from_bytes(block: &[u8]) -> Result<Self> {
        let map = AddressMap::for_block(block)?;
        let mut values: Vec<Option<Value>> = Self::FIELDS
            .iter()
            .enumerate()
            .map(|(index, def)| match map.slice(block, index) {
                Some(raw) if def.kind == FieldKind::Float => parse_or_absent(def, raw),
                Some(raw) => parse_or_absent(def, trim_padding(raw)),
                None => {
                    warn!(field = def.name, "field lies outside the block");
                    None
                }
            })
            .collect();

        let propagation_delay = values.pop().flatten().and_then(Value::into_float);
        Ok(Self {
            base: Metadata::from_values(values),
            propagation_delay,
        })
    }

    fn values(&self) -> Vec<Option<Value>> {
        let mut values = self.base.values();
        values.push(self.propagation_delay.map(Value::Float));
        values
    }
}

/// Records are equal when they serialize to the same bytes.
impl PartialEq for Metadata {
    fn eq(&self, other: &Self) -> bool {
        text_form(&self.values()) == text_form(&other.values())
    }
}

impl PartialEq for FireFlyMetadata {
    fn eq(&self, other: &Self) -> bool {
        text_form(&self.values()) == text_form(&other.values())
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(f, &self.named_values())
    }
}

impl fmt::Display for FireFlyMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(f, &self.named_values())
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[(&str, Option<Value>)]) -> fmt::Result {
    for (name, value) in fields {
        let text = value
            .as_ref()
            .map(Value::to_field_string)
            .unwrap_or_default();
        writeln!(f, "{name}: {text}")?;
    }
    Ok(())
}

fn text_form(values: &[Option<Value>]) -> Vec<u8> {
    let mut text = Vec::with_capacity(BLOCK_SIZE);
    for value in values {
        if let Some(value) = value {
            text.extend_from_slice(value.to_field_string().as_bytes());
        }
        text.push(FIELD_SEPARATOR);
    }
    text
}

/// Drop every erased and filler byte, split on newlines, and hand the k-th
/// segment to the k-th field.
fn decode_sequential(block: &[u8], fields: &[FieldDef]) -> Vec<Option<Value>> {
    let cleaned: Vec<u8> = block
        .iter()
        .copied()
        .filter(|byte| *byte != ERASED && *byte != FILLER)
        .collect();
    let segments: Vec<&[u8]> = cleaned.split(|byte| *byte == FIELD_SEPARATOR).collect();

    fields
        .iter()
        .enumerate()
        .map(|(index, def)| {
            let segment = segments.get(index).copied().unwrap_or_default();
            parse_or_absent(def, segment)
        })
        .collect()
}

fn parse_or_absent(def: &FieldDef, raw: &[u8]) -> Option<Value> {
    match def.parse(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "treating field as absent");
            None
        }
    }
}

fn trim_padding(raw: &[u8]) -> &[u8] {
    let end = raw
        .iter()
        .rposition(|byte| !matches!(*byte, ERASED | FILLER | 0x00 | FIELD_SEPARATOR))
        .map_or(0, |pos| pos + 1);
    &raw[..end]
}

fn next_text(values: &mut impl Iterator<Item = Option<Value>>) -> Option<String> {
    values.next().flatten().and_then(Value::into_text)
}

fn next_date(values: &mut impl Iterator<Item = Option<Value>>) -> Option<NaiveDate> {
    values.next().flatten().and_then(Value::into_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{REVISION_OFFSET, V11, V12};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Metadata {
        Metadata {
            eeprom_layout_revision: Some("1.2".into()),
            serial_number: Some("0624100".into()),
            manufacturer: Some("http://www.pmk.de".into()),
            model: Some("BumbleBee2kV".into()),
            description: Some("High voltage probe system".into()),
            production_date: Some(date(2024, 6, 20)),
            calibration_due_date: Some(date(2025, 6, 20)),
            calibration_instance: Some("PMK".into()),
            hardware_revision: Some("M7.2 K5.0".into()),
            software_revision: Some("M1.0 K0.0".into()),
            uuid: Some("886-102-504".into()),
        }
    }

    #[test]
    fn roundtrip_preserves_every_field() {
        let record = sample();
        let block = record.to_bytes().unwrap();
        let decoded = Metadata::from_bytes(&block).unwrap();

        assert_eq!(decoded.serial_number.as_deref(), Some("0624100"));
        assert_eq!(decoded.production_date, Some(date(2024, 6, 20)));
        assert_eq!(decoded.uuid.as_deref(), Some("886-102-504"));
        assert_eq!(decoded, record);
        assert_eq!(decoded.to_bytes().unwrap(), block);
    }

    #[test]
    fn block_is_always_256_bytes() {
        assert_eq!(sample().to_bytes().unwrap().len(), BLOCK_SIZE);
        assert_eq!(Metadata::default().to_bytes().unwrap().len(), BLOCK_SIZE);

        let block = Metadata::default().to_bytes().unwrap();
        assert_eq!(&block[..11], b"\n\n\n\n\n\n\n\n\n\n\n");
        assert!(block[11..].iter().all(|b| *b == FILLER));
    }

    #[test]
    fn absent_field_survives_roundtrip() {
        let mut record = sample();
        record.calibration_due_date = None;
        record.description = None;

        let decoded = Metadata::from_bytes(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.calibration_due_date, None);
        assert_eq!(decoded.description, None);
        assert_eq!(decoded.model.as_deref(), Some("BumbleBee2kV"));
        assert_eq!(decoded.production_date, Some(date(2024, 6, 20)));
        assert_eq!(decoded, record);
    }

    #[test]
    fn builder_fills_fields_and_checks_uuid() {
        let record = Metadata::new()
            .serial_number("0624100")
            .production_date(date(2024, 6, 20))
            .uuid("886-142-504");
        assert_eq!(record.serial_number.as_deref(), Some("0624100"));
        assert_eq!(record.probe_model(), Some("Hornet4kV"));

        let record = record.uuid("000-000-000");
        assert_eq!(record.uuid, None);
        assert_eq!(record.production_date, Some(date(2024, 6, 20)));
    }

    #[test]
    fn unknown_uuid_is_cleared() {
        let mut record = sample();
        record.uuid = Some("886-102-514".into());

        let block = record.to_bytes().unwrap();
        let decoded = Metadata::from_bytes(&block).unwrap();
        assert_eq!(decoded.uuid, None);

        record.uuid = None;
        assert_eq!(decoded, record);
    }

    #[test]
    fn decodes_device_block_with_padded_uuid() {
        let mut raw = Vec::new();
        raw.extend_from_slice(
            b"1.2\n0008\nhttp://www.pmk.de\nMockProbe\nHigh voltage probe system\n\
              20240620\n20250620\nPMK\nM7.2 K5.0\nM1.0 K0.0\n886-102-504?????????\n\n\n",
        );
        raw.resize(BLOCK_SIZE, FILLER);

        let decoded = Metadata::from_bytes(&raw).unwrap();
        assert_eq!(decoded.eeprom_layout_revision.as_deref(), Some("1.2"));
        assert_eq!(decoded.serial_number.as_deref(), Some("0008"));
        assert_eq!(decoded.calibration_due_date, Some(date(2025, 6, 20)));
        assert_eq!(decoded.uuid.as_deref(), Some("886-102-504"));
        assert_eq!(decoded.probe_model(), Some("BumbleBee2kV"));
    }

    #[test]
    fn erased_eeprom_decodes_to_empty_record() {
        let decoded = Metadata::from_bytes(&[0xFF; BLOCK_SIZE]).unwrap();
        assert_eq!(decoded, Metadata::default());
        assert_eq!(decoded.model, None);
    }

    #[test]
    fn bad_date_only_voids_that_field() {
        let mut raw = b"1.2\n0008\nPMK\nX\nY\n2024-06-20\n20250620\n".to_vec();
        raw.resize(BLOCK_SIZE, FILLER);

        let decoded = Metadata::from_bytes(&raw).unwrap();
        assert_eq!(decoded.production_date, None);
        assert_eq!(decoded.calibration_due_date, Some(date(2025, 6, 20)));
        assert_eq!(decoded.serial_number.as_deref(), Some("0008"));
        assert_eq!(decoded.uuid, None);
    }

    #[test]
    fn pages_split_block_in_order() {
        let record = sample();
        let block = record.to_bytes().unwrap();
        let pages = record.as_pages().unwrap();

        assert_eq!(pages.len(), NUM_PAGES);
        assert!(pages.iter().all(|page| page.len() == PAGE_SIZE));
        assert_eq!(pages.concat(), block.to_vec());
    }

    #[test]
    fn oversized_record_is_rejected() {
        let mut record = sample();
        record.description = Some("x".repeat(300));
        assert!(matches!(
            record.to_bytes(),
            Err(MetadataError::BlockOverflow { max: 256, .. })
        ));
    }

    #[test]
    fn text_that_would_split_fields_is_rejected() {
        let record = Metadata::new()
            .model("Line1\nLine2")
            .description("desc")
            .uuid("886-102-504");
        assert!(matches!(
            record.to_bytes(),
            Err(MetadataError::InvalidFieldText { field: "model" })
        ));

        let record = sample().hardware_revision("rev?");
        assert!(matches!(
            record.as_pages(),
            Err(MetadataError::InvalidFieldText {
                field: "hardware_revision"
            })
        ));
    }

    #[test]
    fn equality_is_byte_equality() {
        let mut a = sample();
        let mut b = sample();
        a.uuid = Some("not-a-code".into());
        b.uuid = None;
        assert_eq!(a, b);

        b.model = Some("Other".into());
        assert_ne!(a, b);
    }

    fn put(block: &mut [u8], offset: usize, bytes: &[u8]) {
        block[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn firefly_block(map: &AddressMap, serial: &[u8]) -> Vec<u8> {
        let texts: [&[u8]; 11] = [
            map.revision,
            serial,
            b"http://www.pmk.de",
            b"FireFly",
            b"Optically isolated probe",
            b"20240101",
            b"20250101",
            b"PMK",
            b"M1.0",
            b"S2.3",
            b"886-102-505",
        ];
        let mut block = vec![0xFF; BLOCK_SIZE];
        for (index, text) in texts.iter().enumerate() {
            put(&mut block, map.fields[index].0, text);
        }
        put(&mut block, map.fields[11].0, &12.5f32.to_le_bytes());
        block
    }

    #[test]
    fn firefly_v11_uses_v11_offsets() {
        let block = firefly_block(&V11, b"1234");
        let decoded = FireFlyMetadata::from_bytes(&block).unwrap();

        assert_eq!(decoded.base.eeprom_layout_revision.as_deref(), Some("1.1"));
        assert_eq!(decoded.base.serial_number.as_deref(), Some("1234"));
        assert_eq!(decoded.base.model.as_deref(), Some("FireFly"));
        assert_eq!(decoded.base.production_date, Some(date(2024, 1, 1)));
        assert_eq!(decoded.base.uuid.as_deref(), Some("886-102-505"));
        assert_eq!(decoded.propagation_delay, Some(12.5));
    }

    #[test]
    fn firefly_v12_uses_v12_offsets() {
        let block = firefly_block(&V12, b"0124001");
        let decoded = FireFlyMetadata::from_bytes(&block).unwrap();

        assert_eq!(decoded.base.eeprom_layout_revision.as_deref(), Some("1.2"));
        assert_eq!(decoded.base.serial_number.as_deref(), Some("0124001"));
        assert_eq!(decoded.base.description.as_deref(), Some("Optically isolated probe"));
        assert_eq!(decoded.base.calibration_due_date, Some(date(2025, 1, 1)));
        assert_eq!(decoded.propagation_delay, Some(12.5));
    }

    #[test]
    fn firefly_unknown_revision_fails() {
        let mut block = firefly_block(&V12, b"0124001");
        put(&mut block, REVISION_OFFSET, b"9.9");
        assert!(matches!(
            FireFlyMetadata::from_bytes(&block),
            Err(MetadataError::UnsupportedRevision(tag)) if tag == "9.9"
        ));
    }

    #[test]
    fn firefly_erased_delay_is_absent() {
        let mut block = firefly_block(&V11, b"1234");
        put(&mut block, V11.fields[11].0, &[0xFF; 4]);
        let decoded = FireFlyMetadata::from_bytes(&block).unwrap();
        assert_eq!(decoded.propagation_delay, None);
        assert_eq!(decoded.base.model.as_deref(), Some("FireFly"));
    }

    #[test]
    fn firefly_serializes_textually() {
        let record = FireFlyMetadata {
            base: sample(),
            propagation_delay: Some(10.0),
        };
        let block = record.to_bytes().unwrap();
        assert_eq!(block.len(), BLOCK_SIZE);

        let text = String::from_utf8_lossy(&block);
        assert!(text.contains("886-102-504\n10.0\n"));
        assert_eq!(record.named_values().len(), 12);
        assert!(record.to_string().contains("propagation_delay: 10.0"));
    }
}
