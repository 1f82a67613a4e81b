use chrono::NaiveDate;

use crate::error::{MetadataError, Result};

/// Date format used for every date field in the EEPROM block.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// How the bytes of one field are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 text.
    Text,
    /// `YYYYMMDD` date.
    Date,
    /// 4-byte little-endian IEEE-754 float.
    Float,
}

/// One entry of a record's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    /// Decode the raw bytes of this field.
    ///
    /// Empty text yields `None`. Anything that does not convert to the
    /// declared kind is a [`MetadataError::FieldDecode`].
    pub fn parse(&self, raw: &[u8]) -> Result<Option<Value>> {
        if self.kind == FieldKind::Float {
            let bytes: [u8; 4] = raw
                .try_into()
                .map_err(|_| self.decode_error(format!("expected 4 bytes, found {}", raw.len())))?;
            let value = f32::from_le_bytes(bytes);
            if !value.is_finite() {
                return Err(self.decode_error(format!("non-finite value {value}")));
            }
            return Ok(Some(Value::Float(value)));
        }

        let text = std::str::from_utf8(raw).map_err(|err| self.decode_error(err.to_string()))?;
        if text.is_empty() {
            return Ok(None);
        }
        match self.kind {
            FieldKind::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(|date| Some(Value::Date(date)))
                .map_err(|err| self.decode_error(format!("{text:?}: {err}"))),
            _ => Ok(Some(Value::Text(text.to_string()))),
        }
    }

    fn decode_error(&self, reason: String) -> MetadataError {
        MetadataError::FieldDecode {
            field: self.name,
            reason,
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Date(NaiveDate),
    Float(f32),
}

impl Value {
    /// Textual form written to the EEPROM block.
    pub fn to_field_string(&self) -> String {
        match self {
            Value::Text(text) => text.clone(),
            Value::Date(date) => date.format(DATE_FORMAT).to_string(),
            Value::Float(value) => format!("{value:?}"),
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_date(self) -> Option<NaiveDate> {
        match self {
            Value::Date(date) => Some(date),
            _ => None,
        }
    }

    pub fn into_float(self) -> Option<f32> {
        match self {
            Value::Float(value) => Some(value),
            _ => None,
        }
    }
}
