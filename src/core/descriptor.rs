//! Purpose: Typed parameter descriptors and their fixed-width codecs.
//! Exports: `Descriptor`, `DescriptorKind`, `TextField`, `StructField`.
//! Role: Unit of the parsed schema tree; encodes JSON values to host bytes and back.
//! Invariants: `encode` output is always exactly `byte_width()` bytes.
//! Invariants: A struct's width is the sum of its children's widths, fixed at construction.
//! Invariants: Decoded structs list keys in declared field order.

use crate::core::ccsid::Ccsid;
use crate::core::error::{Error, ErrorKind};
use crate::core::packed::{Decimal, PackedFormat};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Descriptor {
    name: String,
    kind: DescriptorKind,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DescriptorKind {
    Text(TextField),
    Decimal(PackedFormat),
    Struct(StructField),
}

/// Fixed-width character field in a single-byte code page.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TextField {
    width: usize,
    ccsid: Ccsid,
}

impl TextField {
    pub fn new(width: usize, ccsid: Ccsid) -> Self {
        Self { width, ccsid }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn ccsid(&self) -> Ccsid {
        self.ccsid
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StructField {
    fields: Vec<Descriptor>,
    width: usize,
}

impl StructField {
    pub fn fields(&self) -> &[Descriptor] {
        &self.fields
    }
}

impl Descriptor {
    pub fn text(name: impl Into<String>, field: TextField) -> Self {
        Self {
            name: name.into(),
            kind: DescriptorKind::Text(field),
        }
    }

    pub fn decimal(name: impl Into<String>, format: PackedFormat) -> Self {
        Self {
            name: name.into(),
            kind: DescriptorKind::Decimal(format),
        }
    }

    pub fn structure(name: impl Into<String>, fields: Vec<Descriptor>) -> Self {
        let width = fields.iter().map(Descriptor::byte_width).sum();
        Self {
            name: name.into(),
            kind: DescriptorKind::Struct(StructField { fields, width }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &DescriptorKind {
        &self.kind
    }

    pub fn byte_width(&self) -> usize {
        match &self.kind {
            DescriptorKind::Text(field) => field.width,
            DescriptorKind::Decimal(format) => format.width(),
            DescriptorKind::Struct(field) => field.width,
        }
    }

    /// Encode one logical value; `None` and JSON null take the field's null default.
    pub fn encode(&self, value: Option<&Value>) -> Result<Vec<u8>, Error> {
        let mut out = Vec::with_capacity(self.byte_width());
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    pub fn encode_into(&self, value: Option<&Value>, out: &mut Vec<u8>) -> Result<(), Error> {
        let value = value.filter(|value| !value.is_null());
        let result = match &self.kind {
            DescriptorKind::Text(field) => encode_text(field, value, out),
            DescriptorKind::Decimal(format) => encode_decimal(format, value, out),
            DescriptorKind::Struct(field) => encode_struct(field, value, out),
        };
        result.map_err(|err| err.within(&self.name))
    }

    /// Decode exactly `byte_width()` bytes into a logical value.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value, Error> {
        if bytes.len() != self.byte_width() {
            return Err(Error::new(ErrorKind::Decoding)
                .with_message(format!(
                    "expected {} bytes, got {}",
                    self.byte_width(),
                    bytes.len()
                ))
                .with_field(self.name.as_str()));
        }
        let result = match &self.kind {
            DescriptorKind::Text(field) => Ok(decode_text(field, bytes)),
            DescriptorKind::Decimal(format) => format
                .unpack(bytes)
                .map(|decimal| Value::String(decimal.to_string())),
            DescriptorKind::Struct(field) => decode_struct(field, bytes),
        };
        result.map_err(|err| {
            if err.field().is_some() {
                err.within(&self.name)
            } else {
                err.with_field(self.name.as_str())
            }
        })
    }
}

fn scalar_text(value: Option<&Value>, expected: &str) -> Result<String, Error> {
    match value {
        None => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(Value::Bool(flag)) => Ok(flag.to_string()),
        Some(other) => Err(Error::new(ErrorKind::Encoding).with_message(format!(
            "expected {expected}, got {}",
            json_type_name(other)
        ))),
    }
}

fn encode_text(field: &TextField, value: Option<&Value>, out: &mut Vec<u8>) -> Result<(), Error> {
    let text = scalar_text(value, "a text value")?;
    let start = out.len();
    field.ccsid.encode_into(&text, out)?;
    let used = out.len() - start;
    if used > field.width {
        out.truncate(start);
        return Err(Error::new(ErrorKind::Encoding).with_message(format!(
            "text is {used} bytes, field holds {}",
            field.width
        )));
    }
    out.resize(start + field.width, field.ccsid.blank());
    Ok(())
}

fn decode_text(field: &TextField, bytes: &[u8]) -> Value {
    let text = field.ccsid.decode(bytes);
    let trimmed = text.trim_end_matches(|ch: char| ch.is_ascii_whitespace() || ch == '\0');
    Value::String(trimmed.to_string())
}

fn encode_decimal(
    format: &PackedFormat,
    value: Option<&Value>,
    out: &mut Vec<u8>,
) -> Result<(), Error> {
    let decimal = match value {
        None => Decimal::zero(),
        Some(_) => scalar_text(value, "a decimal number")?.parse::<Decimal>()?,
    };
    format.pack_into(&decimal, out)
}

fn encode_struct(field: &StructField, value: Option<&Value>, out: &mut Vec<u8>) -> Result<(), Error> {
    let members = match value {
        Some(Value::Object(members)) => members,
        Some(other) => {
            return Err(Error::new(ErrorKind::Encoding).with_message(format!(
                "expected an object, got {}",
                json_type_name(other)
            )));
        }
        None => {
            return Err(Error::new(ErrorKind::Encoding)
                .with_message("expected an object, got nothing"));
        }
    };
    for child in &field.fields {
        child.encode_into(members.get(child.name()), out)?;
    }
    Ok(())
}

fn decode_struct(field: &StructField, bytes: &[u8]) -> Result<Value, Error> {
    let mut members = Map::new();
    let mut offset = 0;
    for child in &field.fields {
        let end = offset + child.byte_width();
        members.insert(child.name.clone(), child.decode(&bytes[offset..end])?);
        offset = end;
    }
    Ok(Value::Object(members))
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
