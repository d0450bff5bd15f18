//! Purpose: Turn declarative JSON field definitions into descriptor trees.
//! Exports: `SchemaParser`, `Parameter`, `Usage`.
//! Role: Only producer of `Descriptor` values from untrusted schema input.
//! Invariants: Shape checks run in a fixed priority order (name-as-key, then explicit `name`).
//! Invariants: Sibling names are unique; structs have at least one field.
//! Invariants: `decimals` present selects a packed decimal regardless of `type`.

use crate::core::ccsid::Ccsid;
use crate::core::descriptor::{Descriptor, TextField, json_type_name};
use crate::core::error::{Error, ErrorKind};
use crate::core::packed::{MAX_DIGITS, PackedFormat};
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const MAX_TEXT_WIDTH: u64 = 65535;

/// Direction of a top-level parameter.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Usage {
    Input,
    Output,
    #[default]
    InOut,
}

impl Usage {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "input" | "in" => Some(Usage::Input),
            "output" | "out" => Some(Usage::Output),
            "inout" | "both" => Some(Usage::InOut),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Usage::Input => "input",
            Usage::Output => "output",
            Usage::InOut => "inout",
        }
    }

    pub fn sends_input(self) -> bool {
        self != Usage::Output
    }

    pub fn returns_output(self) -> bool {
        self != Usage::Input
    }
}

/// A top-level descriptor plus how it is passed to the program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameter {
    descriptor: Descriptor,
    usage: Usage,
}

impl Parameter {
    pub fn new(descriptor: Descriptor, usage: Usage) -> Self {
        Self { descriptor, usage }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }
}

enum Shape<'a> {
    Struct(&'a [Value]),
    Scalar(&'a Map<String, Value>),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SchemaParser {
    default_ccsid: Ccsid,
}

impl SchemaParser {
    pub fn new(default_ccsid: Ccsid) -> Self {
        Self { default_ccsid }
    }

    /// Parse a whole parameter list (a JSON array of field definitions).
    pub fn parse_parameters(&self, schema: &Value) -> Result<Vec<Parameter>, Error> {
        let definitions = match schema {
            Value::Array(definitions) => definitions,
            other => {
                return Err(Error::new(ErrorKind::Schema).with_message(format!(
                    "schema must be an array of field definitions, got {}",
                    json_type_name(other)
                )));
            }
        };
        let mut names = HashSet::new();
        let mut parameters = Vec::with_capacity(definitions.len());
        for (index, definition) in definitions.iter().enumerate() {
            let parameter = self
                .parse_parameter(definition)
                .map_err(|err| locate(err, index))?;
            ensure_unique(&mut names, parameter.name())?;
            parameters.push(parameter);
        }
        Ok(parameters)
    }

    pub fn parse_parameter(&self, definition: &Value) -> Result<Parameter, Error> {
        let (name, shape) = resolve(definition)?;
        match shape {
            Shape::Struct(children) => {
                let descriptor = self.parse_struct(name, children)?;
                Ok(Parameter::new(descriptor, Usage::InOut))
            }
            Shape::Scalar(attrs) => {
                let usage = match attrs.get("usage") {
                    None | Some(Value::Null) => Usage::default(),
                    Some(Value::String(text)) => Usage::parse(text).ok_or_else(|| {
                        Error::new(ErrorKind::Schema)
                            .with_message(format!("unknown usage {text:?}"))
                            .with_hint("Use \"input\", \"output\" or \"inout\".")
                            .with_field(name)
                    })?,
                    Some(other) => {
                        return Err(Error::new(ErrorKind::Schema)
                            .with_message(format!(
                                "usage must be a string, got {}",
                                json_type_name(other)
                            ))
                            .with_field(name));
                    }
                };
                let descriptor = self.parse_scalar(name, attrs)?;
                Ok(Parameter::new(descriptor, usage))
            }
        }
    }

    /// Parse one field definition at any nesting level.
    pub fn parse(&self, definition: &Value) -> Result<Descriptor, Error> {
        let (name, shape) = resolve(definition)?;
        match shape {
            Shape::Struct(children) => self.parse_struct(name, children),
            Shape::Scalar(attrs) => {
                if attrs.contains_key("usage") {
                    return Err(Error::new(ErrorKind::Schema)
                        .with_message("usage only applies to top-level parameters")
                        .with_field(name));
                }
                self.parse_scalar(name, attrs)
            }
        }
    }

    pub fn parse_list(&self, definitions: &[Value]) -> Result<Vec<Descriptor>, Error> {
        let mut names = HashSet::new();
        let mut fields = Vec::with_capacity(definitions.len());
        for (index, definition) in definitions.iter().enumerate() {
            let field = self.parse(definition).map_err(|err| locate(err, index))?;
            ensure_unique(&mut names, field.name())?;
            fields.push(field);
        }
        Ok(fields)
    }

    fn parse_struct(&self, name: &str, children: &[Value]) -> Result<Descriptor, Error> {
        if children.is_empty() {
            return Err(Error::new(ErrorKind::Schema)
                .with_message("struct has no fields")
                .with_field(name));
        }
        let fields = self.parse_list(children).map_err(|err| err.within(name))?;
        Ok(Descriptor::structure(name, fields))
    }

    fn parse_scalar(&self, name: &str, attrs: &Map<String, Value>) -> Result<Descriptor, Error> {
        let size = required_size(attrs).map_err(|err| err.with_field(name))?;
        let is_decimal = attrs.get("type").and_then(Value::as_str) == Some("decimal")
            || attrs.get("decimals").is_some_and(|value| !value.is_null());

        if is_decimal {
            let scale = match attrs.get("decimals") {
                None | Some(Value::Null) => 0,
                Some(value) => value
                    .as_u64()
                    .ok_or_else(|| attribute_error("decimals", "a non-negative integer"))
                    .map_err(|err| err.with_field(name))?,
            };
            if size > u64::from(MAX_DIGITS) {
                return Err(Error::new(ErrorKind::Schema)
                    .with_message(format!(
                        "packed decimal size must be between 1 and {MAX_DIGITS}, got {size}"
                    ))
                    .with_field(name));
            }
            if scale > size {
                return Err(Error::new(ErrorKind::Schema)
                    .with_message(format!("decimals ({scale}) cannot exceed size ({size})"))
                    .with_field(name));
            }
            let format =
                PackedFormat::new(size as u8, scale as u8).map_err(|err| err.with_field(name))?;
            return Ok(Descriptor::decimal(name, format));
        }

        if size > MAX_TEXT_WIDTH {
            return Err(Error::new(ErrorKind::Schema)
                .with_message(format!("text size {size} exceeds {MAX_TEXT_WIDTH}"))
                .with_field(name));
        }
        let ccsid = match attrs.get("ccsid") {
            None | Some(Value::Null) => self.default_ccsid,
            Some(value) => value
                .as_u64()
                .and_then(|number| u16::try_from(number).ok())
                .and_then(Ccsid::from_number)
                .ok_or_else(|| {
                    Error::new(ErrorKind::Schema)
                        .with_message(format!("unsupported ccsid {value}"))
                        .with_hint("Supported code pages: 37, 500, 871.")
                        .with_field(name)
                })?,
        };
        Ok(Descriptor::text(name, TextField::new(size as usize, ccsid)))
    }
}

/// Decide the field name and shape of one definition.
fn resolve(definition: &Value) -> Result<(&str, Shape<'_>), Error> {
    let object = match definition {
        Value::Object(object) => object,
        other => {
            return Err(Error::new(ErrorKind::Schema).with_message(format!(
                "field definition must be an object, got {}",
                json_type_name(other)
            )));
        }
    };

    if object.len() == 1 {
        if let Some((key, value)) = object.iter().next() {
            match value {
                Value::Array(children) => return Ok((checked_name(key)?, Shape::Struct(children))),
                Value::Object(attrs) => return Ok((checked_name(key)?, Shape::Scalar(attrs))),
                _ => {}
            }
        }
    }

    match object.get("name") {
        Some(Value::String(name)) => Ok((checked_name(name)?, Shape::Scalar(object))),
        Some(other) => Err(Error::new(ErrorKind::Schema).with_message(format!(
            "field name must be a string, got {}",
            json_type_name(other)
        ))),
        None => Err(Error::new(ErrorKind::Schema)
            .with_message("field definition has no name")
            .with_hint("Use {\"name\": \"x\", \"size\": 10} or {\"x\": {\"size\": 10}}.")),
    }
}

fn checked_name(name: &str) -> Result<&str, Error> {
    if name.trim().is_empty() {
        return Err(Error::new(ErrorKind::Schema).with_message("field name is empty"));
    }
    Ok(name)
}

fn required_size(attrs: &Map<String, Value>) -> Result<u64, Error> {
    match attrs.get("size") {
        None | Some(Value::Null) => Err(Error::new(ErrorKind::Schema)
            .with_message("missing required attribute `size`")),
        Some(value) => match value.as_u64() {
            Some(size) if size > 0 => Ok(size),
            _ => Err(attribute_error("size", "a positive integer")),
        },
    }
}

fn attribute_error(attribute: &str, expected: &str) -> Error {
    Error::new(ErrorKind::Schema).with_message(format!("`{attribute}` must be {expected}"))
}

fn ensure_unique(names: &mut HashSet<String>, name: &str) -> Result<(), Error> {
    if !names.insert(name.to_string()) {
        return Err(Error::new(ErrorKind::Schema)
            .with_message("duplicate field name")
            .with_field(name));
    }
    Ok(())
}

// Unnamed failures get a positional marker so the definition can be found.
fn locate(err: Error, index: usize) -> Error {
    if err.field().is_some() {
        return err;
    }
    let message = err.message().unwrap_or("invalid field definition").to_string();
    err.with_message(format!("{message} (definition #{index})"))
}
