//! Purpose: Parsed schemas, program paths, and the bind -> call -> assemble pipeline.
//! Exports: `ParsedSchema`, `ProgramPath`, `Program`, `parse_schema`, `invoke`.
//! Role: Public entry points for callers and the CLI.
//! Invariants: A `ParsedSchema` is immutable and `Send + Sync`; share it freely across calls.
//! Invariants: No transport call happens unless every parameter bound successfully.
//! Invariants: A failed call never yields a partial output object.

use super::binding::{self, CallSlot};
use super::transport::{CallReply, CallRequest, HostMessage, Transport};
use crate::config::DEFAULT_LIBRARY;
use crate::core::error::{Error, ErrorKind};
use crate::core::schema::{Parameter, SchemaParser};
use crate::json::parse;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

const MAX_OBJECT_NAME: usize = 10;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedSchema {
    parameters: Vec<Parameter>,
}

impl ParsedSchema {
    pub fn parse(text: &str) -> Result<Self, Error> {
        Self::parse_with(&SchemaParser::default(), text)
    }

    pub fn parse_with(parser: &SchemaParser, text: &str) -> Result<Self, Error> {
        let value: Value = parse::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Schema)
                .with_message("schema is not valid json")
                .with_source(err)
        })?;
        Self::from_value(parser, &value)
    }

    pub fn from_value(parser: &SchemaParser, schema: &Value) -> Result<Self, Error> {
        let parameters = parser.parse_parameters(schema)?;
        let schema = Self { parameters };
        debug!(
            parameters = schema.parameters.len(),
            bytes = schema.byte_width(),
            "parsed parameter schema"
        );
        Ok(schema)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Total declared width of all parameters.
    pub fn byte_width(&self) -> usize {
        self.parameters
            .iter()
            .map(|parameter| parameter.descriptor().byte_width())
            .sum()
    }

    pub fn bind(&self, input: &Value) -> Result<Vec<CallSlot>, Error> {
        binding::bind(&self.parameters, input)
    }

    pub fn assemble(&self, outputs: &[Vec<u8>]) -> Result<Value, Error> {
        binding::assemble(&self.parameters, outputs).map(Value::Object)
    }
}

pub fn parse_schema(text: &str) -> Result<ParsedSchema, Error> {
    ParsedSchema::parse(text)
}

/// Decode program input text; numbers keep their literal digits.
pub fn parse_input(text: &str) -> Result<Value, Error> {
    parse::from_str(text).map_err(|err| {
        Error::new(ErrorKind::Encoding)
            .with_message("program input is not valid json")
            .with_source(err)
    })
}

/// Integrated file system path of a `*PGM` object, e.g. `/QSYS.LIB/%LIBL%.LIB/ORDERS.PGM`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ProgramPath {
    path: String,
}

impl ProgramPath {
    /// Qualify `name` with `library`; a `LIB/NAME` name carries its own library.
    pub fn qualify(library: &str, name: &str) -> Result<Self, Error> {
        let (library, name) = match name.trim().split_once('/') {
            Some((library, name)) => (library, name),
            None => (library, name.trim()),
        };
        let library = library_segment(library)?;
        let name = object_name(name, "program")?;
        let path = if library == "QSYS" {
            format!("/QSYS.LIB/{name}.PGM")
        } else {
            format!("/QSYS.LIB/{library}.LIB/{name}.PGM")
        };
        Ok(Self { path })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for ProgramPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

fn library_segment(library: &str) -> Result<String, Error> {
    let library = library.trim().to_ascii_uppercase();
    match library.as_str() {
        "" | "*LIBL" => Ok("%LIBL%".to_string()),
        "*CURLIB" => Ok("%CURLIB%".to_string()),
        special if special.starts_with('*') => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("unsupported special library {special}"))
            .with_hint("Use *LIBL, *CURLIB, or a library name.")),
        _ => object_name(&library, "library"),
    }
}

fn object_name(name: &str, what: &str) -> Result<String, Error> {
    let name = name.trim();
    let valid_char = |ch: char| ch.is_ascii_alphanumeric() || matches!(ch, '$' | '#' | '@' | '_');
    if name.is_empty() || name.len() > MAX_OBJECT_NAME || !name.chars().all(valid_char) {
        return Err(Error::new(ErrorKind::Usage).with_message(format!(
            "invalid {what} name {name:?} (1-{MAX_OBJECT_NAME} characters: A-Z 0-9 $ # @ _)"
        )));
    }
    Ok(name.to_ascii_uppercase())
}

/// A program bound to its parameter schema; cheap to clone, schema is shared.
#[derive(Clone, Debug)]
pub struct Program {
    path: ProgramPath,
    schema: Arc<ParsedSchema>,
}

impl Program {
    pub fn new(path: ProgramPath, schema: impl Into<Arc<ParsedSchema>>) -> Self {
        Self {
            path,
            schema: schema.into(),
        }
    }

    /// Parse `schema_text` and qualify `name` with the default library.
    pub fn from_schema_text(name: &str, schema_text: &str) -> Result<Self, Error> {
        let path = ProgramPath::qualify(DEFAULT_LIBRARY, name)?;
        let schema = ParsedSchema::parse(schema_text)?;
        Ok(Self::new(path, schema))
    }

    pub fn path(&self) -> &ProgramPath {
        &self.path
    }

    pub fn schema(&self) -> &ParsedSchema {
        &self.schema
    }

    pub fn invoke<T: Transport + ?Sized>(&self, transport: &T, input: &Value) -> Result<Value, Error> {
        invoke(&self.schema, &self.path, transport, input)
    }

    /// JSON text in, JSON text out.
    pub fn run<T: Transport + ?Sized>(&self, transport: &T, input_json: &str) -> Result<String, Error> {
        let input = parse_input(input_json)?;
        let output = self.invoke(transport, &input)?;
        serde_json::to_string(&output).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode program output")
                .with_source(err)
        })
    }
}

pub fn invoke<T: Transport + ?Sized>(
    schema: &ParsedSchema,
    program: &ProgramPath,
    transport: &T,
    input: &Value,
) -> Result<Value, Error> {
    let slots = schema.bind(input)?;
    debug!(program = %program, slots = slots.len(), "calling program");
    match transport.call(&CallRequest::new(program, &slots))? {
        CallReply::Completed(outputs) => schema.assemble(&outputs),
        CallReply::Failed(messages) => {
            warn!(program = %program, messages = messages.len(), "program did not run");
            Err(remote_call_error(program, &messages))
        }
    }
}

fn remote_call_error(program: &ProgramPath, messages: &[HostMessage]) -> Error {
    let mut text = format!("Program {program} did not run: ");
    for message in messages {
        text.push_str(&message.to_string());
        text.push('\n');
    }
    Error::new(ErrorKind::RemoteCall).with_message(text)
}
