//! Purpose: Bind input JSON to per-parameter call slots and assemble decoded outputs.
//! Exports: `CallSlot`, `bind`, `assemble`.
//! Role: Orchestration between parsed parameters and the transport boundary.
//! Invariants: Slots and outputs follow declared parameter order.
//! Invariants: Binding fails as a whole; no partial slot list is ever returned.
//! Invariants: Output-only slots carry no input bytes; input-only slots expect no output.

use crate::core::descriptor::json_type_name;
use crate::core::error::{Error, ErrorKind};
use crate::core::schema::{Parameter, Usage};
use serde_json::{Map, Value};

/// One encoded parameter as handed to a `Transport`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallSlot {
    name: String,
    usage: Usage,
    width: usize,
    input: Option<Vec<u8>>,
    output_len: usize,
}

impl CallSlot {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Declared width of the parameter.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Encoded input bytes; `None` for output-only parameters.
    pub fn input(&self) -> Option<&[u8]> {
        self.input.as_deref()
    }

    /// Bytes the program is expected to hand back; zero for input-only parameters.
    pub fn output_len(&self) -> usize {
        self.output_len
    }
}

pub fn bind(parameters: &[Parameter], input: &Value) -> Result<Vec<CallSlot>, Error> {
    let empty = Map::new();
    let values = match input {
        Value::Object(values) => values,
        Value::Null => &empty,
        other => {
            return Err(Error::new(ErrorKind::Encoding).with_message(format!(
                "program input must be an object, got {}",
                json_type_name(other)
            )));
        }
    };

    let mut slots = Vec::with_capacity(parameters.len());
    for parameter in parameters {
        let descriptor = parameter.descriptor();
        let usage = parameter.usage();
        let width = descriptor.byte_width();
        let input = if usage.sends_input() {
            Some(descriptor.encode(values.get(parameter.name()))?)
        } else {
            None
        };
        let output_len = if usage.returns_output() { width } else { 0 };
        slots.push(CallSlot {
            name: parameter.name().to_string(),
            usage,
            width,
            input,
            output_len,
        });
    }
    Ok(slots)
}

pub fn assemble(parameters: &[Parameter], outputs: &[Vec<u8>]) -> Result<Map<String, Value>, Error> {
    if outputs.len() != parameters.len() {
        return Err(Error::new(ErrorKind::Decoding).with_message(format!(
            "transport returned {} buffers for {} parameters",
            outputs.len(),
            parameters.len()
        )));
    }
    let mut result = Map::new();
    for (parameter, output) in parameters.iter().zip(outputs) {
        if !parameter.usage().returns_output() {
            continue;
        }
        let value = parameter.descriptor().decode(output)?;
        result.insert(parameter.name().to_string(), value);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::{assemble, bind};
    use crate::core::error::ErrorKind;
    use crate::core::schema::{SchemaParser, Usage};
    use serde_json::{Value, json};

    fn parameters(schema: Value) -> Vec<crate::core::schema::Parameter> {
        SchemaParser::default().parse_parameters(&schema).expect("schema")
    }

    #[test]
    fn bind_encodes_each_parameter_in_order() {
        let params = parameters(json!([
            {"name": "id", "size": 5},
            {"amt": {"size": 7, "decimals": 2}}
        ]));
        let slots = bind(&params, &json!({"amt": "12.5", "id": "A1"})).expect("bind");
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].name(), "id");
        assert_eq!(slots[0].input(), Some(&[0xC1, 0xF1, 0x40, 0x40, 0x40][..]));
        assert_eq!(slots[0].output_len(), 5);
        assert_eq!(slots[1].name(), "amt");
        assert_eq!(slots[1].input(), Some(&[0x00, 0x01, 0x25, 0x0F][..]));
        assert_eq!(slots[1].width(), 4);
    }

    #[test]
    fn absent_parameters_take_null_defaults() {
        let params = parameters(json!([
            {"name": "id", "size": 2},
            {"n": {"size": 1, "decimals": 0}}
        ]));
        let slots = bind(&params, &json!({})).expect("bind");
        assert_eq!(slots[0].input(), Some(&[0x40, 0x40][..]));
        assert_eq!(slots[1].input(), Some(&[0x0F][..]));

        let from_null = bind(&params, &Value::Null).expect("bind null");
        assert_eq!(from_null, slots);
    }

    #[test]
    fn usage_shapes_slots() {
        let params = parameters(json!([
            {"name": "key", "size": 3, "usage": "input"},
            {"name": "msg", "size": 10, "usage": "output"}
        ]));
        let slots = bind(&params, &json!({"key": "K", "msg": "ignored"})).expect("bind");
        assert_eq!(slots[0].usage(), Usage::Input);
        assert_eq!(slots[0].output_len(), 0);
        assert!(slots[0].input().is_some());
        assert_eq!(slots[1].usage(), Usage::Output);
        assert_eq!(slots[1].input(), None);
        assert_eq!(slots[1].output_len(), 10);

        let outputs = vec![Vec::new(), vec![0xC8, 0xC9, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40]];
        let result = assemble(&params, &outputs).expect("assemble");
        assert_eq!(Value::Object(result), json!({"msg": "HI"}));
    }

    #[test]
    fn bind_fails_whole_call_on_first_bad_value() {
        let params = parameters(json!([
            {"name": "id", "size": 5},
            {"qty": {"size": 3, "decimals": 0}}
        ]));
        let err = bind(&params, &json!({"id": "ok", "qty": "1234"})).expect_err("overflow");
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert_eq!(err.field(), Some("qty"));
    }

    #[test]
    fn bind_rejects_non_object_input() {
        let params = parameters(json!([{"name": "id", "size": 5}]));
        let err = bind(&params, &json!(["A1"])).expect_err("array input");
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn assemble_checks_buffer_count_and_width() {
        let params = parameters(json!([{"name": "id", "size": 5}]));
        let err = assemble(&params, &[]).expect_err("missing buffer");
        assert_eq!(err.kind(), ErrorKind::Decoding);

        let err = assemble(&params, &[vec![0x40; 4]]).expect_err("short buffer");
        assert_eq!(err.kind(), ErrorKind::Decoding);
        assert_eq!(err.field(), Some("id"));
    }
}
