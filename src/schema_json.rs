//! Purpose: JSON views of parsed schemas and call slots for CLI output.
//! Exports: `schema_json`, `slots_json`.
//! Role: Keep the describe/bind output envelopes consistent in one place.
//! Invariants: Stable key names; parameters and fields listed in declared order.
//! Invariants: Slot bytes are rendered as lowercase hex; output-only slots have no `input`.

use pgmcall::api::{CallSlot, Descriptor, DescriptorKind, ParsedSchema};
use serde_json::{Map, Value, json};

pub(crate) fn schema_json(schema: &ParsedSchema) -> Value {
    let parameters = schema
        .parameters()
        .iter()
        .map(|parameter| {
            let mut value = descriptor_json(parameter.descriptor());
            if let Value::Object(map) = &mut value {
                map.insert("usage".to_string(), json!(parameter.usage().as_str()));
            }
            value
        })
        .collect::<Vec<_>>();
    json!({
        "parameters": parameters,
        "bytes": schema.byte_width(),
    })
}

fn descriptor_json(descriptor: &Descriptor) -> Value {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(descriptor.name()));
    match descriptor.kind() {
        DescriptorKind::Text(field) => {
            map.insert("type".to_string(), json!("text"));
            map.insert("ccsid".to_string(), json!(field.ccsid().number()));
        }
        DescriptorKind::Decimal(format) => {
            map.insert("type".to_string(), json!("decimal"));
            map.insert("digits".to_string(), json!(format.digits()));
            map.insert("decimals".to_string(), json!(format.scale()));
        }
        DescriptorKind::Struct(record) => {
            map.insert("type".to_string(), json!("struct"));
            let fields = record.fields().iter().map(descriptor_json).collect::<Vec<_>>();
            map.insert("fields".to_string(), Value::Array(fields));
        }
    }
    map.insert("bytes".to_string(), json!(descriptor.byte_width()));
    Value::Object(map)
}

pub(crate) fn slots_json(slots: &[CallSlot]) -> Value {
    let values = slots
        .iter()
        .map(|slot| {
            let mut map = Map::new();
            map.insert("name".to_string(), json!(slot.name()));
            map.insert("usage".to_string(), json!(slot.usage().as_str()));
            map.insert("bytes".to_string(), json!(slot.width()));
            map.insert("output_len".to_string(), json!(slot.output_len()));
            if let Some(input) = slot.input() {
                map.insert("input".to_string(), json!(hex(input)));
            }
            Value::Object(map)
        })
        .collect();
    Value::Array(values)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
