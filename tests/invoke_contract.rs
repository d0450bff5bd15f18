//! Purpose: Lock the end-to-end parse -> bind -> call -> assemble contract.
//! Exports: Integration tests only (no runtime exports).
//! Role: Exercise the public `api` surface the way an embedding caller would.
//! Invariants: Scenarios use only `pgmcall::api`; no `core` internals.

use pgmcall::api::{
    CallReply, CallRequest, Error, ErrorKind, HostMessage, LoopbackTransport, ParsedSchema,
    Program, ProgramPath, Transport, invoke,
};
use serde_json::{Value, json};
use std::cell::Cell;
use std::sync::Arc;

const ORDER_SCHEMA: &str = r#"[
    {"name": "id", "size": 5},
    {"amt": {"size": 7, "decimals": 2}}
]"#;

fn orders_path() -> ProgramPath {
    ProgramPath::qualify("*LIBL", "ORD001").expect("path")
}

/// Records whether it was called and answers with a fixed reply.
struct ScriptedTransport {
    reply: CallReply,
    calls: Cell<usize>,
}

impl ScriptedTransport {
    fn new(reply: CallReply) -> Self {
        Self {
            reply,
            calls: Cell::new(0),
        }
    }
}

impl Transport for ScriptedTransport {
    fn call(&self, _request: &CallRequest<'_>) -> Result<CallReply, Error> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.reply.clone())
    }
}

/// Stands in for a host program that uppercases every EBCDIC letter it was sent.
struct UppercasingTransport;

impl Transport for UppercasingTransport {
    fn call(&self, request: &CallRequest<'_>) -> Result<CallReply, Error> {
        let outputs = request
            .slots()
            .iter()
            .map(|slot| {
                let mut bytes = slot.input().map(<[u8]>::to_vec).unwrap_or_default();
                bytes.resize(slot.output_len(), 0x40);
                // EBCDIC lowercase a-i/j-r/s-z sit 0x40 below uppercase.
                for byte in &mut bytes {
                    if matches!(*byte, 0x81..=0x89 | 0x91..=0x99 | 0xA2..=0xA9) {
                        *byte += 0x40;
                    }
                }
                bytes
            })
            .collect();
        Ok(CallReply::Completed(outputs))
    }
}

struct BrokenTransport;

impl Transport for BrokenTransport {
    fn call(&self, _request: &CallRequest<'_>) -> Result<CallReply, Error> {
        Err(Error::new(ErrorKind::Io).with_message("connection reset"))
    }
}

#[test]
fn end_to_end_scale_normalizes_decimal_output() {
    let schema = ParsedSchema::parse(ORDER_SCHEMA).expect("schema");
    let slots = schema.bind(&json!({"id": "A1", "amt": "12.5"})).expect("bind");
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].input().map(<[u8]>::len), Some(5));
    assert_eq!(slots[1].input(), Some(&[0x00, 0x01, 0x25, 0x0F][..]));

    let output = invoke(
        &schema,
        &orders_path(),
        &LoopbackTransport::new(),
        &json!({"id": "A1", "amt": "12.5"}),
    )
    .expect("invoke");
    assert_eq!(output, json!({"id": "A1", "amt": "12.50"}));
}

#[test]
fn output_keys_follow_schema_order_not_input_order() {
    let schema = ParsedSchema::parse(
        r#"[
            {"name": "z", "size": 1},
            {"rec": [{"name": "b", "size": 1}, {"name": "a", "size": 1}]},
            {"name": "m", "size": 1}
        ]"#,
    )
    .expect("schema");
    let input: Value =
        serde_json::from_str(r#"{"m":"3","rec":{"a":"2","b":"1"},"z":"0"}"#).expect("input");
    let output = invoke(&schema, &orders_path(), &LoopbackTransport::new(), &input).expect("invoke");

    let top: Vec<&String> = output.as_object().expect("object").keys().collect();
    assert_eq!(top, ["z", "rec", "m"]);
    let nested: Vec<&String> = output["rec"].as_object().expect("object").keys().collect();
    assert_eq!(nested, ["b", "a"]);
    assert_eq!(
        serde_json::to_string(&output).expect("encode"),
        r#"{"z":"0","rec":{"b":"1","a":"2"},"m":"3"}"#
    );
}

#[test]
fn host_rewritten_buffers_are_decoded() {
    let program = Program::new(
        orders_path(),
        ParsedSchema::parse(r#"[{"name": "name", "size": 10}, {"qty": {"size": 3, "decimals": 0}}]"#)
            .expect("schema"),
    );
    let output = program
        .invoke(&UppercasingTransport, &json!({"name": "smith", "qty": -7}))
        .expect("invoke");
    assert_eq!(output, json!({"name": "SMITH", "qty": "-7"}));
}

#[test]
fn encoding_error_aborts_before_transport() {
    let schema = ParsedSchema::parse(r#"[{"qty": {"size": 3, "decimals": 0}}]"#).expect("schema");
    let transport = ScriptedTransport::new(CallReply::Completed(vec![vec![0x00, 0x0F]]));
    let err = invoke(&schema, &orders_path(), &transport, &json!({"qty": "1234"}))
        .expect_err("overflow");
    assert_eq!(err.kind(), ErrorKind::Encoding);
    assert_eq!(err.field(), Some("qty"));
    assert_eq!(transport.calls.get(), 0);
}

#[test]
fn remote_call_error_returns_no_output() {
    let schema = ParsedSchema::parse(ORDER_SCHEMA).expect("schema");
    let transport = ScriptedTransport::new(CallReply::Failed(vec![
        HostMessage::new("MCH1211", "Attempt made to divide by zero for fixed point operation."),
        HostMessage::new("CPF9999", "Function check. MCH1211 unmonitored by ORD001."),
    ]));
    let result = invoke(&schema, &orders_path(), &transport, &json!({"id": "A1"}));
    let err = result.expect_err("remote failure");
    assert_eq!(err.kind(), ErrorKind::RemoteCall);
    let message = err.message().expect("message");
    assert!(message.starts_with("Program /QSYS.LIB/%LIBL%.LIB/ORD001.PGM did not run: "));
    assert!(message.contains("MCH1211: Attempt made to divide by zero"));
    assert!(message.ends_with("unmonitored by ORD001.\n"));
    assert_eq!(transport.calls.get(), 1);
}

#[test]
fn transport_faults_propagate_unchanged() {
    let schema = ParsedSchema::parse(ORDER_SCHEMA).expect("schema");
    let err = invoke(&schema, &orders_path(), &BrokenTransport, &json!({})).expect_err("fault");
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(err.message(), Some("connection reset"));
}

#[test]
fn mismatched_output_width_is_a_decoding_error() {
    let schema = ParsedSchema::parse(ORDER_SCHEMA).expect("schema");
    let transport = ScriptedTransport::new(CallReply::Completed(vec![
        vec![0x40; 5],
        vec![0x00, 0x0F],
    ]));
    let err = invoke(&schema, &orders_path(), &transport, &json!({})).expect_err("short amt");
    assert_eq!(err.kind(), ErrorKind::Decoding);
    assert_eq!(err.field(), Some("amt"));
    assert!(err.message().expect("message").contains("expected 4 bytes, got 2"));
}

#[test]
fn null_and_absent_inputs_normalize() {
    let schema = ParsedSchema::parse(ORDER_SCHEMA).expect("schema");
    let absent = schema.bind(&json!({})).expect("absent");
    let nulls = schema.bind(&json!({"id": null, "amt": null})).expect("nulls");
    let explicit = schema.bind(&json!({"id": "", "amt": 0})).expect("explicit");
    assert_eq!(absent, nulls);
    assert_eq!(absent, explicit);

    let output = invoke(&schema, &orders_path(), &LoopbackTransport::new(), &json!({})).expect("invoke");
    assert_eq!(output, json!({"id": "", "amt": "0.00"}));
}

#[test]
fn nested_struct_round_trip() {
    let schema = ParsedSchema::parse(
        r#"[
            {"customer": [
                {"name": "name", "size": 15},
                {"addr": [{"name": "city", "size": 20}, {"name": "zip", "size": 5}]},
                {"balance": {"size": 9, "decimals": 2}}
            ]}
        ]"#,
    )
    .expect("schema");
    assert_eq!(schema.byte_width(), 15 + 25 + 5);

    let input = json!({"customer": {
        "name": "Guðrún",
        "addr": {"city": "Akureyri", "zip": "600"},
        "balance": "-1234.5"
    }});
    let output = invoke(&schema, &orders_path(), &LoopbackTransport::new(), &input).expect("invoke");
    assert_eq!(
        output,
        json!({"customer": {
            "name": "Guðrún",
            "addr": {"city": "Akureyri", "zip": "600"},
            "balance": "-1234.50"
        }})
    );
}

#[test]
fn shared_schema_serves_concurrent_calls() {
    let program = Program::new(orders_path(), Arc::new(ParsedSchema::parse(ORDER_SCHEMA).expect("schema")));
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let program = program.clone();
                scope.spawn(move || {
                    let input = json!({"id": format!("T{n}"), "amt": format!("{n}.5")});
                    program.invoke(&LoopbackTransport::new(), &input)
                })
            })
            .collect();
        for (n, handle) in handles.into_iter().enumerate() {
            let output = handle.join().expect("thread").expect("invoke");
            assert_eq!(output, json!({"id": format!("T{n}"), "amt": format!("{n}.50")}));
        }
    });
}
