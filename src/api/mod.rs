//! Purpose: Define the stable public Rust API boundary for pgmcall.
//! Exports: Schema parsing, binding, transport contract, and error types.
//! Role: Public, additive-only surface used by the CLI and embedding callers.
//! Invariants: Callers never need `core` internals to run a program call.
//! Invariants: Transports are supplied by the caller; none ship besides the loopback.

mod binding;
mod program;
mod transport;

pub use crate::core::ccsid::Ccsid;
pub use crate::core::descriptor::{Descriptor, DescriptorKind, StructField, TextField};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::packed::{Decimal, PackedFormat};
pub use crate::core::schema::{Parameter, SchemaParser, Usage};
pub use binding::{CallSlot, assemble, bind};
pub use program::{ParsedSchema, Program, ProgramPath, invoke, parse_input, parse_schema};
pub use transport::{CallReply, CallRequest, HostMessage, LoopbackTransport, Transport};
