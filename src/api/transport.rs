//! Purpose: Boundary between the marshaling engine and whatever executes the program.
//! Exports: `Transport`, `CallRequest`, `CallReply`, `HostMessage`, `LoopbackTransport`.
//! Role: Connection handling and wire protocol live behind this trait, outside the crate.
//! Invariants: A `Completed` reply holds one buffer per slot, in slot order.
//! Invariants: `Failed` means the program did not run; the engine never retries.

use super::binding::CallSlot;
use super::program::ProgramPath;
use crate::core::error::Error;
use std::fmt;

#[derive(Clone, Copy, Debug)]
pub struct CallRequest<'a> {
    program: &'a ProgramPath,
    slots: &'a [CallSlot],
}

impl<'a> CallRequest<'a> {
    pub fn new(program: &'a ProgramPath, slots: &'a [CallSlot]) -> Self {
        Self { program, slots }
    }

    pub fn program(&self) -> &'a ProgramPath {
        self.program
    }

    pub fn slots(&self) -> &'a [CallSlot] {
        self.slots
    }
}

/// Diagnostic returned by the host when a call does not complete.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HostMessage {
    pub id: String,
    pub text: String,
}

impl HostMessage {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for HostMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id.is_empty() {
            f.write_str(&self.text)
        } else {
            write!(f, "{}: {}", self.id, self.text)
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CallReply {
    Completed(Vec<Vec<u8>>),
    Failed(Vec<HostMessage>),
}

pub trait Transport {
    /// Run the program once. `Err` is for transport faults (connection, protocol);
    /// a program that ran but failed is reported as `CallReply::Failed`.
    fn call(&self, request: &CallRequest<'_>) -> Result<CallReply, Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn call(&self, request: &CallRequest<'_>) -> Result<CallReply, Error> {
        (**self).call(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn call(&self, request: &CallRequest<'_>) -> Result<CallReply, Error> {
        (**self).call(request)
    }
}

/// Echoes every slot's input back as its output, or fails with fixed host messages.
#[derive(Clone, Debug, Default)]
pub struct LoopbackTransport {
    failure: Option<Vec<HostMessage>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(messages: Vec<HostMessage>) -> Self {
        Self {
            failure: Some(messages),
        }
    }
}

impl Transport for LoopbackTransport {
    fn call(&self, request: &CallRequest<'_>) -> Result<CallReply, Error> {
        if let Some(messages) = &self.failure {
            return Ok(CallReply::Failed(messages.clone()));
        }
        let outputs = request
            .slots()
            .iter()
            .map(|slot| {
                let mut output = slot.input().map(<[u8]>::to_vec).unwrap_or_default();
                output.resize(slot.output_len(), 0);
                output
            })
            .collect();
        Ok(CallReply::Completed(outputs))
    }
}
