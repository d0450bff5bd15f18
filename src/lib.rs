//! Purpose: Library crate behind the `pgmcall` CLI: schema-driven program parameter marshaling.
//! Exports: `api` (stable surface), `core` (descriptors, codecs, errors), `config`.
//! Role: Turns JSON parameter schemas into host byte buffers and back.
//! Invariants: The engine holds no global state; parsed schemas are immutable.
//! Invariants: Remote execution is delegated to a caller-supplied `api::Transport`.
pub mod api;
pub mod config;
pub mod core;
pub(crate) mod json;
