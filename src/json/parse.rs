//! Purpose: Provide the internal JSON decode entrypoints.
//! Exports: `from_str`.
//! Role: Parser boundary shared by schema, input, and config loading.
//! Invariants: Object key order from the source text is preserved (`preserve_order`).
//! Notes: Error mapping is done by callsites so the error kind stays explicit.

use serde::de::DeserializeOwned;

pub(crate) fn from_str<T: DeserializeOwned>(input: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(input)
}
