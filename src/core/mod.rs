// Core modules implementing descriptors, field codecs, schema parsing, and error modeling.
pub mod ccsid;
pub mod descriptor;
pub mod error;
pub mod packed;
pub mod schema;
