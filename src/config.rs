//! Purpose: Engine configuration (default text code page, default program library).
//! Exports: `EngineConfig`.
//! Role: Shared settings for the CLI and library callers; loaded from JSON.
//! Invariants: Every field has a default, so `{}` is a valid config.
//! Invariants: Unknown keys are ignored so connection settings can live in the same file.

use crate::core::ccsid::{Ccsid, DEFAULT_CCSID};
use crate::core::error::{Error, ErrorKind};
use crate::core::schema::SchemaParser;
use crate::json::parse;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_LIBRARY: &str = "*LIBL";

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// CCSID for text fields that do not declare their own.
    pub ccsid: u16,
    /// Library used to qualify program names given without one.
    pub library: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ccsid: DEFAULT_CCSID,
            library: DEFAULT_LIBRARY.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let config: EngineConfig = parse::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid config json")
                .with_source(err)
        })?;
        config.text_ccsid()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read config {}", path.display()))
                .with_source(err)
        })?;
        Self::from_json(&text)
    }

    pub fn text_ccsid(&self) -> Result<Ccsid, Error> {
        Ccsid::from_number(self.ccsid).ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("unsupported ccsid {}", self.ccsid))
                .with_hint("Supported code pages: 37, 500, 871.")
        })
    }

    pub fn parser(&self) -> Result<SchemaParser, Error> {
        Ok(SchemaParser::new(self.text_ccsid()?))
    }
}
