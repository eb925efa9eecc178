//! Human-readable names for TIFF tags and codes
//!
//! The tables live in `tiff_tags.toml` at the crate root and are embedded
//! into the binary, then parsed once on first use.

use std::collections::HashMap;
use lazy_static::lazy_static;
use crate::tiff::errors::{TiffError, TiffResult};

lazy_static! {
    static ref TAG_DEFINITIONS: TagDefinitions = {
        let content = include_str!("../../tiff_tags.toml");
        TagDefinitions::from_str(content).unwrap_or_else(|e| {
            log::warn!("Failed to parse TIFF tag definitions: {}", e);
            TagDefinitions::default()
        })
    };
}

/// Lookup tables for tag, field type and code names
#[derive(Debug, Default)]
pub struct TagDefinitions {
    // Maps tag IDs to tag names
    pub tag_names: HashMap<u16, String>,
    // Maps field type codes to names
    pub field_type_names: HashMap<u16, String>,
    // Maps compression codes to names
    pub compression_names: HashMap<u16, String>,
    // Maps photometric interpretation codes to names
    pub photometric_names: HashMap<u16, String>,
}

impl TagDefinitions {
    /// Parse definitions from a TOML string
    pub fn from_str(content: &str) -> TiffResult<Self> {
        let toml_value: toml::Value = match content.parse() {
            Ok(value) => value,
            Err(e) => return Err(TiffError::GenericError(format!("Failed to parse TOML: {}", e))),
        };

        let mut defs = TagDefinitions::default();
        Self::parse_code_table(&toml_value, "tag_ids", &mut defs.tag_names);
        Self::parse_code_table(&toml_value, "field_types", &mut defs.field_type_names);
        Self::parse_code_table(&toml_value, "compression_codes", &mut defs.compression_names);
        Self::parse_code_table(&toml_value, "photometric_codes", &mut defs.photometric_names);

        Ok(defs)
    }

    fn parse_code_table(toml_value: &toml::Value, table_name: &str, target: &mut HashMap<u16, String>) {
        if let Some(table) = toml_value.get(table_name).and_then(|v| v.as_table()) {
            for (k, v) in table {
                if let (Ok(id), Some(name)) = (k.parse::<u16>(), v.as_str()) {
                    target.insert(id, name.to_string());
                }
            }
        }
    }
}

fn lookup(table: &'static HashMap<u16, String>, code: u64) -> &'static str {
    u16::try_from(code)
        .ok()
        .and_then(|c| table.get(&c))
        .map(|s| s.as_str())
        .unwrap_or("Unknown")
}

/// Name of a TIFF tag, or "Unknown"
pub fn tag_name(tag: u16) -> &'static str {
    lookup(&TAG_DEFINITIONS.tag_names, tag as u64)
}

/// Name of a field type, or "Unknown"
pub fn field_type_name(field_type: u16) -> &'static str {
    lookup(&TAG_DEFINITIONS.field_type_names, field_type as u64)
}

/// Name of a compression code, or "Unknown"
pub fn compression_name(code: u64) -> &'static str {
    lookup(&TAG_DEFINITIONS.compression_names, code)
}

/// Name of a photometric interpretation code, or "Unknown"
pub fn photometric_name(code: u64) -> &'static str {
    lookup(&TAG_DEFINITIONS.photometric_names, code)
}
