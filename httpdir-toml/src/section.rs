//! Raw sections and their introspection
//!
//! A fragment file decodes into a table of named sections. Before any typed
//! decoding happens each section is classified by its declared name, type
//! and category. Classification reads the section only and never fails.

use toml::{Table, Value};

use crate::error::Result;

/// Type-tag suffixes and the category they put a section in
const CATEGORIES: &[&str] = &["Input", "Decoder", "Splitter", "Filter", "Encoder", "Output"];

/// Identifiers of one raw section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionInfo {
    pub name: String,
    pub type_name: String,
    pub category: String,
}

impl SectionInfo {
    /// Classifies a raw section
    ///
    /// The type tag comes from the section's `type` key and falls back to
    /// the section name. Values that are not tables yield an empty
    /// classification.
    pub fn classify(name: &str, section: &Value) -> Self {
        let Some(table) = section.as_table() else {
            return Self::default();
        };

        let type_name = match table.get("type") {
            Some(Value::String(type_name)) => type_name.clone(),
            Some(_) => return Self::default(),
            None => name.to_string(),
        };

        let category = CATEGORIES
            .iter()
            .find(|suffix| type_name.ends_with(*suffix))
            .map(|suffix| suffix.to_string())
            .unwrap_or_default();

        Self {
            name: name.to_string(),
            type_name,
            category,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.type_name.is_empty()
    }
}

/// Decodes fragment source into its named sections
pub fn decode_sections(source: &str) -> Result<Table> {
    Ok(toml::from_str::<Table>(source)?)
}
