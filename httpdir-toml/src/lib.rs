//! Httpdir TOML declarations
//!
//! This crate turns fragment files into job declarations. It includes:
//! - Section introspection: name, type and category of a raw section
//! - Declaration parsing: typed decoding of the job section and builder wiring

pub mod error;
pub mod parser;
pub mod section;

pub use error::{DeclarationError, Result};
pub use parser::{HTTP_INPUT_TYPE, parse_declaration, parse_declaration_str};
pub use section::{SectionInfo, decode_sections};
