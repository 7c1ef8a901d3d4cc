//! Declaration parser
//!
//! Reads one fragment file, finds the single section tagged `HttpInput` and
//! turns it into a `JobDeclaration`. The job's logical name is the section
//! name, never the file path. Other section types in the same file are
//! ignored.

use httpdir_core::{CommonInputConfig, HttpInputConfig, JobBuilder, JobDeclaration};
use std::path::Path;
use toml::Value;
use tracing::debug;

use crate::error::{DeclarationError, Result};
use crate::section::{SectionInfo, decode_sections};

/// Type tag of the job-bearing section
pub const HTTP_INPUT_TYPE: &str = "HttpInput";

/// Parse a fragment file into a declaration
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read or is not valid TOML
/// - No section, or more than one section, is tagged `HttpInput`
/// - The section's settings are malformed or rejected by the finalizer
pub fn parse_declaration(path: &Path) -> Result<JobDeclaration> {
    let source = std::fs::read_to_string(path).map_err(|e| DeclarationError::io(path, e))?;
    parse_declaration_str(&source, path)
}

/// Parse fragment source that was read from `path`
///
/// # Example
/// ```
/// use httpdir_toml::parse_declaration_str;
/// use std::path::Path;
///
/// let source = r#"
///     [api_health]
///     type = "HttpInput"
///     url = "http://localhost:8080/health"
///     ticker_interval = 30
/// "#;
///
/// let declaration = parse_declaration_str(source, Path::new("/etc/http.d/health.toml"))?;
/// assert_eq!(declaration.logical_name, "api_health");
/// assert_eq!(declaration.config.ticker_interval, 30);
/// # Ok::<(), httpdir_toml::DeclarationError>(())
/// ```
pub fn parse_declaration_str(source: &str, path: &Path) -> Result<JobDeclaration> {
    let sections = decode_sections(source)?;

    let mut matches: Vec<(SectionInfo, &Value)> = sections
        .iter()
        .map(|(name, section)| (SectionInfo::classify(name, section), section))
        .filter(|(info, _)| info.type_name == HTTP_INPUT_TYPE)
        .collect();

    if matches.len() > 1 {
        return Err(DeclarationError::AmbiguousSection {
            kind: HTTP_INPUT_TYPE,
            names: matches.into_iter().map(|(info, _)| info.name).collect(),
        });
    }
    let Some((info, section)) = matches.pop() else {
        return Err(DeclarationError::MissingSection(HTTP_INPUT_TYPE));
    };

    debug!("Found {} section '{}' in {}", HTTP_INPUT_TYPE, info.name, path.display());

    let builder = make_builder(&info.name, section)?;
    Ok(JobDeclaration::new(path.to_path_buf(), builder)?)
}

/// Decodes the section and wires the finalize hooks
///
/// The typed-config hook runs the regular preparation so comparisons see
/// resolved settings. The common hook overlays the directory's retry policy
/// and exit default on top of the regular preparation.
fn make_builder(name: &str, section: &Value) -> Result<JobBuilder> {
    let config: HttpInputConfig = decode_section(name, section)?;
    let common: CommonInputConfig = decode_section(name, section)?;

    Ok(JobBuilder::new(name, config, common)
        .with_config_finalizer(HttpInputConfig::prepare)
        .with_common_finalizer(|common| Ok(common.prepare()?.apply_defaults())))
}

fn decode_section<T: serde::de::DeserializeOwned>(name: &str, section: &Value) -> Result<T> {
    section
        .clone()
        .try_into()
        .map_err(|source| DeclarationError::InvalidSection {
            name: name.to_string(),
            source,
        })
}
