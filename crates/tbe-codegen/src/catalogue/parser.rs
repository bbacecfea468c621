use std::path::Path;

use crate::catalogue::types::Catalogue;
use crate::error::CodegenError;

/// Parse a YAML optimizer catalogue file into a [`Catalogue`].
///
/// # Errors
///
/// Returns [`CodegenError::Io`] if the file cannot be read,
/// or [`CodegenError::Yaml`] if the YAML is malformed.
pub fn parse_catalogue(path: &Path) -> Result<Catalogue, CodegenError> {
    let content = std::fs::read_to_string(path)?;
    parse_catalogue_str(&content)
}

/// Parse a YAML optimizer catalogue from a string.
pub fn parse_catalogue_str(yaml: &str) -> Result<Catalogue, CodegenError> {
    let catalogue: Catalogue = serde_yaml::from_str(yaml)?;
    Ok(catalogue)
}
