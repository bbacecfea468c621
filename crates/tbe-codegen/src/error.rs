use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Aux argument bucket order {declared:?} does not match declared buckets {found:?}")]
    SchemaMismatch {
        declared: Vec<String>,
        found: Vec<String>,
    },

    #[error("Unknown aux argument bucket: {0}")]
    UnknownBucket(String),

    #[error("No offloaded_bool_extras declared; the offloaded-storage schema would equal the base schema")]
    MissingOffloadedExtras,

    #[error("Duplicate aux argument {name} in {bucket}")]
    DuplicateArgument { bucket: String, name: String },

    #[error("Template not found: {}", path.display())]
    TemplateNotFound { path: PathBuf },

    #[error("Template {template} references undefined binding `{name}`")]
    UndefinedBinding { template: String, name: String },

    #[error("Malformed template {template}: unterminated or empty placeholder at byte {offset}")]
    MalformedTemplate { template: String, offset: usize },

    #[error("Output {0} planned twice in one run")]
    DuplicateOutput(String),

    #[error("Catalogue has {errors} validation error(s)")]
    InvalidCatalogue { errors: usize },
}

#[derive(Debug, Clone)]
pub struct Violation {
    pub severity: Severity,
    pub rule: String,
    pub message: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        write!(f, "[{prefix}] {}: {}", self.rule, self.message)
    }
}
