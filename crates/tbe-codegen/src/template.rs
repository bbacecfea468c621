//! Template loading and rendering.
//!
//! Templates are plain text with `{{ name }}` placeholders. Every
//! placeholder must resolve against the [`Bindings`] handed to
//! [`Template::render`]; a missing name is fatal, never an empty string.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::CodegenError;

/// A single binding value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Str(String),
    List(Vec<String>),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

/// Named values a template is rendered against.
///
/// Ordered so that debug output and plan listings are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings(BTreeMap<String, Value>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.0.insert(name.to_string(), value.into());
    }

    /// Copy every binding of `other` into `self`, overwriting on conflict.
    pub fn extend(&mut self, other: &Bindings) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    id: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template source. `id` is used in error messages only.
    ///
    /// # Errors
    ///
    /// Returns [`CodegenError::MalformedTemplate`] for an unterminated
    /// `{{` or a placeholder with no name.
    pub fn parse(id: &str, source: &str) -> Result<Self, CodegenError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let malformed = || CodegenError::MalformedTemplate {
                template: id.to_string(),
                offset: offset + start,
            };
            let end = after.find("}}").ok_or_else(malformed)?;
            let name = after[..end].trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(malformed());
            }
            segments.push(Segment::Var(name.to_string()));
            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            id: id.to_string(),
            segments,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Render against `bindings`.
    ///
    /// # Errors
    ///
    /// Returns [`CodegenError::UndefinedBinding`] for the first
    /// placeholder that `bindings` does not define.
    pub fn render(&self, bindings: &Bindings) -> Result<String, CodegenError> {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Text(text) => out.push_str(text),
                Segment::Var(name) => {
                    let value = bindings
                        .get(name)
                        .ok_or_else(|| CodegenError::UndefinedBinding {
                            template: self.id.clone(),
                            name: name.clone(),
                        })?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(out)
    }
}

/// Where templates are loaded from.
pub trait TemplateSource {
    /// Load and parse the template at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CodegenError::TemplateNotFound`] if `path` does not
    /// resolve, or [`CodegenError::MalformedTemplate`] if it fails to parse.
    fn load(&self, path: &str) -> Result<Template, CodegenError>;
}

/// Templates read from a directory tree.
#[derive(Debug, Clone)]
pub struct FsTemplates {
    root: PathBuf,
}

impl FsTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for FsTemplates {
    fn load(&self, path: &str) -> Result<Template, CodegenError> {
        let full = self.root.join(path);
        let source = match std::fs::read_to_string(&full) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CodegenError::TemplateNotFound { path: full });
            }
            Err(e) => return Err(e.into()),
        };
        Template::parse(path, &source)
    }
}

/// In-memory templates keyed by path.
impl TemplateSource for BTreeMap<String, String> {
    fn load(&self, path: &str) -> Result<Template, CodegenError> {
        let source = self
            .get(path)
            .ok_or_else(|| CodegenError::TemplateNotFound {
                path: PathBuf::from(path),
            })?;
        Template::parse(path, source)
    }
}
