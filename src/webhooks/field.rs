//! Field-scoped validation errors.
//!
//! Mirrors the Kubernetes `field.ErrorList` vocabulary so that admission
//! denials read the same as errors produced by the API server itself.

use std::fmt;

use serde_json::Value;

/// Path to a field inside an object, e.g. `spec.volume.size` or `spec.caches[0]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Segment {
    Field(String),
    Index(usize),
}

impl FieldPath {
    /// Start a path at the given root field.
    pub fn new(root: &str) -> Self {
        Self {
            segments: vec![Segment::Field(root.to_string())],
        }
    }

    /// Path to a named child field.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Field(name.to_string()));
        Self { segments }
    }

    /// Path to a list element.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => write!(f, "{}", name)?,
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Kind of a field error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldErrorKind {
    /// A mandatory field or subtree is absent.
    Required,
    /// A present value fails a rule.
    Invalid,
    /// A value violates a uniqueness constraint.
    Duplicate,
    /// A referenced object does not exist.
    NotFound,
    /// Validation could not complete for reasons unrelated to the value.
    InternalError,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldErrorKind::Required => write!(f, "Required value"),
            FieldErrorKind::Invalid => write!(f, "Invalid value"),
            FieldErrorKind::Duplicate => write!(f, "Duplicate value"),
            FieldErrorKind::NotFound => write!(f, "Not found"),
            FieldErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// A single field-level validation error.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub path: FieldPath,
    /// The offending value (`Null` when there is none).
    pub value: Value,
    pub detail: String,
}

impl FieldError {
    pub fn required(path: FieldPath, detail: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Required,
            path,
            value: Value::Null,
            detail: detail.into(),
        }
    }

    pub fn invalid(path: FieldPath, value: impl Into<Value>, detail: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Invalid,
            path,
            value: value.into(),
            detail: detail.into(),
        }
    }

    pub fn duplicate(path: FieldPath, value: impl Into<Value>) -> Self {
        Self {
            kind: FieldErrorKind::Duplicate,
            path,
            value: value.into(),
            detail: String::new(),
        }
    }

    pub fn internal(path: FieldPath, detail: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::InternalError,
            path,
            value: Value::Null,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)?;
        match self.kind {
            FieldErrorKind::Invalid | FieldErrorKind::Duplicate | FieldErrorKind::NotFound => {
                write!(f, ": {}", self.value)?;
            }
            FieldErrorKind::Required | FieldErrorKind::InternalError => {}
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Ordered collection of field errors. Empty means valid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldErrorList(Vec<FieldError>);

impl FieldErrorList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// Errors reported for the given path.
    pub fn for_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.0.iter().filter(move |e| e.path.to_string() == path)
    }

    /// All errors in one line: `[e1, e2, ...]`.
    pub fn aggregate(&self) -> String {
        let errors: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        format!("[{}]", errors.join(", "))
    }
}

impl From<FieldError> for FieldErrorList {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl From<Vec<FieldError>> for FieldErrorList {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl FromIterator<FieldError> for FieldErrorList {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<FieldError> for FieldErrorList {
    fn extend<I: IntoIterator<Item = FieldError>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for FieldErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldErrorList {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
