use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DspTreeError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Walk error: {0}")]
    Walk(String),
    #[error("Cannot convert text from {from} to {to}: {reason}")]
    EncodingConversion {
        from: &'static str,
        to: &'static str,
        reason: String,
    },
    #[error("Malformed `{directive}` directive on line {line}")]
    MalformedDirective { line: usize, directive: &'static str },
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DspTreeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DspTreeError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A value that is always produced, together with the diagnostics collected
/// while producing it.
///
/// Parsing, scanning and encoding conversion never fail outright: on trouble
/// they fall back to a safe value (an empty project, an empty subtree, the
/// unconverted text) and record why here. An empty `diagnostics` list means
/// the value is complete.
#[derive(Debug)]
#[must_use]
pub struct Outcome<T> {
    pub value: T,
    pub diagnostics: Vec<DspTreeError>,
}

impl<T> Outcome<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    pub fn degraded(value: T, diagnostic: DspTreeError) -> Self {
        Self {
            value,
            diagnostics: vec![diagnostic],
        }
    }

    /// Whether any fallback was taken while producing the value.
    pub fn is_degraded(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn push(&mut self, diagnostic: DspTreeError) {
        self.diagnostics.push(diagnostic);
    }

    /// Moves the diagnostics of `other` into `self` and hands back its value.
    pub fn absorb<U>(&mut self, other: Outcome<U>) -> U {
        self.diagnostics.extend(other.diagnostics);
        other.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, Vec<DspTreeError>) {
        (self.value, self.diagnostics)
    }
}
