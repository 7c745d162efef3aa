//! Error and warning types for parsing and validation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal parse or validation errors. A parse that returns one of these never
/// also returns a specification; there is no partially-valid result.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: bad block, missing terminator, unparseable
    /// type or annotation expression. Aborts the parse immediately.
    #[error("near line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("duplicate type {name:?} declared near lines {first} and {second}")]
    DuplicateType {
        name: String,
        first: usize,
        second: usize,
    },

    #[error("duplicate route path {path:?} declared near lines {first} and {second}")]
    DuplicateRoute {
        path: String,
        first: usize,
        second: usize,
    },

    #[error("route `{method} {path}` references undeclared type {type_name:?}")]
    UnknownTypeRef {
        method: String,
        path: String,
        type_name: String,
    },

    /// Directory mode: the same type name declared in two files.
    #[error("duplicate type {name:?} declared in {first} and {second}")]
    CrossFileDuplicateType {
        name: String,
        first: String,
        second: String,
    },

    /// Directory mode: the same route path declared in two files.
    #[error("duplicate route path {path:?} declared in {first} and {second}")]
    CrossFileDuplicateRoute {
        path: String,
        first: String,
        second: String,
    },

    /// Wraps any of the above with the source file path.
    #[error("{path}: {source}")]
    InFile {
        path: String,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Error {
        Error::Syntax {
            line,
            message: message.into(),
        }
    }

    /// Attach a file path to an error produced while parsing that file.
    pub(crate) fn in_file(self, path: &std::path::Path) -> Error {
        Error::InFile {
            path: path.display().to_string(),
            source: Box::new(self),
        }
    }
}

/// A non-fatal validation finding. The library never prints these; the
/// caller decides whether to surface or escalate them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
}

impl Warning {
    pub(crate) fn new(message: impl Into<String>) -> Warning {
        Warning {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
