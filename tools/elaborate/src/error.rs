use c_ast::Cursor;
use thiserror::Error;

/// Reasons a translation unit cannot be elaborated. Any of these aborts the whole unit.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("expected a {expected}, found {actual} at {location}")]
    KindMismatch {
        expected: &'static str,
        actual: String,
        location: String,
    },
    #[error("unresolved reference to `{reference}` at {location}")]
    UnresolvedReference { reference: String, location: String },
    #[error("unsupported construct: {construct} at {location}")]
    UnsupportedConstruct { construct: String, location: String },
    #[error("initializer of `{name}` has {expressions} expressions at {location}")]
    MalformedInitializer {
        name: String,
        expressions: usize,
        location: String,
    },
    #[error("`{spelling}` is not a valid {kind} name at {location}")]
    InvalidIdentifier {
        spelling: String,
        kind: &'static str,
        location: String,
    },
}

/// `file:line:col` of the start of `cursor`.
pub(crate) fn location_of<C: Cursor>(cursor: &C) -> String {
    match cursor.source_range() {
        Some(range) => range.begin.to_string(),
        None => "<unknown location>".to_string(),
    }
}

impl Error {
    pub(crate) fn unsupported<C: Cursor, S: Into<String>>(cursor: &C, construct: S) -> Error {
        Error::UnsupportedConstruct {
            construct: construct.into(),
            location: location_of(cursor),
        }
    }

    pub(crate) fn unresolved<C: Cursor, S: Into<String>>(cursor: &C, reference: S) -> Error {
        Error::UnresolvedReference {
            reference: reference.into(),
            location: location_of(cursor),
        }
    }

    pub(crate) fn mismatch<C: Cursor, S: Into<String>>(
        cursor: &C,
        expected: &'static str,
        actual: S,
    ) -> Error {
        Error::KindMismatch {
            expected,
            actual: actual.into(),
            location: location_of(cursor),
        }
    }
}
