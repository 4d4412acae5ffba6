//! Error taxonomy for classification runs.
//!
//! Every failure is surfaced to the caller; nothing falls back to a default
//! label. A failed run never yields a partial label field.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GateIdError>;

#[derive(Debug, Error, PartialEq)]
pub enum GateIdError {
    #[error("category `{category}` references field `{field}`, which is not in the field store")]
    MissingField { category: String, field: String },

    #[error("field `{field}` has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        field: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("field `{field}` holds {len} values, which does not fill a {rays}x{gates} grid")]
    BadFieldLength {
        field: String,
        len: usize,
        rays: usize,
        gates: usize,
    },

    #[error("membership breakpoints for `{category}`/`{field}` are not non-decreasing: {breakpoints:?}")]
    NonMonotonicBreakpoints {
        category: String,
        field: String,
        breakpoints: [f32; 4],
    },

    #[error("weight for `{category}`/`{field}` must be finite and non-negative, got {weight}")]
    InvalidWeight {
        category: String,
        field: String,
        weight: f32,
    },

    #[error("category `{0}` is defined more than once")]
    DuplicateCategory(String),

    #[error("no categories configured")]
    NoCategories,

    #[error("`{context}` refers to unknown category `{category}`")]
    UnknownCategory { context: String, category: String },

    #[error("hard constraint on `{category}`/`{field}` has an inverted range ({low}, {high})")]
    InvertedRange {
        category: String,
        field: String,
        low: f32,
        high: f32,
    },

    #[error("smoothing window must be at least 1x1, got {rays}x{gates}")]
    ZeroWindow { rays: usize, gates: usize },

    #[error("override `{0}` would reuse an existing category index")]
    OverrideConflict(String),

    #[error("label field has no category named `{0}`")]
    MissingCategory(String),

    #[error("malformed category notes: {0}")]
    MalformedNotes(String),

    #[error("unknown configuration preset `{0}`")]
    UnknownPreset(String),

    #[error("configuration could not be parsed: {0}")]
    Parse(String),

    #[error("configuration file could not be read: {0}")]
    Io(String),
}

impl From<serde_json::Error> for GateIdError {
    fn from(e: serde_json::Error) -> Self {
        GateIdError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for GateIdError {
    fn from(e: std::io::Error) -> Self {
        GateIdError::Io(e.to_string())
    }
}
