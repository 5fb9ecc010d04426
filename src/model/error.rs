use thiserror::Error;

/// Declaration bugs detected while deriving a model's metadata. These are
/// programming errors: `get_meta` turns them into a panic at first use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaError {
    #[error("{model}: malformed tag on field '{field}': {tag:?}")]
    MalformedTag {
        model: &'static str,
        field: String,
        tag: String,
    },

    #[error("{model}: missing base marker")]
    MissingBase { model: &'static str },

    #[error("{model}: base marker declared more than once")]
    DuplicateBase { model: &'static str },

    #[error("{model}: base marker tag {tag:?} must be fire:\"singular:plural[:collection]\"")]
    InvalidBaseTag { model: &'static str, tag: String },

    #[error("{model}: field '{field}': unsupported tag {tag:?}")]
    UnsupportedTag {
        model: &'static str,
        field: String,
        tag: String,
    },

    #[error("{model}: field '{field}': relationship tag {tag:?} must have {expected} parts")]
    RelationshipArity {
        model: &'static str,
        field: String,
        tag: String,
        expected: usize,
    },

    #[error("{model}: field '{field}': relationship tag on a field that does not hold ids")]
    RelationshipType { model: &'static str, field: String },

    #[error("{model}: field '{field}': more than one relationship tag")]
    DuplicateRelationship { model: &'static str, field: String },

    #[error("{model}: name '{name}' is used more than once")]
    DuplicateName { model: &'static str, name: String },
}

/// Failures of the dynamic field accessor. Both indicate an integration bug
/// rather than bad user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("type mismatch for field '{field}': {reason}")]
    TypeMismatch { field: String, reason: String },
}
