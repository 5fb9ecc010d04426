use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("invalid value '{value}' for filter on '{field}'")]
    InvalidValue { field: String, value: String },

    #[error("invalid id '{value}' for relationship '{relationship}'")]
    InvalidId { relationship: String, value: String },
}
