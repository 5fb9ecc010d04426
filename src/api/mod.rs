pub mod document;
pub mod format;
pub mod relationships;
pub mod response;

pub use response::{ApiResult, JsonApi, JSONAPI_MEDIA_TYPE};
