// Hooks run by controllers: one authorizer before any store access, one
// validator before persisting, one cleaner before removal on delete.

pub mod authorizers;
pub mod context;
pub mod error;
pub mod traits;
pub mod validators;

pub use authorizers::BearerTokenAuthorizer;
pub use context::{Action, Context, RawRequest};
pub use error::CallbackError;
pub use traits::{callback, combine, except, named, only, Callback};
pub use validators::{
    CascadeCleaner, DependentResourcesValidator, ProtectedAttributesValidator, VerifyReferencesValidator,
};
