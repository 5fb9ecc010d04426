use async_trait::async_trait;

use super::context::{Context, RawRequest};
use super::error::CallbackError;
use super::traits::Callback;
use crate::auth::{verify_token, Claims};
use crate::config;

/// Requires an `Authorization: Bearer <token>` header carrying a valid
/// HS256 access token, and optionally a scope. The verified `Claims` are
/// left in the context metadata for later hooks.
#[derive(Debug, Clone)]
pub struct BearerTokenAuthorizer {
    secret: String,
    scope: Option<String>,
}

impl BearerTokenAuthorizer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            scope: None,
        }
    }

    /// Secret and required scope from `SECURITY_TOKEN_SECRET` and
    /// `SECURITY_REQUIRED_SCOPE`.
    pub fn from_config() -> Self {
        let security = &config::config().security;
        Self {
            secret: security.token_secret.clone(),
            scope: security.required_scope.clone(),
        }
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

/// Extract the bearer token from the Authorization header
fn extract_token(request: &RawRequest) -> Result<&str, CallbackError> {
    let header = request
        .header("authorization")
        .ok_or_else(|| CallbackError::denied("Missing Authorization header"))?;

    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err(CallbackError::denied("Empty bearer token")),
        None => Err(CallbackError::denied("Authorization header must use Bearer token format")),
    }
}

#[async_trait]
impl Callback for BearerTokenAuthorizer {
    fn name(&self) -> &'static str {
        "bearer_token"
    }

    async fn run(&self, ctx: &mut Context) -> Result<(), CallbackError> {
        if self.secret.is_empty() {
            return Err(CallbackError::system("token secret not configured"));
        }

        let token = extract_token(&ctx.request)?;
        let claims: Claims = verify_token(token, &self.secret).map_err(|e| CallbackError::denied(e.to_string()))?;

        if let Some(scope) = &self.scope {
            if !claims.has_scope(scope) {
                return Err(CallbackError::denied(format!("token lacks scope '{}'", scope)));
            }
        }

        tracing::debug!(subject = %claims.sub, action = ?ctx.action, "Bearer token accepted");
        ctx.set_metadata(claims);
        Ok(())
    }
}
