//! Caller capabilities.
//!
//! A token is validated once at the tool boundary and turned into a
//! [`Capability`] that is passed explicitly into every core operation.

use std::collections::BTreeMap;

use serde::Serialize;

use sdrf_model::{AnnotatorError, Result};

/// What the caller is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Capability {
    /// Read-only access.
    Anonymous,
    /// May persist metadata columns.
    Authenticated { user: String },
}

impl Capability {
    pub fn user(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { user } => Some(user),
        }
    }

    /// Fails with an authentication error unless the caller is authenticated.
    pub fn require_authenticated(&self, action: &str) -> Result<&str> {
        self.user().ok_or_else(|| {
            AnnotatorError::authentication(format!("{action} requires a valid user token"))
        })
    }
}

/// Validates user tokens.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: Option<&str>) -> Result<Capability>;
}

/// Accepts every caller. A supplied token is taken as the user name.
///
/// Meant for single-user local runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAnonymous;

impl TokenValidator for AllowAnonymous {
    fn validate(&self, token: Option<&str>) -> Result<Capability> {
        Ok(match non_empty(token) {
            Some(token) => Capability::Authenticated {
                user: token.to_string(),
            },
            None => Capability::Anonymous,
        })
    }
}

/// Fixed token table, usually from the `[auth]` config section.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: BTreeMap<String, String>,
    require_token: bool,
}

impl StaticTokens {
    pub fn new(tokens: BTreeMap<String, String>, require_token: bool) -> Self {
        Self {
            tokens,
            require_token,
        }
    }
}

impl TokenValidator for StaticTokens {
    fn validate(&self, token: Option<&str>) -> Result<Capability> {
        match non_empty(token) {
            None if self.require_token => {
                Err(AnnotatorError::authentication("a user token is required"))
            }
            None => Ok(Capability::Anonymous),
            Some(token) => self
                .tokens
                .get(token)
                .map(|user| Capability::Authenticated { user: user.clone() })
                .ok_or_else(|| AnnotatorError::authentication("user token was rejected")),
        }
    }
}

fn non_empty(token: Option<&str>) -> Option<&str> {
    token.map(str::trim).filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(require_token: bool) -> StaticTokens {
        StaticTokens::new(
            BTreeMap::from([("secret-token".to_string(), "alice".to_string())]),
            require_token,
        )
    }

    #[test]
    fn static_tokens_map_to_users() {
        let capability = tokens(false).validate(Some("secret-token")).unwrap();
        assert_eq!(capability.user(), Some("alice"));
        assert_eq!(tokens(false).validate(None).unwrap(), Capability::Anonymous);
        assert_eq!(tokens(false).validate(Some("  ")).unwrap(), Capability::Anonymous);
    }

    #[test]
    fn rejected_and_missing_tokens_are_authentication_errors() {
        let error = tokens(false).validate(Some("guess")).unwrap_err();
        assert_eq!(error.error_type(), "authentication_error");
        let error = tokens(true).validate(None).unwrap_err();
        assert_eq!(error.error_type(), "authentication_error");
    }

    #[test]
    fn anonymous_cannot_persist() {
        let error = Capability::Anonymous
            .require_authenticated("auto_create")
            .unwrap_err();
        assert_eq!(error.error_type(), "authentication_error");
    }
}
