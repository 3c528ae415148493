// Deployment Environment & Token Substitution

use super::error::{DomainError, Result};
use serde::Serialize;

/// Placeholder replaced with the environment name in every schema file
pub const DEFAULT_TOKEN: &str = "${ENV}";

/// Maximum environment name length (ends up inside keyspace identifiers)
pub const MAX_ENVIRONMENT_LEN: usize = 32;

/// Validated deployment environment name (e.g. `dev`, `staging`, `prod`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentName(String);

impl EnvironmentName {
    /// Parse and validate an environment name
    ///
    /// Accepts ASCII alphanumerics and `_` only, since the value is spliced
    /// into CQL identifiers such as `app_${ENV}`.
    pub fn parse(raw: &str) -> Result<Self> {
        let name = raw.trim();

        if name.is_empty() {
            return Err(invalid(raw, "must not be empty"));
        }

        if name.len() > MAX_ENVIRONMENT_LEN {
            return Err(invalid(
                raw,
                &format!("too long (max {} characters)", MAX_ENVIRONMENT_LEN),
            ));
        }

        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid(raw, "only alphanumeric characters and '_' allowed"));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn invalid(name: &str, reason: &str) -> DomainError {
    DomainError::InvalidEnvironment {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Textual substitution of the environment token
#[derive(Debug, Clone)]
pub struct TokenSubstitution {
    token: String,
    environment: EnvironmentName,
}

impl TokenSubstitution {
    pub fn new(token: impl Into<String>, environment: EnvironmentName) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DomainError::InvalidToken(
                "token must not be empty".to_string(),
            ));
        }
        Ok(Self { token, environment })
    }

    /// Substitution using the default `${ENV}` token
    pub fn with_default_token(environment: EnvironmentName) -> Self {
        Self {
            token: DEFAULT_TOKEN.to_string(),
            environment,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn environment(&self) -> &EnvironmentName {
        &self.environment
    }

    /// Replace every occurrence of the token
    pub fn apply(&self, content: &str) -> String {
        content.replace(&self.token, self.environment.as_str())
    }

    /// Number of token occurrences in `content`
    pub fn occurrences(&self, content: &str) -> usize {
        content.matches(&self.token).count()
    }
}
