//! Fixed token table, for development and tests

use crate::core::auth::{IdentityProvider, ProviderError, VerifiedToken};
use async_trait::async_trait;
use std::collections::HashMap;

/// Accepts only the configured tokens, each bound to one subject
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    tokens: HashMap<String, String>,
}

impl StaticTokenProvider {
    pub fn new(tokens: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Add or replace a token
    pub fn with_token(mut self, token: impl Into<String>, subject: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), subject.into());
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn verify_token(&self, token: &str) -> Result<VerifiedToken, ProviderError> {
        self.tokens
            .get(token)
            .map(VerifiedToken::new)
            .ok_or_else(|| ProviderError::Rejected {
                reason: "unknown token".to_string(),
            })
    }
}
