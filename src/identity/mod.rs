//! Identity provider implementations
//!
//! Each provider implements [`IdentityProvider`](crate::core::auth::IdentityProvider)
//! and is selected from [`IdentityConfig`](crate::config::IdentityConfig).

#[cfg(feature = "remote-auth")]
pub mod identity_toolkit;
pub mod static_tokens;

#[cfg(feature = "remote-auth")]
pub use identity_toolkit::IdentityToolkitProvider;
pub use static_tokens::StaticTokenProvider;

use crate::config::IdentityConfig;
use crate::core::auth::IdentityProvider;
use anyhow::Result;
use std::sync::Arc;

/// Build the provider described by `config`
pub fn from_config(config: &IdentityConfig) -> Result<Arc<dyn IdentityProvider>> {
    match config {
        IdentityConfig::StaticTokens { tokens } => Ok(Arc::new(StaticTokenProvider::new(
            tokens.iter().map(|(token, subject)| (token.clone(), subject.clone())),
        ))),
        #[cfg(feature = "remote-auth")]
        IdentityConfig::IdentityToolkit { endpoint, api_key } => Ok(Arc::new(
            IdentityToolkitProvider::new(endpoint.clone(), api_key.clone())?,
        )),
        #[cfg(not(feature = "remote-auth"))]
        IdentityConfig::IdentityToolkit { .. } => Err(anyhow::anyhow!(
            "identity_toolkit provider requires the 'remote-auth' feature"
        )),
    }
}
