//! Remote token verification against an Identity-Toolkit style endpoint
//!
//! Sends `POST {endpoint}?key={api_key}` with `{"idToken": token}` and reads
//! the subject from `users[0].localId`. A `400` answer means the token was
//! rejected; transport errors and other statuses mean the provider is
//! unavailable.

use crate::core::auth::{IdentityProvider, ProviderError, VerifiedToken};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<Map<String, Value>>,
}

/// Verifies ID tokens with a remote `accounts:lookup` endpoint
#[derive(Debug, Clone)]
pub struct IdentityToolkitProvider {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl IdentityToolkitProvider {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            client,
        })
    }
}

/// Pull the subject out of a lookup answer
fn subject_from_lookup(body: LookupResponse) -> Result<VerifiedToken, ProviderError> {
    let mut user = body
        .users
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Rejected {
            reason: "no account for token".to_string(),
        })?;

    let subject = match user.remove("localId") {
        Some(Value::String(id)) if !id.is_empty() => id,
        _ => {
            return Err(ProviderError::Unavailable {
                message: "lookup response has no localId".to_string(),
            });
        }
    };

    Ok(VerifiedToken {
        subject,
        claims: user,
    })
}

#[async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    async fn verify_token(&self, token: &str) -> Result<VerifiedToken, ProviderError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "idToken": token }));
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable {
                message: e.to_string(),
            })?;

        match response.status() {
            StatusCode::OK => {
                let body: LookupResponse =
                    response
                        .json()
                        .await
                        .map_err(|e| ProviderError::Unavailable {
                            message: format!("invalid lookup response: {}", e),
                        })?;
                subject_from_lookup(body)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ProviderError::Rejected {
                    reason: format!("provider answered {}", response.status()),
                })
            }
            status => Err(ProviderError::Unavailable {
                message: format!("provider answered {}", status),
            }),
        }
    }
}
