// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Identity service client for account creation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::{Result, TurathError};

/// Opaque account identifier issued by the identity service
pub type AccountId = String;

/// Failures reported by the identity service, mapped from its error codes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("This email address is already in use. Please try another.")]
    EmailAlreadyInUse,

    #[error("The email address is badly formatted.")]
    InvalidEmail,

    #[error("The password is too weak: {0}")]
    WeakPassword(String),

    #[error("Password sign-up is disabled for this project.")]
    OperationNotAllowed,

    #[error("Too many attempts. Try again later.")]
    TooManyAttempts,

    #[error("Network error: {0}")]
    Network(String),

    #[error("{message}")]
    Other { code: String, message: String },
}

impl AuthError {
    /// Map a collaborator error code to the closed taxonomy.
    ///
    /// Accepts both REST codes (`EMAIL_EXISTS`, optionally followed by
    /// ` : detail`) and SDK codes (`auth/email-already-in-use`).
    pub fn from_code(code: &str, message: &str) -> Self {
        let (head, detail) = match code.split_once(" : ") {
            Some((head, detail)) => (head.trim(), detail.trim()),
            None => (code.trim(), ""),
        };
        match head {
            "EMAIL_EXISTS" | "auth/email-already-in-use" => Self::EmailAlreadyInUse,
            "INVALID_EMAIL" | "auth/invalid-email" => Self::InvalidEmail,
            "WEAK_PASSWORD" | "auth/weak-password" => {
                let reason = if detail.is_empty() { message } else { detail };
                Self::WeakPassword(reason.to_string())
            }
            "OPERATION_NOT_ALLOWED" | "auth/operation-not-allowed" => Self::OperationNotAllowed,
            "TOO_MANY_ATTEMPTS_TRY_LATER" | "auth/too-many-requests" => Self::TooManyAttempts,
            "auth/network-request-failed" => Self::Network(message.to_string()),
            _ => Self::Other {
                code: head.to_string(),
                message: if message.is_empty() { code.to_string() } else { message.to_string() },
            },
        }
    }
}

/// Credential creation capability
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an email/password credential and return its account id
    async fn create_account(&self, email: &str, password: &str) -> std::result::Result<AccountId, AuthError>;
}

/// REST client for an identity-toolkit style sign-up endpoint
pub struct IdentityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityClient {
    /// Create a new identity client
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn sign_up_url(&self) -> String {
        format!("{}/accounts:signUp", self.base_url)
    }
}

#[async_trait]
impl AuthService for IdentityClient {
    async fn create_account(&self, email: &str, password: &str) -> std::result::Result<AccountId, AuthError> {
        let request = SignUpRequest {
            email,
            password,
            return_secure_token: true,
        };

        debug!("Requesting account creation for {}", email);

        let response = self.client
            .post(self.sign_up_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => AuthError::from_code(&envelope.error.message, &envelope.error.message),
                Err(_) => {
                    warn!("Identity service returned status {} without an error body", status);
                    AuthError::Other {
                        code: status.as_str().to_string(),
                        message: format!("Identity service returned status {}", status),
                    }
                }
            });
        }

        let body: SignUpResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Other {
                code: "INVALID_RESPONSE".to_string(),
                message: e.to_string(),
            })?;
        Ok(body.local_id)
    }
}

/// Check the identity endpoint is reachable at all
pub async fn health_check(config: &AuthConfig) -> Result<()> {
    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    client.get(&config.url).send().await.map_err(|e| {
        TurathError::Auth(AuthError::Network(format!(
            "Cannot reach identity service at {}: {}",
            config.url, e
        )))
    })?;
    Ok(())
}
