// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Credential creation followed by the profile write

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::RegistrationForm;
use crate::auth::{AccountId, AuthService};
use crate::db::{Document, DocumentStore};
use crate::{Result, TurathError};

/// Profile document stored under the account id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub birthday: String,
    pub phone_number: String,
    pub email: String,
}

impl From<&RegistrationForm> for UserProfile {
    fn from(form: &RegistrationForm) -> Self {
        Self {
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            birthday: form.birthday.clone(),
            phone_number: form.phone_number.clone(),
            email: form.email.clone(),
        }
    }
}

impl UserProfile {
    fn to_document(&self) -> Result<Document> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(TurathError::Query("profile did not serialize to an object".to_string())),
        }
    }
}

/// Creates accounts with the identity service and records their profiles
pub struct AccountRegistrar {
    auth: Arc<dyn AuthService>,
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl AccountRegistrar {
    pub fn new(auth: Arc<dyn AuthService>, store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            auth,
            store,
            collection: collection.into(),
        }
    }

    /// Create the credential, then write the profile keyed by its account id.
    ///
    /// A failed profile write leaves the credential in place.
    pub async fn register(&self, profile: &UserProfile, password: &str) -> Result<AccountId> {
        let account_id = self.auth.create_account(&profile.email, password).await?;
        info!("Created account {} for {}", account_id, profile.email);

        let document = profile.to_document()?;
        if let Err(e) = self.store.write_document(&self.collection, &account_id, document).await {
            warn!("Profile write failed for account {}: {}", account_id, e);
            return Err(e);
        }

        Ok(account_id)
    }
}
