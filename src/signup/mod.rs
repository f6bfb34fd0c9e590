// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Account sign-up: validation, duplicate check, registration

pub mod registrar;
pub mod uniqueness;
pub mod validate;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{AccountId, AuthError, AuthService};
use crate::db::DocumentStore;
use crate::gate::InFlight;
use crate::TurathError;

pub use registrar::{AccountRegistrar, UserProfile};
pub use uniqueness::{check_unique, Uniqueness};
pub use validate::{validate, ValidationReport};

/// One sign-up attempt as entered on the form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub birthday: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub confirm_password: String,
}

/// Form fields, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FirstName,
    LastName,
    Birthday,
    Email,
    PhoneNumber,
    Password,
    ConfirmPassword,
}

/// What is wrong with a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Required,
    InvalidFormat,
    TooWeak,
    Mismatch,
    AlreadyInUse,
}

impl IssueKind {
    /// User-facing text for this issue on `field`
    pub fn message(self, field: Field) -> &'static str {
        match (self, field) {
            (Self::Required, Field::Email) => "Please enter your email address",
            (Self::Required, Field::PhoneNumber) => "Please enter your phone number",
            (Self::Required, Field::Password) => "Please set a password",
            (Self::Required, Field::ConfirmPassword) => "Please re-enter your password",
            (Self::Required, _) => "This field is required",
            (Self::InvalidFormat, _) => "Please enter a valid email address",
            (Self::TooWeak, _) => {
                "Password must be at least 8 characters and include upper and lower case \
                 letters, a digit and a symbol (@$!%*?&)"
            }
            (Self::Mismatch, _) => "Please make sure both passwords match",
            (Self::AlreadyInUse, Field::PhoneNumber) => {
                "This phone number is already in use. Please try another."
            }
            (Self::AlreadyInUse, _) => "This email address is already in use. Please try another.",
        }
    }
}

/// A field error as shown next to the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub kind: IssueKind,
    pub message: String,
}

/// Field name to error; an absent field is valid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, FieldIssue>);

impl FieldErrors {
    /// Set the error for `field`, replacing any earlier one
    pub fn insert(&mut self, field: Field, kind: IssueKind) {
        self.0.insert(field, FieldIssue {
            kind,
            message: kind.message(field).to_string(),
        });
    }

    pub fn get(&self, field: Field) -> Option<&FieldIssue> {
        self.0.get(&field)
    }

    pub fn kind(&self, field: Field) -> Option<IssueKind> {
        self.0.get(&field).map(|issue| issue.kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Field, &FieldIssue)> {
        self.0.iter()
    }

    fn single(field: Field, kind: IssueKind) -> Self {
        let mut errors = Self::default();
        errors.insert(field, kind);
        errors
    }
}

/// Result of one submission, for the presentation layer to display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignUpOutcome {
    /// Account and profile created
    Registered { account_id: AccountId },
    /// Field-level problems: validation or an address already registered
    Rejected { errors: FieldErrors },
    /// A collaborator failed; the message is shown as-is
    Failed { message: String },
    /// Another submission is still running
    Busy,
}

/// Sign-up screen logic
pub struct SignUpService {
    store: Arc<dyn DocumentStore>,
    registrar: AccountRegistrar,
    users_collection: String,
    in_flight: InFlight,
}

impl SignUpService {
    pub fn new(auth: Arc<dyn AuthService>, store: Arc<dyn DocumentStore>, users_collection: impl Into<String>) -> Self {
        let users_collection = users_collection.into();
        Self {
            registrar: AccountRegistrar::new(auth, store.clone(), users_collection.clone()),
            store,
            users_collection,
            in_flight: InFlight::new(),
        }
    }

    /// A submission is in progress
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_busy()
    }

    /// Validate, check for duplicates, then register. One submission at a time.
    pub async fn submit(&self, form: &RegistrationForm) -> SignUpOutcome {
        let Some(_guard) = self.in_flight.try_begin() else {
            return SignUpOutcome::Busy;
        };
        self.process(form).await
    }

    /// [`submit`](Self::submit) without the in-flight gate
    pub async fn process(&self, form: &RegistrationForm) -> SignUpOutcome {
        let report = validate(form);
        if !report.is_clean() {
            info!(
                "Sign-up rejected with {} field errors (password mismatch: {})",
                report.errors.len(),
                report.password_mismatch
            );
            return SignUpOutcome::Rejected { errors: report.errors };
        }

        match check_unique(self.store.as_ref(), &self.users_collection, &form.email, &form.phone_number).await {
            Ok(Uniqueness::Unique) => {}
            Ok(Uniqueness::DuplicateEmail) => {
                return SignUpOutcome::Rejected {
                    errors: FieldErrors::single(Field::Email, IssueKind::AlreadyInUse),
                };
            }
            Ok(Uniqueness::DuplicatePhone) => {
                return SignUpOutcome::Rejected {
                    errors: FieldErrors::single(Field::PhoneNumber, IssueKind::AlreadyInUse),
                };
            }
            Err(e) => {
                warn!("Uniqueness check failed: {}", e);
                return SignUpOutcome::Failed { message: e.to_string() };
            }
        }

        match self.registrar.register(&UserProfile::from(form), &form.password).await {
            Ok(account_id) => SignUpOutcome::Registered { account_id },
            // Lost the race against another registration of the same address
            Err(TurathError::Auth(AuthError::EmailAlreadyInUse)) => SignUpOutcome::Rejected {
                errors: FieldErrors::single(Field::Email, IssueKind::AlreadyInUse),
            },
            Err(e) => {
                warn!("Registration failed: {}", e);
                SignUpOutcome::Failed { message: e.to_string() }
            }
        }
    }
}
