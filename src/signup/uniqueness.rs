// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Pre-registration duplicate check against stored profiles

use tracing::debug;

use crate::db::DocumentStore;
use crate::Result;

/// Outcome of the duplicate check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
    Unique,
    DuplicateEmail,
    DuplicatePhone,
}

/// Look for profiles with the same email and, separately, the same phone
/// number. An email clash is reported ahead of a phone clash.
pub async fn check_unique(
    store: &dyn DocumentStore,
    collection: &str,
    email: &str,
    phone_number: &str,
) -> Result<Uniqueness> {
    let (by_email, by_phone) = tokio::try_join!(
        store.query(collection, "email", email),
        store.query(collection, "phoneNumber", phone_number),
    )?;

    debug!(
        "Uniqueness check: {} email matches, {} phone matches",
        by_email.len(),
        by_phone.len()
    );

    Ok(if !by_email.is_empty() {
        Uniqueness::DuplicateEmail
    } else if !by_phone.is_empty() {
        Uniqueness::DuplicatePhone
    } else {
        Uniqueness::Unique
    })
}
