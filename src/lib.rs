// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Turath: Heritage Recognition & Sign-up Core
//!
//! Decision logic behind two screens of a heritage guide app: account sign-up
//! against a hosted identity service and a document store, and photo
//! classification against a served image model with metadata lookup.

pub mod auth;
pub mod config;
pub mod db;
pub mod download;
pub mod error;
pub mod gate;
pub mod signup;
pub mod vision;
pub mod web;

pub use config::AppConfig;
pub use error::{Result, TurathError};
