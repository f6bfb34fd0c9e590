// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Turath

use thiserror::Error;

use crate::auth::AuthError;

/// Result type alias for Turath operations
pub type Result<T> = std::result::Result<T, TurathError>;

/// Turath error types
#[derive(Error, Debug)]
pub enum TurathError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Query error: {0}")]
    Query(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Model not loaded yet")]
    ModelNotReady(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Label table error: {0}")]
    Labels(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Download error: {0}")]
    Download(String),
}
