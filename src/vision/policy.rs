// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Top-1 decision with a fixed confidence threshold

use serde::{Deserialize, Serialize};

use super::labels::LabelTable;

/// Threshold the shipped model was tuned for
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Message shown when nothing clears the threshold
pub const NOT_RECOGNIZED: &str = "Heritage not recognized";

/// Top-1 label (when recognized) and its probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Option<String>,
    pub index: Option<usize>,
    pub confidence: f32,
    pub message: String,
}

impl Prediction {
    pub fn is_recognized(&self) -> bool {
        self.label.is_some()
    }

    fn not_recognized(confidence: f32) -> Self {
        Self {
            label: None,
            index: None,
            confidence,
            message: NOT_RECOGNIZED.to_string(),
        }
    }
}

/// Index and value of the largest entry; ties go to the earliest index.
/// `None` for an empty vector or one containing NaN.
pub fn argmax(probabilities: &[f32]) -> Option<(usize, f32)> {
    if probabilities.iter().any(|p| p.is_nan()) {
        return None;
    }
    probabilities
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, p)| match best {
            Some((_, top)) if p <= top => best,
            _ => Some((i, p)),
        })
}

/// Recognized only when the top probability strictly exceeds `threshold`
pub fn decide(probabilities: &[f32], labels: &LabelTable, threshold: f32) -> Prediction {
    let Some((index, confidence)) = argmax(probabilities) else {
        return Prediction::not_recognized(0.0);
    };

    match labels.get(index) {
        Some(label) if confidence > threshold => Prediction {
            label: Some(label.to_string()),
            index: Some(index),
            confidence,
            message: format!("{} has been recognized", label),
        },
        _ => Prediction::not_recognized(confidence),
    }
}
