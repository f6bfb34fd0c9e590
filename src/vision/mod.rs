// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Heritage recognition: preprocessing, inference, threshold decision and
//! metadata lookup

pub mod enrich;
pub mod labels;
pub mod model;
pub mod policy;
pub mod preprocess;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::ModelConfig;
use crate::gate::InFlight;
use crate::{Result, TurathError};

pub use enrich::{Enrichment, HeritageRecord, MetadataEnricher};
pub use labels::LabelTable;
pub use model::{ModelRuntime, ModelSlot, ServingClient};
pub use policy::{decide, Prediction};
pub use preprocess::Tensor;

pub const MODEL_NOT_READY: &str = "Model not loaded yet";
pub const NO_IMAGE: &str = "No image picked or missing base64 data";
pub const PREDICTION_FAILED: &str = "An error occurred during prediction";
pub const BUSY: &str = "A classification is already running";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationStatus {
    Recognized,
    NotRecognized,
    ModelNotReady,
    NoImage,
    Failed,
    Busy,
}

/// What the capture screen shows after one classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub status: ClassificationStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<HeritageRecord>,
    /// blake3 of the encoded payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_hash: Option<String>,
}

impl ClassificationOutcome {
    fn plain(status: ClassificationStatus, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
            prediction: None,
            additional_info: None,
            records: Vec::new(),
            image_hash: None,
        }
    }

    fn hashed(mut self, hash: &str) -> Self {
        self.image_hash = Some(hash.to_string());
        self
    }
}

/// Upload-and-capture screen logic
pub struct Classifier {
    model: Arc<ModelSlot>,
    labels: Arc<LabelTable>,
    enricher: MetadataEnricher,
    input_size: u32,
    threshold: f32,
    in_flight: InFlight,
}

impl Classifier {
    pub fn new(
        model: Arc<ModelSlot>,
        labels: Arc<LabelTable>,
        enricher: MetadataEnricher,
        config: &ModelConfig,
    ) -> Self {
        Self {
            model,
            labels,
            enricher,
            input_size: config.input_size,
            threshold: config.threshold,
            in_flight: InFlight::new(),
        }
    }

    pub fn model(&self) -> &Arc<ModelSlot> {
        &self.model
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn enricher(&self) -> &MetadataEnricher {
        &self.enricher
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// A classification is in progress
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_busy()
    }

    /// Classify a picker payload given as base64 text
    pub async fn classify_base64(&self, text: &str) -> ClassificationOutcome {
        let Some(_guard) = self.in_flight.try_begin() else {
            return ClassificationOutcome::plain(ClassificationStatus::Busy, BUSY);
        };
        self.evaluate_base64(text).await
    }

    /// Classify an encoded image (JPEG, PNG, ...), one at a time
    pub async fn classify(&self, payload: &[u8]) -> ClassificationOutcome {
        let Some(_guard) = self.in_flight.try_begin() else {
            return ClassificationOutcome::plain(ClassificationStatus::Busy, BUSY);
        };
        self.evaluate(payload).await
    }

    /// [`classify_base64`](Self::classify_base64) without the in-flight gate
    pub async fn evaluate_base64(&self, text: &str) -> ClassificationOutcome {
        if text.trim().is_empty() {
            return ClassificationOutcome::plain(ClassificationStatus::NoImage, NO_IMAGE);
        }
        match preprocess::decode_base64(text) {
            Ok(bytes) => self.evaluate(&bytes).await,
            Err(e) => {
                error!("Prediction failed on undecodable base64: {}", e);
                ClassificationOutcome::plain(ClassificationStatus::Failed, PREDICTION_FAILED)
            }
        }
    }

    /// [`classify`](Self::classify) without the in-flight gate, for callers
    /// that each own their outcome (one per HTTP request)
    pub async fn evaluate(&self, payload: &[u8]) -> ClassificationOutcome {
        if payload.is_empty() {
            return ClassificationOutcome::plain(ClassificationStatus::NoImage, NO_IMAGE);
        }

        let Some(runtime) = self.model.get() else {
            info!("Classification requested before the model finished loading");
            return ClassificationOutcome::plain(ClassificationStatus::ModelNotReady, MODEL_NOT_READY);
        };

        let hash = blake3::hash(payload).to_hex().to_string();
        debug!("Classifying {} bytes (blake3 {})", payload.len(), hash);

        let probabilities = match self.infer(runtime.as_ref(), payload).await {
            Ok(p) => p,
            Err(e) => {
                error!("Prediction failed for {}: {}", hash, e);
                return ClassificationOutcome::plain(ClassificationStatus::Failed, PREDICTION_FAILED)
                    .hashed(&hash);
            }
        };

        let prediction = decide(&probabilities, &self.labels, self.threshold);
        info!("{} (confidence {:.4})", prediction.message, prediction.confidence);

        let Some(label) = prediction.label.clone() else {
            return ClassificationOutcome {
                status: ClassificationStatus::NotRecognized,
                message: prediction.message.clone(),
                prediction: Some(prediction),
                additional_info: None,
                records: Vec::new(),
                image_hash: Some(hash),
            };
        };

        let enrichment = self.enricher.enrich(&label).await;
        ClassificationOutcome {
            status: ClassificationStatus::Recognized,
            message: prediction.message.clone(),
            prediction: Some(prediction),
            additional_info: Some(enrichment.info),
            records: enrichment.records,
            image_hash: Some(hash),
        }
    }

    async fn infer(&self, runtime: &dyn ModelRuntime, payload: &[u8]) -> Result<Vec<f32>> {
        let img = preprocess::decode_image(payload)?;
        let tensor = preprocess::to_tensor(&img, self.input_size);
        let probabilities = runtime.predict(&tensor).await?;

        if probabilities.len() != self.labels.len() {
            return Err(TurathError::Inference(format!(
                "model '{}' returned {} classes, label table {} has {}",
                runtime.name(),
                probabilities.len(),
                self.labels.version,
                self.labels.len()
            )));
        }
        Ok(probabilities)
    }
}
