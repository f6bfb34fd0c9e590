// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Model runtime: load-once slot and a model-server client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::preprocess::{Tensor, CHANNELS};
use crate::config::ModelConfig;
use crate::{Result, TurathError};

/// A loaded classification model
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Model name for logs and status
    fn name(&self) -> &str;

    /// One forward pass; returns the class probabilities of the first batch entry
    async fn predict(&self, input: &Tensor) -> Result<Vec<f32>>;
}

/// Holds the model once loading has finished
#[derive(Default)]
pub struct ModelSlot {
    cell: OnceCell<Arc<dyn ModelRuntime>>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The model, or `None` while it is still loading
    pub fn get(&self) -> Option<Arc<dyn ModelRuntime>> {
        self.cell.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    /// Store a loaded model. Returns false if one was already installed.
    pub fn install(&self, runtime: Arc<dyn ModelRuntime>) -> bool {
        let name = runtime.name().to_string();
        match self.cell.set(runtime) {
            Ok(()) => {
                info!("Model '{}' loaded.", name);
                true
            }
            Err(_) => {
                warn!("Model already loaded, ignoring '{}'", name);
                false
            }
        }
    }

    /// Run `loader` on a background task and install its result
    pub fn load_in_background<F>(self: &Arc<Self>, loader: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<Arc<dyn ModelRuntime>>> + Send + 'static,
    {
        let slot = Arc::clone(self);
        tokio::spawn(async move {
            match loader.await {
                Ok(runtime) => {
                    slot.install(runtime);
                }
                Err(e) => error!("Model failed to load: {}", e),
            }
        })
    }
}

/// Client for a TensorFlow-Serving style REST model server
pub struct ServingClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<Vec<Vec<[f32; CHANNELS]>>>,
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct ServingError {
    error: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    model_version_status: Vec<VersionStatus>,
}

/// Load state of one model version on the server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionStatus {
    pub version: String,
    pub state: String,
}

impl ServingClient {
    /// Create a new model-server client
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        // Normalize URL
        let base_url = config.url
            .trim_end_matches('/')
            .trim_end_matches("/v1")
            .to_string();

        Ok(Self {
            client,
            base_url,
            model: config.name.clone(),
        })
    }

    /// Create a client and wait until the server reports the model available
    pub async fn connect(config: &ModelConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.wait_until_available(config.retries).await?;
        Ok(client)
    }

    /// Like [`connect`](Self::connect) but never gives up: after each
    /// exhausted round of retries it sleeps `pause` and starts another.
    /// Only an unusable configuration is returned as an error.
    pub async fn connect_persistent(config: &ModelConfig, pause: Duration) -> Result<Self> {
        let client = Self::new(config)?;
        let mut round: u64 = 1;
        while let Err(e) = client.wait_until_available(config.retries).await {
            warn!("Model '{}' still unavailable after round {}: {}", client.model, round, e);
            tokio::time::sleep(pause).await;
            round += 1;
        }
        Ok(client)
    }

    fn model_url(&self) -> String {
        format!("{}/v1/models/{}", self.base_url, self.model)
    }

    /// Version states reported by the server
    pub async fn status(&self) -> Result<Vec<VersionStatus>> {
        let response = self.client
            .get(self.model_url())
            .send()
            .await
            .map_err(|e| {
                TurathError::ModelNotReady(format!(
                    "Cannot connect to model server at {}: {}",
                    self.base_url, e
                ))
            })?;

        if !response.status().is_success() {
            return Err(TurathError::ModelNotReady(format!(
                "Model server returned status {} for '{}'",
                response.status(),
                self.model
            )));
        }

        let status: StatusResponse = response.json().await?;
        Ok(status.model_version_status)
    }

    /// Whether any version of the model is serving
    pub async fn is_available(&self) -> Result<bool> {
        let versions = self.status().await?;
        Ok(versions.iter().any(|v| v.state == "AVAILABLE"))
    }

    /// Poll readiness with exponential backoff
    pub async fn wait_until_available(&self, retries: u32) -> Result<()> {
        let mut last_error = None;

        for attempt in 0..=retries {
            if attempt > 0 {
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                warn!("Model '{}' not ready, retrying in {:?} (attempt {})", self.model, delay, attempt + 1);
                tokio::time::sleep(delay).await;
            }

            match self.is_available().await {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    last_error = Some(TurathError::ModelNotReady(format!(
                        "No available version of '{}'",
                        self.model
                    )));
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            TurathError::ModelNotReady("Unknown error".to_string())
        }))
    }
}

#[async_trait]
impl ModelRuntime for ServingClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn predict(&self, input: &Tensor) -> Result<Vec<f32>> {
        let instance = input.instance(0)
            .ok_or_else(|| TurathError::Inference("input tensor has no batch entries".to_string()))?;
        let request = PredictRequest { instances: vec![instance] };

        debug!("Sending predict request: model={} shape={:?}", self.model, input.shape());

        let response = self.client
            .post(format!("{}:predict", self.model_url()))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ServingError>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(TurathError::Inference(format!(
                "Model server returned status {}: {}",
                status, detail
            )));
        }

        let result: PredictResponse = response.json().await?;
        result.predictions
            .into_iter()
            .next()
            .ok_or_else(|| TurathError::Inference("model server returned no predictions".to_string()))
    }
}
