// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Descriptive metadata lookup for recognized labels

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::db::{Document, DocumentStore};
use crate::Result;

/// Shown when the store has nothing (or no description) for a label
pub const NO_INFORMATION: &str = "No additional information found";

/// Shown when the lookup itself failed
pub const LOOKUP_FAILED: &str = "Error fetching additional information";

/// A heritage site or artifact description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeritageRecord {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    /// Image URL
    #[serde(rename = "Image", default)]
    pub image: Option<String>,
}

/// Text to show under the result plus every matching record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub info: String,
    pub records: Vec<HeritageRecord>,
}

/// Looks up records whose `Id` equals the predicted label
pub struct MetadataEnricher {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl MetadataEnricher {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Query the store; failures become [`LOOKUP_FAILED`] with no records
    pub async fn enrich(&self, label: &str) -> Enrichment {
        match self.store.query(&self.collection, "Id", label).await {
            Ok(documents) => {
                debug!("Found {} records for '{}'", documents.len(), label);
                let info = documents
                    .first()
                    .and_then(|doc| doc.get("Description"))
                    .and_then(Value::as_str)
                    .filter(|d| !d.is_empty())
                    .unwrap_or(NO_INFORMATION)
                    .to_string();
                let records = documents.into_iter().filter_map(to_record).collect();
                Enrichment { info, records }
            }
            Err(e) => {
                error!("Fetching information for '{}' failed: {}", label, e);
                Enrichment {
                    info: LOOKUP_FAILED.to_string(),
                    records: Vec::new(),
                }
            }
        }
    }

    /// Matching records in store order, skipping documents without a string `Id`
    pub async fn lookup(&self, label: &str) -> Result<Vec<HeritageRecord>> {
        let documents = self.store.query(&self.collection, "Id", label).await?;
        Ok(documents.into_iter().filter_map(to_record).collect())
    }
}

/// Fields of the wrong type are read as absent
fn to_record(document: Document) -> Option<HeritageRecord> {
    let text = |key: &str| document.get(key).and_then(Value::as_str).map(str::to_string);
    let Some(id) = text("Id") else {
        warn!("Skipping record without a string Id: {:?}", document.get("Id"));
        return None;
    };
    Some(HeritageRecord {
        id,
        name: text("Name"),
        description: text("Description"),
        image: text("Image"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::TurathError;
    use async_trait::async_trait;
    use serde_json::json;

    fn enricher_with(records: &[serde_json::Value]) -> MetadataEnricher {
        let db = Database::in_memory().unwrap();
        for (i, record) in records.iter().enumerate() {
            db.put_document("model", &format!("doc{}", i), record.as_object().unwrap()).unwrap();
        }
        MetadataEnricher::new(Arc::new(db), "model")
    }

    struct BrokenStore;

    #[async_trait]
    impl DocumentStore for BrokenStore {
        async fn query(&self, _collection: &str, _field: &str, _value: &str) -> Result<Vec<Document>> {
            Err(TurathError::Query("unavailable".to_string()))
        }

        async fn write_document(&self, _collection: &str, _id: &str, _fields: Document) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_no_documents() {
        let enricher = enricher_with(&[]);
        let result = enricher.enrich("Camel statue").await;
        assert_eq!(result.info, "No additional information found");
        assert!(result.records.is_empty());
    }

    #[tokio::test]
    async fn test_first_description_wins_and_all_records_returned() {
        let enricher = enricher_with(&[
            json!({"Id": "Camel statue", "Name": "Camel", "Description": "Found in Tayma", "Image": "https://img/1.jpg"}),
            json!({"Id": "Camel statue", "Name": "Camel (replica)", "Description": "Museum copy"}),
            json!({"Id": "Uhud Castle", "Description": "Unrelated"}),
        ]);

        let result = enricher.enrich("Camel statue").await;
        assert_eq!(result.info, "Found in Tayma");
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].image.as_deref(), Some("https://img/1.jpg"));
        assert_eq!(result.records[1].name.as_deref(), Some("Camel (replica)"));
    }

    #[tokio::test]
    async fn test_empty_description_falls_back() {
        let enricher = enricher_with(&[json!({"Id": "Uhud Castle", "Description": ""})]);
        let result = enricher.enrich("Uhud Castle").await;
        assert_eq!(result.info, NO_INFORMATION);
        assert_eq!(result.records.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_sibling_does_not_hide_description() {
        let enricher = enricher_with(&[
            json!({"Id": "Uhud Castle", "Description": "Mountain fort"}),
            json!({"Id": "Uhud Castle", "Name": 7, "Image": ["a", "b"]}),
        ]);

        let result = enricher.enrich("Uhud Castle").await;
        assert_eq!(result.info, "Mountain fort");
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].name, None);
        assert_eq!(result.records[1].image, None);

        let records = enricher.lookup("Uhud Castle").await.unwrap();
        assert_eq!(records, result.records);
    }

    #[tokio::test]
    async fn test_non_string_description_falls_back() {
        let enricher = enricher_with(&[json!({"Id": "Aaref Castle", "Description": 42})]);
        let result = enricher.enrich("Aaref Castle").await;
        assert_eq!(result.info, NO_INFORMATION);
        assert_eq!(result.records[0].description, None);
    }

    #[tokio::test]
    async fn test_store_failure_is_downgraded() {
        let enricher = MetadataEnricher::new(Arc::new(BrokenStore), "model");
        let result = enricher.enrich("Uhud Castle").await;
        assert_eq!(result.info, "Error fetching additional information");
        assert!(result.records.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_lookups_are_identical() {
        let enricher = enricher_with(&[json!({"Id": "Aaref Castle", "Description": "Hail"})]);
        let first = enricher.enrich("Aaref Castle").await;
        let second = enricher.enrich("Aaref Castle").await;
        assert_eq!(first, second);
    }
}
