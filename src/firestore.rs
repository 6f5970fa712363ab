//! Firestore REST backend for the uploader

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::upload::{DocumentStore, RemoteDocument};

const FIRESTORE_API_URL: &str = "https://firestore.googleapis.com";

/// The parts of a service account key file we need
#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    project_id: String,
    #[serde(default)]
    client_email: Option<String>,
}

// Firestore commit API types
#[derive(Debug, Serialize)]
struct CommitRequest {
    writes: Vec<FirestoreWrite>,
}

#[derive(Debug, Serialize)]
struct FirestoreWrite {
    /// An update without a field mask replaces the whole document
    update: FirestoreDocument,
}

#[derive(Debug, Serialize)]
struct FirestoreDocument {
    name: String,
    fields: BTreeMap<String, FirestoreValue>,
}

#[derive(Debug, Serialize)]
struct FirestoreValue {
    #[serde(rename = "stringValue")]
    string_value: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(rename = "writeResults", default)]
    write_results: Vec<serde_json::Value>,
    error: Option<FirestoreError>,
}

#[derive(Debug, Deserialize)]
struct FirestoreError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn get_access_token() -> Option<String> {
    std::env::var("FIRESTORE_ACCESS_TOKEN")
        .or_else(|_| std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN"))
        .ok()
        .filter(|t| !t.trim().is_empty())
}

/// Firestore database, written through the `documents:commit` endpoint
pub struct FirestoreStore {
    client: reqwest::blocking::Client,
    base_url: String,
    project_id: String,
    access_token: Option<String>,
}

impl FirestoreStore {
    /// Connect using the project from a service account key file.
    ///
    /// Uses `FIRESTORE_EMULATOR_HOST` when set; otherwise an OAuth access token
    /// must be provided in `FIRESTORE_ACCESS_TOKEN` or `GOOGLE_OAUTH_ACCESS_TOKEN`.
    pub fn from_credentials(credentials_path: &Path, user_agent: &str) -> Result<Self> {
        let content = fs::read_to_string(credentials_path).with_context(|| {
            format!("Failed to read credentials: {}", credentials_path.display())
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&content).with_context(|| {
            format!("Failed to parse credentials: {}", credentials_path.display())
        })?;
        debug!(
            project = %key.project_id,
            account = key.client_email.as_deref().unwrap_or("-"),
            "loaded service account"
        );

        let access_token = get_access_token();
        let base_url = match std::env::var("FIRESTORE_EMULATOR_HOST") {
            Ok(host) if !host.is_empty() => format!("http://{}", host),
            _ => {
                if access_token.is_none() {
                    bail!(
                        "FIRESTORE_ACCESS_TOKEN or GOOGLE_OAUTH_ACCESS_TOKEN environment variable must be set"
                    );
                }
                FIRESTORE_API_URL.to_string()
            }
        };

        Self::with_endpoint(&base_url, &key.project_id, access_token, user_agent)
    }

    pub fn with_endpoint(
        base_url: &str,
        project_id: &str,
        access_token: Option<String>,
        user_agent: &str,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            access_token,
        })
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    fn commit_url(&self) -> String {
        format!("{}/v1/{}/documents:commit", self.base_url, self.database_path())
    }

    fn commit_request(&self, collection: &str, batch: &[RemoteDocument]) -> CommitRequest {
        let database = self.database_path();
        let writes = batch
            .iter()
            .map(|doc| FirestoreWrite {
                update: FirestoreDocument {
                    name: format!("{}/documents/{}/{}", database, collection, doc.key),
                    fields: doc
                        .fields
                        .iter()
                        .map(|(k, v)| {
                            (
                                k.clone(),
                                FirestoreValue {
                                    string_value: v.clone(),
                                },
                            )
                        })
                        .collect(),
                },
            })
            .collect();
        CommitRequest { writes }
    }
}

impl DocumentStore for FirestoreStore {
    fn commit(&mut self, collection: &str, batch: &[RemoteDocument]) -> Result<()> {
        let request = self.commit_request(collection, batch);
        let url = self.commit_url();

        let mut builder = self.client.post(&url).json(&request);
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .context("Failed to send commit to Firestore")?;
        let status = response.status();
        let text = response
            .text()
            .context("Failed to read Firestore response")?;

        if !status.is_success() {
            let message = serde_json::from_str::<CommitResponse>(&text)
                .ok()
                .and_then(|r| r.error)
                .map(|e| format!("{} ({})", e.message, e.status.unwrap_or_default()))
                .unwrap_or(text);
            bail!("Firestore commit failed with {}: {}", status, message);
        }

        let parsed: CommitResponse =
            serde_json::from_str(&text).context("Failed to parse Firestore response JSON")?;
        if parsed.write_results.len() != batch.len() {
            bail!(
                "Firestore applied {} of {} writes",
                parsed.write_results.len(),
                batch.len()
            );
        }
        debug!(writes = batch.len(), "batch committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(key: &str) -> RemoteDocument {
        let mut fields = BTreeMap::new();
        fields.insert("tithi".to_string(), "Trayodashi".to_string());
        fields.insert("sunrise".to_string(), "6:49 am".to_string());
        RemoteDocument {
            key: key.to_string(),
            fields,
        }
    }

    #[test]
    fn test_commit_request_shape() {
        let store =
            FirestoreStore::with_endpoint("http://localhost:8080/", "demo-panchanga", None, "test")
                .unwrap();
        assert_eq!(
            store.commit_url(),
            "http://localhost:8080/v1/projects/demo-panchanga/databases/(default)/documents:commit"
        );

        let request = store.commit_request("panchanga_data", &[doc("2026-01-01"), doc("2026-01-02")]);
        let json = serde_json::to_value(&request).unwrap();
        let writes = json["writes"].as_array().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(
            writes[0]["update"]["name"],
            "projects/demo-panchanga/databases/(default)/documents/panchanga_data/2026-01-01"
        );
        assert_eq!(
            writes[1]["update"]["fields"]["sunrise"]["stringValue"],
            "6:49 am"
        );
        assert!(writes[0].get("updateMask").is_none());
    }

    #[test]
    fn test_service_account_key_parsing() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{"type": "service_account", "project_id": "panchanga-app", "client_email": "loader@panchanga-app.iam.gserviceaccount.com", "private_key": "..."}"#,
        )
        .unwrap();
        assert_eq!(key.project_id, "panchanga-app");
        assert!(key.client_email.is_some());
    }

    #[test]
    fn test_missing_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FirestoreStore::from_credentials(&dir.path().join("nope.json"), "test")
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to read credentials"));
    }

    #[test]
    fn test_commit_error_response_parsing() {
        let parsed: CommitResponse = serde_json::from_str(
            r#"{"error": {"code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED"}}"#,
        )
        .unwrap();
        let error = parsed.error.unwrap();
        assert_eq!(error.status.as_deref(), Some("PERMISSION_DENIED"));
        assert!(parsed.write_results.is_empty());
    }
}
