//! REST client for the hosted Firestore document database.
//!
//! This module provides the `FirestoreClient` struct, the production
//! implementation of `DocumentStore`. Requests are authenticated with the
//! ID token of the signed-in staff member.

use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::value::{decode_fields, encode_fields, encode_operand};
use super::{Document, DocumentStore, Filter, FilterOp, StoreError, Write};

// ============================================================================
// Constants
// ============================================================================

/// Production endpoint. Overridable for the local emulator.
pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Page size for collection listing
const LIST_PAGE_SIZE: usize = 300;

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<RawDocument>,
}

/// Document store client for Firestore.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct FirestoreClient {
    client: Client,
    base_url: String,
    project_id: String,
    token: Option<String>,
}

impl FirestoreClient {
    /// Create a new client for the given project
    pub fn new(project_id: &str, base_url: Option<&str>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Resource path of the database root, e.g. `projects/p/databases/(default)/documents`
    fn root_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.root_path(), collection, id)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, StoreError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| StoreError::InvalidResponse(format!("invalid token header: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::from_status(status, &body))
        }
    }

    fn into_document(raw: RawDocument) -> Result<Document, StoreError> {
        let id = raw
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(Document::new(id, decode_fields(&raw.fields)?))
    }

    fn filter_json(filter: &Filter) -> Value {
        let op = match filter.op {
            FilterOp::Eq => "EQUAL",
            FilterOp::Gte => "GREATER_THAN_OR_EQUAL",
            FilterOp::Lte => "LESS_THAN_OR_EQUAL",
        };
        json!({
            "fieldFilter": {
                "field": { "fieldPath": filter.field },
                "op": op,
                "value": encode_operand(&filter.value),
            }
        })
    }

    fn structured_query(collection: &str, filters: &[Filter], limit: Option<usize>) -> Value {
        let mut query = json!({ "from": [ { "collectionId": collection } ] });

        let condition = match filters {
            [] => None,
            [single] => Some(Self::filter_json(single)),
            many => Some(json!({
                "compositeFilter": {
                    "op": "AND",
                    "filters": many.iter().map(Self::filter_json).collect::<Vec<_>>(),
                }
            })),
        };
        if let Some(condition) = condition {
            query["where"] = condition;
        }
        if let Some(limit) = limit {
            query["limit"] = json!(limit);
        }
        json!({ "structuredQuery": query })
    }

    fn write_json(&self, write: &Write) -> Value {
        match write {
            Write::Set {
                collection,
                id,
                fields,
                merge,
            } => {
                let mut w = json!({
                    "update": {
                        "name": self.document_name(collection, id),
                        "fields": encode_fields(fields),
                    }
                });
                if *merge {
                    w["updateMask"] = json!({ "fieldPaths": fields.keys().collect::<Vec<_>>() });
                }
                w
            }
            Write::Update {
                collection,
                id,
                fields,
            } => json!({
                "update": {
                    "name": self.document_name(collection, id),
                    "fields": encode_fields(fields),
                },
                "updateMask": { "fieldPaths": fields.keys().collect::<Vec<_>>() },
                "currentDocument": { "exists": true },
            }),
            Write::Delete { collection, id } => json!({
                "delete": self.document_name(collection, id),
            }),
        }
    }
}

impl DocumentStore for FirestoreClient {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let url = self.url(&self.document_name(collection, id));
        debug!(collection, id, "Fetching document");

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check_response(response).await?;
        let raw: RawDocument = response.json().await?;
        Ok(Some(Self::into_document(raw)?))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let url = self.url(&format!("{}/{}", self.root_path(), collection));
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .headers(self.auth_headers()?)
                .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = Self::check_response(request.send().await?).await?;
            let page: ListResponse = response.json().await?;
            debug!(collection, count = page.documents.len(), "Listed document page");

            for raw in page.documents {
                documents.push(Self::into_document(raw)?);
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: Option<usize>,
    ) -> Result<Vec<Document>, StoreError> {
        let url = self.url(&format!("{}:runQuery", self.root_path()));
        let body = Self::structured_query(collection, filters, limit);
        debug!(collection, filters = filters.len(), "Running query");

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        // runQuery answers with one item per result, plus a trailing item
        // carrying only a readTime when the result set is empty.
        let items: Vec<RunQueryItem> = response.json().await?;
        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(Self::into_document)
            .collect()
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        let url = self.url(&format!("{}:commit", self.root_path()));
        let body = json!({
            "writes": writes.iter().map(|w| self.write_json(w)).collect::<Vec<_>>(),
        });
        debug!(count = writes.len(), "Committing batch");

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
