use std::sync::{Arc, Mutex, MutexGuard};

use grainstore_core::{PersistedDocument, Revision};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header::IF_MATCH};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    config::StorageConfig,
    store::{DocumentStore, StoreError},
};

const ERROR_CONFLICT: u32 = 1200;
const ERROR_DOCUMENT_NOT_FOUND: u32 = 1202;
const ERROR_COLLECTION_NOT_FOUND: u32 = 1203;
const ERROR_DUPLICATE_NAME: u32 = 1207;
const ERROR_UNIQUE_CONSTRAINT: u32 = 1210;

/// A [`DocumentStore`] talking to an ArangoDB server over its HTTP API.
///
/// Each actor type gets a document collection in the configured database;
/// documents are written with `waitForSync` as configured. Clones share the
/// underlying connection pool, and closing any clone closes it for all of
/// them.
#[derive(Clone)]
pub struct ArangoDocumentStore {
    client: Arc<Mutex<Option<Client>>>,
    base: Url,
    database_name: String,
    username: String,
    password: String,
    wait_for_sync: bool,
}

impl std::fmt::Debug for ArangoDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArangoDocumentStore")
            .field("url", &self.base.as_str())
            .field("database_name", &self.database_name)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct CollectionList {
    result: Vec<CollectionInfo>,
}

#[derive(Deserialize)]
struct CollectionInfo {
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCollection<'a> {
    name: &'a str,
    wait_for_sync: bool,
}

#[derive(Serialize)]
struct DocumentBody<'a> {
    #[serde(rename = "_key")]
    key: &'a str,
    state: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct WriteResult {
    #[serde(rename = "_rev")]
    rev: Revision,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorNum", default)]
    error_num: u32,
    #[serde(rename = "errorMessage", default)]
    error_message: String,
}

/// What a failed request was operating on
#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    Database,
    Collection(&'a str),
    Document {
        collection: &'a str,
        key: &'a str,
        expected: Option<&'a Revision>,
    },
}

impl ArangoDocumentStore {
    pub fn new(config: &StorageConfig) -> Result<Self, StoreError> {
        if config.url.cannot_be_a_base() {
            return Err(StoreError::Transport(format!(
                "{} is not a base URL",
                config.url
            )));
        }
        let client = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            client: Arc::new(Mutex::new(Some(client))),
            base: config.url.clone(),
            database_name: config.database_name.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            wait_for_sync: config.wait_for_sync,
        })
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Transport(format!("{} is not a base URL", self.base)))?
            .pop_if_empty()
            .push("_db")
            .push(&self.database_name)
            .push("_api")
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn lock_client(&self) -> MutexGuard<'_, Option<Client>> {
        self.client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, StoreError> {
        let client = self
            .lock_client()
            .clone()
            .ok_or_else(|| StoreError::Transport("connection closed".to_string()))?;
        Ok(client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password)))
    }

    fn wait_for_sync(&self) -> &'static str {
        if self.wait_for_sync { "true" } else { "false" }
    }

    async fn send(request: RequestBuilder) -> Result<Response, StoreError> {
        request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed(e.to_string()))
    }

    async fn error(response: Response, target: Target<'_>) -> StoreError {
        let status = response.status();
        match response.bytes().await {
            Ok(body) => classify(status, &body, target),
            Err(e) => StoreError::Transport(e.to_string()),
        }
    }
}

/// Map an error response onto a [`StoreError`]
fn classify(status: StatusCode, body: &[u8], target: Target<'_>) -> StoreError {
    let (error_num, message) = match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody {
            error_num,
            error_message,
        }) => (error_num, error_message),
        Err(_) => (0, String::from_utf8_lossy(body).into_owned()),
    };

    match (error_num, target) {
        (ERROR_DUPLICATE_NAME, Target::Collection(name)) => {
            StoreError::DuplicateName(name.to_string())
        }
        (ERROR_COLLECTION_NOT_FOUND, Target::Collection(name))
        | (ERROR_COLLECTION_NOT_FOUND, Target::Document { collection: name, .. }) => {
            StoreError::CollectionNotFound(name.to_string())
        }
        (ERROR_UNIQUE_CONSTRAINT, Target::Document { collection, key, .. }) => {
            StoreError::UniqueConstraint {
                collection: collection.to_string(),
                key: key.to_string(),
            }
        }
        (ERROR_DOCUMENT_NOT_FOUND, Target::Document { collection, key, .. }) => {
            StoreError::DocumentNotFound {
                collection: collection.to_string(),
                key: key.to_string(),
            }
        }
        (
            _,
            Target::Document {
                collection,
                key,
                expected: Some(expected),
            },
        ) if error_num == ERROR_CONFLICT || status == StatusCode::PRECONDITION_FAILED => {
            StoreError::Conflict {
                collection: collection.to_string(),
                key: key.to_string(),
                expected: expected.clone(),
            }
        }
        _ => StoreError::Server {
            code: status.as_u16(),
            error_num,
            message,
        },
    }
}

impl DocumentStore for ArangoDocumentStore {
    #[tracing::instrument(skip(self), level = "trace", err)]
    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let url = self.endpoint(&["collection"], &[("excludeSystem", "true")])?;
        let response = Self::send(self.request(Method::GET, url)?).await?;
        if !response.status().is_success() {
            return Err(Self::error(response, Target::Database).await);
        }
        let CollectionList { result } = Self::parse(response).await?;
        Ok(result.into_iter().map(|c| c.name).collect())
    }

    #[tracing::instrument(skip(self), level = "trace", err)]
    async fn create_collection(&self, name: &str, wait_for_sync: bool) -> Result<(), StoreError> {
        let url = self.endpoint(&["collection"], &[])?;
        let body = CreateCollection {
            name,
            wait_for_sync,
        };
        let response = Self::send(self.request(Method::POST, url)?.json(&body)).await?;
        if !response.status().is_success() {
            return Err(Self::error(response, Target::Collection(name)).await);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "trace", err)]
    async fn document(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<PersistedDocument>, StoreError> {
        let url = self.endpoint(&["document", collection, key], &[])?;
        let response = Self::send(self.request(Method::GET, url)?).await?;
        if response.status().is_success() {
            return Self::parse(response).await.map(Some);
        }
        let target = Target::Document {
            collection,
            key,
            expected: None,
        };
        match Self::error(response, target).await {
            StoreError::DocumentNotFound { .. } => Ok(None),
            other => Err(other),
        }
    }

    #[tracing::instrument(skip(self, document), fields(key = %document.id), level = "trace", err)]
    async fn insert(
        &self,
        collection: &str,
        document: &PersistedDocument,
    ) -> Result<Revision, StoreError> {
        let url = self.endpoint(
            &["document", collection],
            &[("waitForSync", self.wait_for_sync())],
        )?;
        let body = DocumentBody {
            key: &document.id,
            state: &document.state,
        };
        let response = Self::send(self.request(Method::POST, url)?.json(&body)).await?;
        if !response.status().is_success() {
            let target = Target::Document {
                collection,
                key: &document.id,
                expected: None,
            };
            return Err(Self::error(response, target).await);
        }
        let WriteResult { rev } = Self::parse(response).await?;
        Ok(rev)
    }

    #[tracing::instrument(skip(self, document), level = "trace", err)]
    async fn update(
        &self,
        collection: &str,
        key: &str,
        document: &PersistedDocument,
        expected: &Revision,
    ) -> Result<Revision, StoreError> {
        let url = self.endpoint(
            &["document", collection, key],
            &[
                ("waitForSync", self.wait_for_sync()),
                ("mergeObjects", "false"),
                ("ignoreRevs", "false"),
            ],
        )?;
        let body = DocumentBody {
            key,
            state: &document.state,
        };
        let request = self
            .request(Method::PATCH, url)?
            .header(IF_MATCH, expected.as_str())
            .json(&body);
        let response = Self::send(request).await?;
        if !response.status().is_success() {
            let target = Target::Document {
                collection,
                key,
                expected: Some(expected),
            };
            return Err(Self::error(response, target).await);
        }
        let WriteResult { rev } = Self::parse(response).await?;
        Ok(rev)
    }

    #[tracing::instrument(skip(self), level = "trace", err)]
    async fn remove(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let url = self.endpoint(
            &["document", collection, key],
            &[("waitForSync", self.wait_for_sync())],
        )?;
        let response = Self::send(self.request(Method::DELETE, url)?).await?;
        if !response.status().is_success() {
            let target = Target::Document {
                collection,
                key,
                expected: None,
            };
            return Err(Self::error(response, target).await);
        }
        Ok(())
    }

    async fn close(&self) {
        // Dropping the client releases its pool once in-flight requests finish
        if self.lock_client().take().is_some() {
            tracing::debug!(url = %self.base, "closed arango document store");
        }
    }
}
