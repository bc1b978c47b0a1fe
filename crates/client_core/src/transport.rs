//! Network collaborators of the workflow: the object store that receives
//! uploads and the backend that serves predictions.

use async_trait::async_trait;
use reqwest::{header, Client};
use shared::{
    domain::{BucketName, ObjectKey},
    error::ApiError,
    protocol::{get_prediction_route, PredictionResponse, StoredObjectSummary},
};
use tracing::debug;
use url::Url;

use crate::{
    config::ClientSettings,
    error::{PredictionFetchError, StorageWriteError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectRequest {
    pub bucket: BucketName,
    pub key: ObjectKey,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        request: PutObjectRequest,
    ) -> Result<StoredObjectSummary, StorageWriteError>;
}

#[async_trait]
pub trait PredictionSource: Send + Sync {
    async fn fetch_prediction(&self) -> Result<PredictionResponse, PredictionFetchError>;
}

/// Shared HTTP client; every request made through it is bounded by the
/// configured timeout.
pub fn http_client(settings: &ClientSettings) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(settings.request_timeout())
        .build()
}

/// Writes objects through the backend's storage proxy, so no storage
/// credentials ever live on the client.
#[derive(Clone)]
pub struct HttpObjectStore {
    http: Client,
    server_url: Url,
}

impl HttpObjectStore {
    pub fn new(http: Client, server_url: Url) -> Self {
        Self { http, server_url }
    }

    fn object_url(&self, bucket: &BucketName, key: &ObjectKey) -> Result<Url, StorageWriteError> {
        let mut url = self.server_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StorageWriteError::Transport(format!(
                    "server url '{}' cannot carry a path",
                    self.server_url
                ))
            })?
            .pop_if_empty()
            .extend(["buckets", bucket.as_str(), "objects", key.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put_object(
        &self,
        request: PutObjectRequest,
    ) -> Result<StoredObjectSummary, StorageWriteError> {
        let url = self.object_url(&request.bucket, &request.key)?;
        debug!(%url, size = request.bytes.len(), "storage: put object");
        let response = self
            .http
            .put(url)
            .header(header::CONTENT_TYPE, request.content_type)
            .body(request.bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|api| api.message)
                .unwrap_or(body);
            return Err(StorageWriteError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<StoredObjectSummary>()
            .await
            .map_err(|err| StorageWriteError::InvalidResponse(err.to_string()))
    }
}

#[derive(Clone)]
pub struct HttpPredictionSource {
    http: Client,
    endpoint: Url,
}

impl HttpPredictionSource {
    pub fn new(http: Client, server_url: &Url) -> Result<Self, url::ParseError> {
        let mut endpoint = server_url.clone();
        endpoint
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(get_prediction_route().trim_start_matches('/'));
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl PredictionSource for HttpPredictionSource {
    async fn fetch_prediction(&self) -> Result<PredictionResponse, PredictionFetchError> {
        let response = self.http.get(self.endpoint.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PredictionFetchError::Status {
                status: status.as_u16(),
            });
        }
        response
            .json::<PredictionResponse>()
            .await
            .map_err(|err| PredictionFetchError::InvalidResponse(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_urls_escape_keys_as_single_segments() {
        let store = HttpObjectStore::new(
            Client::new(),
            Url::parse("http://127.0.0.1:3001/").expect("url"),
        );
        let url = store
            .object_url(&BucketName::from("frubucket"), &ObjectKey::from("my apple/1.jpg"))
            .expect("url");
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:3001/buckets/frubucket/objects/my%20apple%2F1.jpg"
        );
    }

    #[test]
    fn prediction_endpoint_is_rooted_at_server() {
        let source = HttpPredictionSource::new(
            Client::new(),
            &Url::parse("http://localhost:5000").expect("url"),
        )
        .expect("source");
        assert_eq!(source.endpoint().as_str(), "http://localhost:5000/get-prediction");
    }

    #[test]
    fn prefixed_server_url_keeps_base_path_for_both_routes() {
        let base = Url::parse("http://h:3001/fruit/").expect("url");
        let store = HttpObjectStore::new(Client::new(), base.clone());
        let put = store
            .object_url(&BucketName::from("frubucket"), &ObjectKey::from("a.jpg"))
            .expect("url");
        assert_eq!(put.as_str(), "http://h:3001/fruit/buckets/frubucket/objects/a.jpg");

        let source = HttpPredictionSource::new(Client::new(), &base).expect("source");
        assert_eq!(source.endpoint().as_str(), "http://h:3001/fruit/get-prediction");

        let unslashed = Url::parse("http://h:3001/fruit").expect("url");
        let source = HttpPredictionSource::new(Client::new(), &unslashed).expect("source");
        assert_eq!(source.endpoint().as_str(), "http://h:3001/fruit/get-prediction");
    }

    #[test]
    fn prediction_endpoint_needs_a_base_url() {
        let err = HttpPredictionSource::new(
            Client::new(),
            &Url::parse("mailto:someone@example.com").expect("url"),
        )
        .err();
        assert_eq!(err, Some(url::ParseError::RelativeUrlWithCannotBeABaseBase));
    }
}
