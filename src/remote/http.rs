//! HTTP client for the hosted document store.

use async_trait::async_trait;
use std::time::Duration;

use super::{RemoteDocument, RemoteError, RemoteStore};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Remote store backed by an HTTP document service.
///
/// - `PATCH {base}/{collection}/{id}` merge-writes a document
/// - `GET {base}/{collection}?updated_after={cursor}` reads a range
/// - `GET {base}/health` answers the reachability probe
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRemote {
    pub fn new(server_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(server_url),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

/// Accepts `host:port`, `http://...` or `https://...`; strips trailing
/// slashes so collection paths can be appended uniformly.
fn normalize_base_url(server_url: &str) -> String {
    let trimmed = server_url.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn write_merge(
        &self,
        collection: &str,
        doc_id: &str,
        document: &RemoteDocument,
    ) -> Result<(), RemoteError> {
        let path = format!("{}/{}", collection, doc_id);
        let response = self
            .authorize(self.client.patch(self.url(&path)))
            .timeout(REQUEST_TIMEOUT)
            .json(document)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::Status {
                status: response.status().as_u16(),
                path,
            });
        }
        Ok(())
    }

    async fn query_since(
        &self,
        collection: &str,
        updated_after: i64,
    ) -> Result<Vec<RemoteDocument>, RemoteError> {
        let response = self
            .authorize(self.client.get(self.url(collection)))
            .timeout(REQUEST_TIMEOUT)
            .query(&[("updated_after", updated_after)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::Status {
                status: response.status().as_u16(),
                path: collection.to_string(),
            });
        }

        Ok(response.json().await?)
    }

    async fn reachable(&self) -> bool {
        match self
            .client
            .get(self.url("health"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_host() {
        assert_eq!(
            normalize_base_url("localhost:8080"),
            "http://localhost:8080"
        );
    }

    #[test]
    fn test_normalize_keeps_scheme() {
        assert_eq!(
            normalize_base_url("https://sync.example.com"),
            "https://sync.example.com"
        );
    }

    #[test]
    fn test_normalize_strips_trailing_slash() {
        assert_eq!(
            normalize_base_url("http://localhost:8080/"),
            "http://localhost:8080"
        );
    }

    #[test]
    fn test_collection_url() {
        let remote = HttpRemote::new("localhost:8080", None);
        assert_eq!(
            remote.url("users/u1/recipes"),
            "http://localhost:8080/users/u1/recipes"
        );
    }
}
