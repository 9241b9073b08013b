use async_trait::async_trait;
use bytes::Bytes;

use crate::{HttpFetcher, StorageError, StorageResult};

/// `HttpFetcher` backed by `reqwest`
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client, e.g. one with a timeout
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> StorageResult<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| StorageError::fetch(url, err))?;

        response.bytes().await.map_err(|err| StorageError::fetch(url, err))
    }
}
