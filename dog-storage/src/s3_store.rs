use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    primitives::ByteStream as AwsByteStream,
    types::{Delete, ObjectCannedAcl, ObjectIdentifier},
    Client,
};
use bytes::Bytes;
use std::env;
use tracing::debug;

use crate::{ObjectStore, StorageError, StorageResult, Visibility};

/// S3 accepts at most this many keys per DeleteObjects call
const DELETE_BATCH: usize = 1000;

/// S3 connection settings
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    /// Custom endpoint for S3-compatible services
    pub endpoint_url: Option<String>,
    /// Base for public URLs, e.g. a CDN host
    pub public_url: Option<String>,
    pub force_path_style: bool,
}

impl S3Config {
    pub fn new<R, A, S, B>(region: R, access_key_id: A, secret_access_key: S, bucket: B) -> Self
    where
        R: Into<String>,
        A: Into<String>,
        S: Into<String>,
        B: Into<String>,
    {
        Self {
            region: region.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            bucket: bucket.into(),
            endpoint_url: None,
            public_url: None,
            force_path_style: false,
        }
    }

    /// Load from the standard `AWS_*` variables
    pub fn from_env() -> StorageResult<Self> {
        fn get_env(key: &str) -> StorageResult<String> {
            env::var(key).map_err(|_| StorageError::invalid(format!("{} environment variable required", key)))
        }

        fn get_optional(key: &str) -> Option<String> {
            env::var(key).ok().filter(|value| !value.trim().is_empty())
        }

        Ok(Self {
            region: get_env("AWS_DEFAULT_REGION")?,
            access_key_id: get_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: get_env("AWS_SECRET_ACCESS_KEY")?,
            bucket: get_env("AWS_BUCKET")?,
            endpoint_url: get_optional("AWS_ENDPOINT"),
            public_url: get_optional("AWS_URL"),
            force_path_style: get_optional("AWS_USE_PATH_STYLE_ENDPOINT")
                .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true"))
                .unwrap_or(false),
        })
    }

    pub fn with_endpoint<S: Into<String>>(mut self, endpoint_url: S) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn with_public_url<S: Into<String>>(mut self, public_url: S) -> Self {
        self.public_url = Some(public_url.into());
        self
    }

    pub fn with_path_style(mut self) -> Self {
        self.force_path_style = true;
        self
    }

    /// Public URL of `key` under this configuration
    pub fn object_url(&self, key: &str) -> String {
        let key = encode_key(key.trim_start_matches('/'));
        if let Some(base) = &self.public_url {
            return format!("{}/{}", base.trim_end_matches('/'), key);
        }
        match &self.endpoint_url {
            Some(endpoint) if self.force_path_style => {
                format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
            }
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                match endpoint.split_once("://") {
                    Some((scheme, host)) => format!("{}://{}.{}/{}", scheme, self.bucket, host, key),
                    None => format!("{}/{}/{}", endpoint, self.bucket, key),
                }
            }
            None => format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key),
        }
    }
}

/// Production S3 store implementation using the AWS SDK
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    config: S3Config,
}

impl S3Store {
    pub async fn new(config: S3Config) -> Self {
        let client = Self::create_client(&config).await;
        Self { client, config }
    }

    /// Build from `S3Config::from_env`
    pub async fn from_env() -> StorageResult<Self> {
        Ok(Self::new(S3Config::from_env()?).await)
    }

    /// Use an already configured client
    pub fn with_client(client: Client, config: S3Config) -> Self {
        Self { client, config }
    }

    async fn create_client(config: &S3Config) -> Client {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "dog-storage",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let aws_config = loader.load().await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(config.force_path_style)
                .build(),
        )
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    fn map_aws_error(err: impl std::error::Error + Send + Sync + 'static) -> StorageError {
        StorageError::backend(err)
    }

    fn canned_acl(visibility: Visibility) -> ObjectCannedAcl {
        match visibility {
            Visibility::Public => ObjectCannedAcl::PublicRead,
            Visibility::Private => ObjectCannedAcl::Private,
        }
    }

    async fn delete_batch(&self, keys: &[String]) -> StorageResult<()> {
        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(Self::map_aws_error)?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(Self::map_aws_error)?;

        let result = self
            .client
            .delete_objects()
            .bucket(&self.config.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        if let Some(failed) = result.errors().first() {
            return Err(StorageError::backend(std::io::Error::other(format!(
                "failed to delete {}: {}",
                failed.key().unwrap_or_default(),
                failed.message().unwrap_or("unknown error")
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, content: Bytes, visibility: Visibility) -> StorageResult<()> {
        let size = content.len();
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .acl(Self::canned_acl(visibility))
            .body(AwsByteStream::from(content))
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        debug!(key, size, %visibility, "put object");
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let result = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        let body = result.body.collect().await.map_err(Self::map_aws_error)?;
        Ok(body.into_bytes())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    Ok(false)
                } else {
                    Err(Self::map_aws_error(err))
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> StorageResult<()> {
        for chunk in keys.chunks(DELETE_BATCH) {
            self.delete_batch(chunk).await?;
        }
        Ok(())
    }

    async fn delete_directory(&self, prefix: &str) -> StorageResult<()> {
        let prefix = format!("{}/", prefix.trim_matches('/'));
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.config.bucket)
            .prefix(&prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(Self::map_aws_error)?;
            keys.extend(page.contents().iter().filter_map(|object| object.key().map(str::to_string)));
        }

        debug!(prefix = %prefix, count = keys.len(), "deleting directory");
        self.delete_many(&keys).await
    }

    async fn copy(&self, source: &str, destination: &str) -> StorageResult<()> {
        self.client
            .copy_object()
            .bucket(&self.config.bucket)
            .copy_source(format!("{}/{}", self.config.bucket, encode_key(source)))
            .key(destination)
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(())
    }

    async fn size(&self, key: &str) -> StorageResult<u64> {
        let result = self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        Ok(result.content_length().unwrap_or(0).max(0) as u64)
    }

    fn url(&self, key: &str) -> String {
        self.config.object_url(key)
    }
}

/// Percent-encode a key for URLs and `x-amz-copy-source`, keeping `/`
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config::new("eu-west-1", "key", "secret", "media-bucket")
    }

    #[test]
    fn virtual_host_url_by_default() {
        assert_eq!(
            config().object_url("live/a b.jpg"),
            "https://media-bucket.s3.eu-west-1.amazonaws.com/live/a%20b.jpg"
        );
    }

    #[test]
    fn public_url_wins() {
        let config = config().with_public_url("https://cdn.example.com/");
        assert_eq!(config.object_url("/live/a.jpg"), "https://cdn.example.com/live/a.jpg");
    }

    #[test]
    fn path_style_endpoint() {
        let config = config().with_endpoint("http://localhost:9000").with_path_style();
        assert_eq!(
            config.object_url("staging/x.png"),
            "http://localhost:9000/media-bucket/staging/x.png"
        );
    }

    #[test]
    fn custom_endpoint_virtual_host() {
        let config = config().with_endpoint("https://nyc3.digitaloceanspaces.com");
        assert_eq!(
            config.object_url("live/x.png"),
            "https://media-bucket.nyc3.digitaloceanspaces.com/live/x.png"
        );
    }

    #[test]
    fn encode_key_keeps_separators() {
        assert_eq!(encode_key("live/dir/ä+b.jpg"), "live/dir/%C3%A4%2Bb.jpg");
        assert_eq!(encode_key("live/a b?.jpg"), "live/a%20b%3F.jpg");
        assert_eq!(encode_key("live//x"), "live//x");
    }
}
