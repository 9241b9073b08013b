use async_trait::async_trait;
use bytes::Bytes;

use crate::{StorageResult, Visibility};

/// Object store primitives - must be implemented by all storage backends.
///
/// Keys passed here are already resolved; backends never add an
/// environment root of their own.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `content` at exactly `key`, overwriting any existing object
    async fn put(&self, key: &str, content: Bytes, visibility: Visibility) -> StorageResult<()>;

    /// Write `content` as `directory/name`, returning the key written
    async fn put_named(
        &self,
        directory: &str,
        content: Bytes,
        name: &str,
        visibility: Visibility,
    ) -> StorageResult<String> {
        let key = crate::path::join(directory, name);
        self.put(&key, content, visibility).await?;
        Ok(key)
    }

    /// Write `content` under `directory` with a store-assigned name
    async fn put_anonymous(
        &self,
        directory: &str,
        content: Bytes,
        extension: &str,
        visibility: Visibility,
    ) -> StorageResult<String> {
        let name = format!("{}.{}", uuid::Uuid::new_v4().simple(), extension);
        self.put_named(directory, content, &name, visibility).await
    }

    /// Read the full content of an object
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Whether an object exists at `key`
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete one object
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Delete several objects
    async fn delete_many(&self, keys: &[String]) -> StorageResult<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }

    /// Delete every object below `prefix`
    async fn delete_directory(&self, prefix: &str) -> StorageResult<()>;

    /// Server-side copy
    async fn copy(&self, source: &str, destination: &str) -> StorageResult<()>;

    /// Size of an object in bytes
    async fn size(&self, key: &str) -> StorageResult<u64>;

    /// Public URL of an object. Does not check that it exists.
    fn url(&self, key: &str) -> String;
}

/// Reads files from the local filesystem
#[async_trait]
pub trait FileReader: Send + Sync {
    async fn exists(&self, path: &str) -> bool;

    async fn read(&self, path: &str) -> StorageResult<Bytes>;
}

/// Downloads remote content
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, url: &str) -> StorageResult<Bytes>;
}

/// Decodes, scales down and re-encodes images.
///
/// Called from the blocking thread pool.
pub trait ImageCodec: Send + Sync {
    /// Resize `source` to `width` x `height`, never enlarging either
    /// dimension, and encode it as JPEG at `quality`
    fn thumbnail(&self, source: &[u8], width: u32, height: u32, quality: u8) -> StorageResult<Bytes>;
}

/// Source of random file name tokens
pub trait TokenGenerator: Send + Sync {
    /// An alphanumeric token of exactly `len` characters
    fn token(&self, len: usize) -> String;
}
