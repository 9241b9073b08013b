use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::{ObjectStore, StorageError, StorageResult, Visibility};

/// An object as held by `MemoryObjectStore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content: Bytes,
    pub visibility: Visibility,
}

/// One primitive call received by `MemoryObjectStore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Put { key: String, visibility: Visibility },
    PutNamed { directory: String, name: String, visibility: Visibility },
    PutAnonymous { directory: String, visibility: Visibility },
    Get { key: String },
    Exists { key: String },
    Delete { key: String },
    DeleteMany { keys: Vec<String> },
    DeleteDirectory { prefix: String },
    Copy { source: String, destination: String },
    Size { key: String },
}

impl StoreCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::Put { .. } | Self::PutNamed { .. } | Self::PutAnonymous { .. } | Self::Copy { .. }
        )
    }
}

/// In-memory object store for tests and local development.
///
/// Records every call it receives and can be told to fail writes or to
/// acknowledge writes without keeping them.
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    journal: RwLock<Vec<StoreCall>>,
    base_url: String,
    fail_writes: AtomicBool,
    drop_writes: AtomicBool,
    fail_exists: AtomicBool,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            journal: RwLock::new(Vec::new()),
            base_url: "memory://".to_string(),
            fail_writes: AtomicBool::new(false),
            drop_writes: AtomicBool::new(false),
            fail_exists: AtomicBool::new(false),
        }
    }

    /// Prefix returned by `url`
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Make every write return an error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Acknowledge writes without storing anything
    pub fn drop_writes(&self, drop: bool) {
        self.drop_writes.store(drop, Ordering::SeqCst);
    }

    /// Make every `exists` call fail with a backend error
    pub fn fail_exists(&self, fail: bool) {
        self.fail_exists.store(fail, Ordering::SeqCst);
    }

    /// Insert an object directly, bypassing the journal
    pub async fn seed<K: Into<String>, B: Into<Bytes>>(&self, key: K, content: B) {
        self.objects.write().await.insert(
            key.into(),
            StoredObject {
                content: content.into(),
                visibility: Visibility::Public,
            },
        );
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    /// Calls received so far, oldest first
    pub async fn journal(&self) -> Vec<StoreCall> {
        self.journal.read().await.clone()
    }

    pub async fn clear_journal(&self) {
        self.journal.write().await.clear();
    }

    async fn record(&self, call: StoreCall) {
        self.journal.write().await.push(call);
    }

    fn check_write(&self, key: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::backend(std::io::Error::other(format!(
                "write to {} rejected",
                key
            ))));
        }
        Ok(())
    }

    async fn store(&self, key: String, content: Bytes, visibility: Visibility) {
        if self.drop_writes.load(Ordering::SeqCst) {
            return;
        }
        self.objects
            .write()
            .await
            .insert(key, StoredObject { content, visibility });
    }

    fn not_found(key: &str) -> StorageError {
        StorageError::backend(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no object at {}", key),
        ))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, content: Bytes, visibility: Visibility) -> StorageResult<()> {
        self.record(StoreCall::Put {
            key: key.to_string(),
            visibility,
        })
        .await;
        self.check_write(key)?;
        self.store(key.to_string(), content, visibility).await;
        Ok(())
    }

    async fn put_named(
        &self,
        directory: &str,
        content: Bytes,
        name: &str,
        visibility: Visibility,
    ) -> StorageResult<String> {
        self.record(StoreCall::PutNamed {
            directory: directory.to_string(),
            name: name.to_string(),
            visibility,
        })
        .await;
        let key = crate::path::join(directory, name);
        self.check_write(&key)?;
        self.store(key.clone(), content, visibility).await;
        Ok(key)
    }

    async fn put_anonymous(
        &self,
        directory: &str,
        content: Bytes,
        extension: &str,
        visibility: Visibility,
    ) -> StorageResult<String> {
        self.record(StoreCall::PutAnonymous {
            directory: directory.to_string(),
            visibility,
        })
        .await;
        let name = format!("{}.{}", uuid::Uuid::new_v4().simple(), extension);
        let key = crate::path::join(directory, &name);
        self.check_write(&key)?;
        self.store(key.clone(), content, visibility).await;
        Ok(key)
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.record(StoreCall::Get { key: key.to_string() }).await;
        self.objects
            .read()
            .await
            .get(key)
            .map(|object| object.content.clone())
            .ok_or_else(|| Self::not_found(key))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.record(StoreCall::Exists { key: key.to_string() }).await;
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(StorageError::backend(std::io::Error::other(format!(
                "existence check for {} failed",
                key
            ))));
        }
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.record(StoreCall::Delete { key: key.to_string() }).await;
        self.check_write(key)?;
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> StorageResult<()> {
        self.record(StoreCall::DeleteMany { keys: keys.to_vec() }).await;
        if let Some(first) = keys.first() {
            self.check_write(first)?;
        }
        let mut objects = self.objects.write().await;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn delete_directory(&self, prefix: &str) -> StorageResult<()> {
        self.record(StoreCall::DeleteDirectory {
            prefix: prefix.to_string(),
        })
        .await;
        self.check_write(prefix)?;
        let prefix = format!("{}/", prefix.trim_matches('/'));
        self.objects
            .write()
            .await
            .retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    async fn copy(&self, source: &str, destination: &str) -> StorageResult<()> {
        self.record(StoreCall::Copy {
            source: source.to_string(),
            destination: destination.to_string(),
        })
        .await;
        self.check_write(destination)?;
        let object = self
            .objects
            .read()
            .await
            .get(source)
            .cloned()
            .ok_or_else(|| Self::not_found(source))?;
        self.store(destination.to_string(), object.content, object.visibility)
            .await;
        Ok(())
    }

    async fn size(&self, key: &str) -> StorageResult<u64> {
        self.record(StoreCall::Size { key: key.to_string() }).await;
        self.objects
            .read()
            .await
            .get(key)
            .map(|object| object.content.len() as u64)
            .ok_or_else(|| Self::not_found(key))
    }

    fn url(&self, key: &str) -> String {
        format!("{}{}", self.base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_roundtrip_with_journal() {
        let store = MemoryObjectStore::new();
        store
            .put("live/a.txt", Bytes::from_static(b"hi"), Visibility::Private)
            .await
            .unwrap();

        assert_eq!(store.get("live/a.txt").await.unwrap(), Bytes::from_static(b"hi"));
        assert_eq!(store.object("live/a.txt").await.unwrap().visibility, Visibility::Private);
        assert_eq!(
            store.journal().await,
            vec![
                StoreCall::Put {
                    key: "live/a.txt".into(),
                    visibility: Visibility::Private
                },
                StoreCall::Get {
                    key: "live/a.txt".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn dropped_writes_are_acknowledged_but_absent() {
        let store = MemoryObjectStore::new();
        store.drop_writes(true);
        store
            .put("live/a.txt", Bytes::from_static(b"hi"), Visibility::Public)
            .await
            .unwrap();
        assert!(!store.exists("live/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn failed_writes_error() {
        let store = MemoryObjectStore::new();
        store.fail_writes(true);
        let result = store
            .put_named("live/docs", Bytes::from_static(b"x"), "a.pdf", Visibility::Public)
            .await;
        assert!(result.is_err());
        assert!(store.keys().await.is_empty());
    }

    #[tokio::test]
    async fn failed_exists_is_journaled_and_errors() {
        let store = MemoryObjectStore::new();
        store.seed("live/a.txt", &b"hi"[..]).await;
        store.fail_exists(true);
        assert!(store.exists("live/a.txt").await.is_err());
        assert_eq!(
            store.journal().await,
            vec![StoreCall::Exists {
                key: "live/a.txt".into()
            }]
        );

        store.fail_exists(false);
        assert!(store.exists("live/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn delete_directory_only_touches_prefix() {
        let store = MemoryObjectStore::new();
        store.seed("live/albums/1.jpg", &b"1"[..]).await;
        store.seed("live/albums/2.jpg", &b"2"[..]).await;
        store.seed("live/albums-old/3.jpg", &b"3"[..]).await;

        store.delete_directory("live/albums").await.unwrap();

        assert_eq!(store.keys().await, vec!["live/albums-old/3.jpg".to_string()]);
    }

    #[tokio::test]
    async fn anonymous_put_assigns_name() {
        let store = MemoryObjectStore::new();
        let key = store
            .put_anonymous("live/docs", Bytes::from_static(b"x"), "pdf", Visibility::Public)
            .await
            .unwrap();
        assert!(key.starts_with("live/docs/"));
        assert!(key.ends_with(".pdf"));
        assert!(store.exists(&key).await.unwrap());
    }
}
