use std::sync::Arc;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use bytes::Bytes;
use tracing::{debug, error, instrument, warn};

use crate::{
    FileReader, HttpFetcher, ImageCodec, JpegThumbnailCodec, LocalFileReader, ObjectStore,
    PathResolver, RandomTokens, ReqwestFetcher, ResolvedPath, StorageConfig, StorageError,
    StorageResult, ThumbnailSize, TokenGenerator, UploadedFile, Visibility, WriteOptions,
};

/// Accepts unpadded input and stray trailing bits, as browsers produce both
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Environment-aware gateway in front of an object store.
///
/// Every mutating operation resolves its destination, performs exactly one
/// write and then asks the store whether the object exists. Success is
/// reported only when that check passes. A failed check does not roll the
/// write back.
pub struct StorageGateway {
    store: Arc<dyn ObjectStore>,
    files: Arc<dyn FileReader>,
    fetcher: Arc<dyn HttpFetcher>,
    codec: Arc<dyn ImageCodec>,
    tokens: Arc<dyn TokenGenerator>,
    resolver: PathResolver,
    config: StorageConfig,
}

impl StorageGateway {
    /// Create a gateway with the default local, HTTP, image and token collaborators
    pub fn new<S: ObjectStore + 'static>(store: S, config: StorageConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }

    /// Create a gateway over a store that is shared with other owners
    pub fn from_shared(store: Arc<dyn ObjectStore>, config: StorageConfig) -> Self {
        Self {
            store,
            files: Arc::new(LocalFileReader::new()),
            fetcher: Arc::new(ReqwestFetcher::new()),
            codec: Arc::new(JpegThumbnailCodec::new()),
            tokens: Arc::new(RandomTokens),
            resolver: PathResolver::new(&config),
            config,
        }
    }

    pub fn with_file_reader<F: FileReader + 'static>(mut self, files: F) -> Self {
        self.files = Arc::new(files);
        self
    }

    pub fn with_fetcher<H: HttpFetcher + 'static>(mut self, fetcher: H) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn with_codec<C: ImageCodec + 'static>(mut self, codec: C) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    pub fn with_tokens<T: TokenGenerator + 'static>(mut self, tokens: T) -> Self {
        self.tokens = Arc::new(tokens);
        self
    }

    /// Get configuration
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Map a logical path to its key in the active environment
    pub fn resolve(&self, logical: &str) -> ResolvedPath {
        self.resolver.resolve(logical)
    }

    /// Store an uploaded file under `options.path`.
    ///
    /// Uses the explicit file name when one is given, otherwise lets the
    /// store pick one.
    #[instrument(skip(self, file, options), fields(directory = ?options.path, named = options.named().is_some()))]
    pub async fn store_file(
        &self,
        file: &UploadedFile,
        options: &WriteOptions,
    ) -> StorageResult<ResolvedPath> {
        let directory = self.resolver.resolve_opt(options.path.as_deref());
        let visibility = options.visibility.unwrap_or(self.config.default_visibility);
        let content = file.content.clone();

        let written = match options.named() {
            Some(name) => {
                self.store
                    .put_named(directory.as_str(), content, name, visibility)
                    .await
            }
            None => {
                let extension = file.extension().unwrap_or_else(|| "bin".to_string());
                self.store
                    .put_anonymous(directory.as_str(), content, &extension, visibility)
                    .await
            }
        };

        let key = match written {
            Ok(key) => ResolvedPath::from_store(key),
            Err(err) => {
                warn!(directory = %directory, error = %err, "store write failed");
                return Err(StorageError::write(directory.into_string(), err));
            }
        };

        self.verify(key).await
    }

    /// Full content of an already resolved object
    #[instrument(skip(self))]
    pub async fn retrieve_file(&self, path: &str) -> StorageResult<Bytes> {
        self.store
            .get(path)
            .await
            .map_err(|err| StorageError::read(path, err))
    }

    /// Whether an object exists. Store errors are logged and read as `false`.
    pub async fn file_exists(&self, path: &str) -> bool {
        match self.store.exists(path).await {
            Ok(exists) => exists,
            Err(err) => {
                error!(path, error = %err, "existence check failed");
                false
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_file(&self, path: &str) -> StorageResult<()> {
        if path.is_empty() {
            warn!("refusing to delete an empty path");
            return Err(StorageError::invalid("path to delete is empty"));
        }
        self.store
            .delete(path)
            .await
            .map_err(|err| StorageError::write(path, err))
    }

    /// Delete several objects in one call
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub async fn delete_files<S: AsRef<str>>(&self, paths: &[S]) -> StorageResult<()> {
        if paths.is_empty() {
            warn!("refusing to delete an empty path list");
            return Err(StorageError::invalid("no paths to delete"));
        }
        let keys: Vec<String> = paths.iter().map(|p| p.as_ref().to_string()).collect();
        self.store
            .delete_many(&keys)
            .await
            .map_err(|err| StorageError::write(keys.join(", "), err))
    }

    #[instrument(skip(self))]
    pub async fn delete_directory(&self, prefix: &str) -> StorageResult<()> {
        self.store
            .delete_directory(prefix)
            .await
            .map_err(|err| StorageError::write(prefix, err))
    }

    /// Public URL of an object; existence is not checked
    pub fn public_url(&self, path: &str) -> String {
        self.store.url(path)
    }

    /// Upload a file from the local filesystem to `destination`
    #[instrument(skip(self))]
    pub async fn move_file_to_store(
        &self,
        local_path: &str,
        destination: &str,
        visibility: Visibility,
    ) -> StorageResult<ResolvedPath> {
        if !self.files.exists(local_path).await {
            warn!(local_path, "local file not found");
            return Err(StorageError::local_missing(local_path));
        }
        let content = self.files.read(local_path).await?;

        let path = self.resolver.resolve(destination);
        self.put_verified(path, content, visibility).await
    }

    /// Store a JPEG thumbnail of `image` under `directory`.
    ///
    /// The name is `thumbnail_<sha256 of the source>.jpg`, so re-uploading the
    /// same image overwrites the same object. `size` defaults to the
    /// configured thumbnail box.
    #[instrument(skip(self, image), fields(source_bytes = image.content.len()))]
    pub async fn resize_and_store_uploaded_image(
        &self,
        image: &UploadedFile,
        directory: &str,
        size: Option<ThumbnailSize>,
    ) -> StorageResult<ResolvedPath> {
        if directory.is_empty() || image.is_empty() {
            warn!("thumbnail requires both a directory and image content");
            return Err(StorageError::invalid("directory and image are required"));
        }

        let size = size.unwrap_or(self.config.thumbnail);
        let file_name = format!("thumbnail_{}.jpg", image.content_hash());

        let codec = Arc::clone(&self.codec);
        let source = image.content.clone();
        let quality = self.config.jpeg_quality;
        let encoded = tokio::task::spawn_blocking(move || {
            codec.thumbnail(&source, size.width, size.height, quality)
        })
        .await
        .map_err(|err| StorageError::codec(format!("thumbnail task failed: {}", err)))??;

        let path = self.resolver.resolve_in(directory, &file_name);
        self.put_verified(path, encoded, Visibility::Public).await
    }

    /// Server-side copy of an existing object to `destination`
    #[instrument(skip(self))]
    pub async fn duplicate_file(
        &self,
        source: &str,
        destination: &str,
    ) -> StorageResult<ResolvedPath> {
        let destination = self.resolver.resolve(destination);
        if !self.file_exists(source).await {
            warn!(source, "copy source not found");
            return Err(StorageError::source_missing(source));
        }

        if let Err(err) = self.store.copy(source, destination.as_str()).await {
            warn!(source, destination = %destination, error = %err, "copy failed");
            return Err(StorageError::write(destination.into_string(), err));
        }
        self.verify(destination).await
    }

    /// Decode a `data:<mime>;base64,<payload>` string and store it as a JPEG
    /// named `<prefix><random token>.jpg`
    #[instrument(skip(self, data), fields(data_len = data.len()))]
    pub async fn store_base64(
        &self,
        data: &str,
        directory: &str,
        prefix: &str,
    ) -> StorageResult<ResolvedPath> {
        if data.is_empty() {
            return Err(StorageError::invalid("base64 input is empty"));
        }
        let payload = data
            .split(',')
            .nth(1)
            .ok_or_else(|| StorageError::invalid("base64 input has no header separator"))?;

        let content = decode_base64(payload)?;
        let path = self.resolver.resolve_in(directory, &self.generated_name(prefix));
        self.put_verified(path, content, self.config.default_visibility)
            .await
    }

    /// Download `url` and store it as `<prefix><random token>.jpg`
    #[instrument(skip(self))]
    pub async fn store_remote_image(
        &self,
        url: &str,
        directory: &str,
        prefix: &str,
    ) -> StorageResult<ResolvedPath> {
        let content = self.fetcher.get(url).await.map_err(|err| match err {
            err @ StorageError::RemoteFetch { .. } => err,
            other => StorageError::fetch(url, other),
        })?;

        let path = self.resolver.resolve_in(directory, &self.generated_name(prefix));
        self.put_verified(path, content, self.config.default_visibility)
            .await
    }

    /// Size in bytes, or 0 when the object does not exist
    #[instrument(skip(self))]
    pub async fn file_size(&self, path: &str) -> StorageResult<u64> {
        if !self.file_exists(path).await {
            return Ok(0);
        }
        self.store
            .size(path)
            .await
            .map_err(|err| StorageError::read(path, err))
    }

    fn generated_name(&self, prefix: &str) -> String {
        format!("{}{}.jpg", prefix, self.tokens.token(self.config.token_length))
    }

    /// One write, then one existence check
    async fn put_verified(
        &self,
        path: ResolvedPath,
        content: Bytes,
        visibility: Visibility,
    ) -> StorageResult<ResolvedPath> {
        if let Err(err) = self.store.put(path.as_str(), content, visibility).await {
            warn!(path = %path, error = %err, "store write failed");
            return Err(StorageError::write(path.into_string(), err));
        }
        self.verify(path).await
    }

    async fn verify(&self, path: ResolvedPath) -> StorageResult<ResolvedPath> {
        match self.store.exists(path.as_str()).await {
            Ok(true) => {
                debug!(path = %path, "write verified");
                Ok(path)
            }
            Ok(false) => {
                warn!(path = %path, "write acknowledged but object is not visible");
                Err(StorageError::verification(path.into_string()))
            }
            Err(err) => {
                warn!(path = %path, error = %err, "existence check after write failed");
                Err(StorageError::verification(path.into_string()))
            }
        }
    }
}

/// Decode ignoring characters outside the base64 alphabet
fn decode_base64(payload: &str) -> StorageResult<Bytes> {
    let cleaned: String = payload
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
        .collect();

    LENIENT_BASE64
        .decode(cleaned.as_bytes())
        .map(Bytes::from)
        .map_err(|err| StorageError::invalid(format!("base64 payload could not be decoded: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryObjectStore;
    use tracing_test::traced_test;

    #[test]
    fn decodes_padded_and_unpadded() {
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(decode_base64("aGVsbG8").unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn ignores_noise_outside_alphabet() {
        assert_eq!(decode_base64("aGVs\nbG8=\r\n").unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(decode_base64("aG*Vs bG8").unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn empty_payload_decodes_to_nothing() {
        assert!(decode_base64("").unwrap().is_empty());
    }

    #[test]
    fn impossible_length_is_invalid_input() {
        assert!(matches!(decode_base64("a"), Err(StorageError::InvalidInput { .. })));
    }

    #[tokio::test]
    #[traced_test]
    async fn unverified_write_is_logged() {
        let store = Arc::new(MemoryObjectStore::new());
        store.drop_writes(true);
        let gateway = StorageGateway::from_shared(store.clone(), StorageConfig::new());

        let result = gateway
            .move_file_to_store(
                concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"),
                "logs/Cargo.toml",
                Visibility::Private,
            )
            .await;

        assert!(matches!(result, Err(StorageError::RemoteVerification { .. })));
        assert!(logs_contain("write acknowledged but object is not visible"));
        assert!(logs_contain("live/logs/Cargo.toml"));
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_existence_check_is_logged_as_absent() {
        let store = Arc::new(MemoryObjectStore::new());
        store.seed("live/a.txt", &b"content"[..]).await;
        store.fail_exists(true);
        let gateway = StorageGateway::from_shared(store.clone(), StorageConfig::new());

        assert!(!gateway.file_exists("live/a.txt").await);
        assert!(logs_contain("existence check failed"));
        assert!(logs_contain("live/a.txt"));
    }
}
