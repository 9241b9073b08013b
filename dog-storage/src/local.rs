use async_trait::async_trait;
use bytes::Bytes;

use crate::{FileReader, StorageError, StorageResult};

/// `FileReader` backed by the local filesystem
#[derive(Debug, Clone, Default)]
pub struct LocalFileReader;

impl LocalFileReader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileReader for LocalFileReader {
    async fn exists(&self, path: &str) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn read(&self, path: &str) -> StorageResult<Bytes> {
        match tokio::fs::read(path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::local_missing(path))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"local bytes").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let reader = LocalFileReader::new();
        assert!(reader.exists(&path).await);
        assert_eq!(reader.read(&path).await.unwrap(), Bytes::from_static(b"local bytes"));
    }

    #[tokio::test]
    async fn directories_and_missing_files_do_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let reader = LocalFileReader::new();
        assert!(!reader.exists(dir.path().to_str().unwrap()).await);

        let missing = dir.path().join("nope.jpg");
        let missing = missing.to_str().unwrap();
        assert!(!reader.exists(missing).await);
        assert!(matches!(
            reader.read(missing).await,
            Err(StorageError::LocalResourceMissing { .. })
        ));
    }
}
