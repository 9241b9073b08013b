//! # dog-storage: Environment-aware object storage gateway
//!
//! `dog-storage` sits between application code and a remote object store
//! (S3 or anything S3-compatible). It decides where a logical file name
//! lives for the current deployment environment, and it never reports a
//! write as successful until the store confirms the object exists.
//!
//! ## Key Features
//!
//! - **Environment namespacing**: every key is placed under `live/` or `staging/`
//! - **Write-then-verify**: each mutating call performs one write and one existence check
//! - **Media ingestion**: local files, base64 data URIs, remote URLs and JPEG thumbnails
//! - **Typed failures**: callers can tell invalid input from a failed write or a failed verify
//! - **Swappable backends**: S3 in production, an in-memory store for tests
//!
//! ## Quick Start
//!
//! ```rust
//! use dog_storage::prelude::*;
//! use dog_storage::MemoryObjectStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> StorageResult<()> {
//! let store = Arc::new(MemoryObjectStore::new());
//! let gateway = StorageGateway::from_shared(store.clone(), StorageConfig::new().staging());
//!
//! let file = UploadedFile::new(b"%PDF-1.7".to_vec());
//! let options = WriteOptions::new().with_path("docs/").with_file_name("a.pdf");
//!
//! let path = gateway.store_file(&file, &options).await?;
//! assert_eq!(path.as_str(), "staging/docs/a.pdf");
//! assert_eq!(gateway.file_size(path.as_str()).await?, 8);
//! # Ok(())
//! # }
//! ```
//!
//! In production, build the store from the usual `AWS_*` variables:
//!
//! ```rust,no_run
//! use dog_storage::prelude::*;
//!
//! # async fn run() -> StorageResult<()> {
//! let store = dog_storage::S3Store::from_env().await?;
//! let gateway = StorageGateway::new(store, StorageConfig::from_env());
//! let url = gateway.public_url(gateway.resolve("avatars/42.jpg").as_str());
//! # let _ = url;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   Your Service   │  ← Business logic only
//! ├──────────────────┤
//! │  StorageGateway  │  ← Path resolution, write-then-verify, ingestion
//! ├──────────────────┤
//! │   ObjectStore    │  ← Storage primitives
//! └──────────────────┘
//! ```

mod codec;
mod config;
mod error;
mod fetch;
pub mod gateway;
mod local;
mod memory_store;
mod path;
mod s3_store;
pub mod store;
mod token;
mod types;

// Re-export main types for clean API
pub use codec::JpegThumbnailCodec;
pub use config::{Environment, StorageConfig, ThumbnailSize};
pub use error::{StorageError, StorageErrorKind, StorageResult};
pub use fetch::ReqwestFetcher;
pub use gateway::StorageGateway;
pub use local::LocalFileReader;
pub use memory_store::{MemoryObjectStore, StoreCall, StoredObject};
pub use path::{PathResolver, ResolvedPath};
pub use s3_store::{S3Config, S3Store};
pub use store::{FileReader, HttpFetcher, ImageCodec, ObjectStore, TokenGenerator};
pub use token::RandomTokens;
pub use types::{UploadedFile, Visibility, WriteOptions};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ObjectStore, ResolvedPath, StorageConfig, StorageError, StorageGateway, StorageResult,
        UploadedFile, Visibility, WriteOptions,
    };
}
