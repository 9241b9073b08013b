use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Access level of a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for `StorageGateway::store_file`
///
/// Deserializes from the `{ path, fileName, visibility }` shape callers
/// already send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOptions {
    /// Destination directory (logical, unresolved)
    #[serde(default)]
    pub path: Option<String>,

    /// Explicit object name; the store assigns one when absent
    #[serde(default)]
    pub file_name: Option<String>,

    /// Falls back to the gateway default when absent
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// The explicit name, if one was given and is not blank
    pub fn named(&self) -> Option<&str> {
        self.file_name.as_deref().filter(|name| !name.trim().is_empty())
    }
}

/// A file handed to the gateway by application code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub content: Bytes,
    pub original_name: Option<String>,
}

impl UploadedFile {
    pub fn new<B: Into<Bytes>>(content: B) -> Self {
        Self {
            content: content.into(),
            original_name: None,
        }
    }

    pub fn with_original_name<S: Into<String>>(mut self, name: S) -> Self {
        self.original_name = Some(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Extension of the original client name, lowercased
    pub fn extension(&self) -> Option<String> {
        let name = self.original_name.as_deref()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || ext.contains('/') {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Hex SHA-256 of the content
    pub fn content_hash(&self) -> String {
        hex::encode(Sha256::digest(&self.content))
    }
}

impl From<Vec<u8>> for UploadedFile {
    fn from(content: Vec<u8>) -> Self {
        Self::new(content)
    }
}

impl From<Bytes> for UploadedFile {
    fn from(content: Bytes) -> Self {
        Self::new(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_options_accept_legacy_keys() {
        let opts: WriteOptions = serde_json::from_str(
            r#"{"path": "docs/", "fileName": "a.pdf", "visibility": "private"}"#,
        )
        .unwrap();
        assert_eq!(opts.path.as_deref(), Some("docs/"));
        assert_eq!(opts.named(), Some("a.pdf"));
        assert_eq!(opts.visibility, Some(Visibility::Private));

        let bare: WriteOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(bare, WriteOptions::default());
    }

    #[test]
    fn blank_file_name_is_anonymous() {
        let opts = WriteOptions::new().with_file_name("  ");
        assert_eq!(opts.named(), None);
    }

    #[test]
    fn content_hash_ignores_original_name() {
        let a = UploadedFile::new(&b"pixels"[..]).with_original_name("Cat.PNG");
        let b = UploadedFile::new(&b"pixels"[..]).with_original_name("dog.png");
        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash().len(), 64);
        assert_eq!(a.extension().as_deref(), Some("png"));

        let c = UploadedFile::new(&b"other"[..]);
        assert_ne!(a.content_hash(), c.content_hash());
        assert_eq!(c.extension(), None);
    }

    #[test]
    fn extension_ignores_dotfiles() {
        assert_eq!(UploadedFile::new(Vec::<u8>::new()).with_original_name(".env").extension(), None);
        assert_eq!(UploadedFile::new(Vec::<u8>::new()).with_original_name("noext").extension(), None);
    }
}
