use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Folder a customer document is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Passport,
    BankStatement,
}

impl DocumentKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Passport => "passports",
            DocumentKind::BankStatement => "bank_statements",
        }
    }

    /// Accepts the storage prefix or the URL-friendly spelling.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "passports" => Some(DocumentKind::Passport),
            "bank_statements" | "bank-statements" => Some(DocumentKind::BankStatement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredDocument {
    pub key: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid document key: {0}")]
    InvalidKey(String),
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put(&self, kind: DocumentKind, file_name: &str, bytes: &[u8]) -> Result<StoredDocument, StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// Filesystem-backed store; files are served back through `/documents/`.
pub struct LocalDocumentStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/documents/{}", self.public_base_url, key)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let (prefix, name) = key
            .split_once('/')
            .ok_or_else(|| StorageError::InvalidKey(key.to_owned()))?;
        if DocumentKind::from_segment(prefix).map(|k| k.prefix()) != Some(prefix)
            || name.is_empty()
            || sanitize_file_name(name) != name
            || name.starts_with('.')
        {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(prefix).join(name))
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn put(&self, kind: DocumentKind, file_name: &str, bytes: &[u8]) -> Result<StoredDocument, StorageError> {
        let dir = self.root.join(kind.prefix());
        tokio::fs::create_dir_all(&dir).await?;

        let name = sanitize_file_name(file_name);
        let millis = Utc::now().timestamp_millis();
        let mut stored_name = format!("{millis}_{name}");
        let mut file = match create_new(&dir.join(&stored_name)).await {
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                stored_name = format!("{millis}_{}_{name}", &Uuid::new_v4().simple().to_string()[..8]);
                create_new(&dir.join(&stored_name)).await?
            }
            other => other?,
        };
        file.write_all(bytes).await?;
        file.flush().await?;

        let key = format!("{}/{}", kind.prefix(), stored_name);
        log::info!("stored document {} ({} bytes)", key, bytes.len());
        Ok(StoredDocument {
            url: self.public_url(&key),
            key,
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_owned())),
            Err(e) => Err(e.into()),
        }
    }
}

async fn create_new(path: &Path) -> std::io::Result<tokio::fs::File> {
    tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}

/// Keeps the last path component and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "document".to_owned()
    } else {
        cleaned.to_owned()
    }
}

pub fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (LocalDocumentStore, PathBuf) {
        let root = std::env::temp_dir().join(format!("skyethio-docs-{}", Uuid::new_v4()));
        (LocalDocumentStore::new(&root, "http://localhost:8080/"), root)
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_file_name("passport scan.pdf"), "passport_scan.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\bank.png"), "bank.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "document");
        assert_eq!(sanitize_file_name("ፓስፖርት.jpg"), "_____.jpg");
    }

    #[test]
    fn kinds_and_content_types() {
        assert_eq!(DocumentKind::from_segment("bank-statements"), Some(DocumentKind::BankStatement));
        assert_eq!(DocumentKind::BankStatement.prefix(), "bank_statements");
        assert_eq!(DocumentKind::from_segment("selfies"), None);
        assert_eq!(content_type_for("scan.PDF"), "application/pdf");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn put_then_get() {
        let (store, root) = temp_store();
        let stored = store
            .put(DocumentKind::Passport, "my passport.pdf", b"%PDF-1.7")
            .await
            .unwrap();

        assert!(stored.key.starts_with("passports/"));
        assert!(stored.key.ends_with("_my_passport.pdf"));
        assert_eq!(stored.url, format!("http://localhost:8080/documents/{}", stored.key));
        assert_eq!(store.get(&stored.key).await.unwrap(), b"%PDF-1.7");

        let again = store
            .put(DocumentKind::Passport, "my passport.pdf", b"second")
            .await
            .unwrap();
        assert_ne!(again.key, stored.key);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn get_rejects_escaping_keys() {
        let (store, _root) = temp_store();
        for key in ["passports/../secret", "other/file.pdf", "passports/", "nofolder", "passports/.env"] {
            assert!(
                matches!(store.get(key).await, Err(StorageError::InvalidKey(_))),
                "{key} should be rejected"
            );
        }
        assert!(matches!(
            store.get("bank_statements/1_missing.pdf").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
