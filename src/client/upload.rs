//! Document upload batches
//!
//! An [`UploadBatch`] is built only when every file passes the
//! [`ExtensionPolicy`]; one disallowed file voids the whole batch.

use std::path::Path;

use crate::client::error::OperationError;
use crate::error::{RagbridgeError, Result};

/// A file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    /// Original file name, sent as the multipart filename
    pub name: String,
    /// Optional MIME type of the content
    pub content_type: Option<String>,
    /// Raw file bytes
    pub data: Vec<u8>,
}

impl FileHandle {
    /// Create a handle from in-memory content
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    /// Set the MIME type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk, keeping only its file name
    ///
    /// # Errors
    ///
    /// Returns error if the path has no file name or cannot be read
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                RagbridgeError::Config(format!("Not a file path: {}", path.display()))
            })?;
        let data = tokio::fs::read(path).await?;
        Ok(Self::new(name, data))
    }
}

/// Accepted file suffixes for document uploads (case-insensitive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionPolicy {
    allowed: Vec<String>,
}

impl ExtensionPolicy {
    /// Create a policy from suffixes such as `.pdf`
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Whether `file_name` carries an accepted suffix
    pub fn accepts(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.allowed.iter().any(|ext| lower.ends_with(ext.as_str()))
    }

    /// User-facing description of the restriction
    ///
    /// # Examples
    ///
    /// ```
    /// use ragbridge::client::ExtensionPolicy;
    ///
    /// assert_eq!(ExtensionPolicy::new([".pdf"]).describe(), "Only PDF files are allowed");
    /// ```
    pub fn describe(&self) -> String {
        let kinds: Vec<String> = self
            .allowed
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_uppercase())
            .collect();
        format!("Only {} files are allowed", kinds.join("/"))
    }
}

/// Files plus the session they belong to, all of them policy-checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBatch {
    /// Session the documents are ingested into
    pub session_id: String,
    /// Files in selection order
    pub files: Vec<FileHandle>,
}

impl UploadBatch {
    /// Build a batch, rejecting it whole if any file violates `policy`
    ///
    /// # Errors
    ///
    /// Returns a validation [`OperationError`] naming the first offending
    /// file.
    pub fn build(
        session_id: &str,
        files: Vec<FileHandle>,
        policy: &ExtensionPolicy,
    ) -> std::result::Result<Self, OperationError> {
        if let Some(bad) = files.iter().find(|f| !policy.accepts(&f.name)) {
            return Err(OperationError::validation(format!(
                "{} (rejected: {})",
                policy.describe(),
                bad.name
            )));
        }
        Ok(Self {
            session_id: session_id.to_string(),
            files,
        })
    }

    /// File names in order
    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    /// Total payload size in bytes
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.data.len()).sum()
    }
}
