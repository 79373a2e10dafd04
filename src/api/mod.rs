//! Grade backend API: the collaborator trait and its HTTP implementation.

/// reqwest-backed implementation.
pub mod client;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::Path;

use crate::records::{RecordId, StudentPayload, StudentRecord, UploadHistoryEntry, UploadReceipt};

pub use client::HttpStudentApi;

/// File contents ready to be sent as the multipart `file` field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Read a file from disk for upload.
    pub async fn read(path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("not a file path: {}", path.display()))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            mime: mime_for(&filename),
            filename,
            bytes,
        })
    }
}

/// Content type for the part, based on the extension.
fn mime_for(filename: &str) -> &'static str {
    let ext = filename.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Every call the roster controller makes against the backend.
///
/// Any non-2xx status, transport error, timeout or malformed body is an `Err`;
/// callers do not branch on status codes.
#[async_trait]
pub trait StudentApi: Send + Sync {
    /// `GET /api/students`
    async fn list_students(&self) -> Result<Vec<StudentRecord>>;
    /// `GET /api/upload-history`
    async fn list_upload_history(&self) -> Result<Vec<UploadHistoryEntry>>;
    /// `POST /api/upload`
    async fn upload(&self, file: UploadFile) -> Result<UploadReceipt>;
    /// `PUT /api/students/{id}`
    async fn update_student(&self, id: &RecordId, payload: &StudentPayload) -> Result<()>;
    /// `DELETE /api/students/{id}`
    async fn delete_student(&self, id: &RecordId) -> Result<()>;
}
