//! HTTP client for the grade backend.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;

use super::{StudentApi, UploadFile};
use crate::{
    config::ApiCfg,
    records::{RecordId, StudentPayload, StudentRecord, UploadHistoryEntry, UploadReceipt},
};

/// `StudentApi` over reqwest.
#[derive(Clone, Debug)]
pub struct HttpStudentApi {
    http: Client,
    base_url: String,
}

impl HttpStudentApi {
    /// Build a client with the configured base URL and timeout.
    pub fn new(cfg: &ApiCfg) -> Result<Self> {
        let http = Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn student_url(&self, id: &RecordId) -> String {
        self.url(&format!("/api/students/{}", urlencoding::encode(&id.0)))
    }
}

#[async_trait]
impl StudentApi for HttpStudentApi {
    async fn list_students(&self) -> Result<Vec<StudentRecord>> {
        let resp = self.http.get(self.url("/api/students")).send().await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<Vec<StudentRecord>>().await?)
    }

    async fn list_upload_history(&self) -> Result<Vec<UploadHistoryEntry>> {
        let resp = self.http.get(self.url("/api/upload-history")).send().await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<Vec<UploadHistoryEntry>>().await?)
    }

    async fn upload(&self, file: UploadFile) -> Result<UploadReceipt> {
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(file.mime)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<UploadReceipt>().await?)
    }

    async fn update_student(&self, id: &RecordId, payload: &StudentPayload) -> Result<()> {
        let resp = self.http.put(self.student_url(id)).json(payload).send().await?;
        // The updated record in the body is not used; the roster is re-fetched.
        ensure_success(resp).await?;
        Ok(())
    }

    async fn delete_student(&self, id: &RecordId) -> Result<()> {
        let resp = self.http.delete(self.student_url(id)).send().await?;
        ensure_success(resp).await?;
        Ok(())
    }
}

/// Convert non-2xx responses into a structured error.
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_else(|_| "".into());
    Err(anyhow!("HTTP status {status} error: {body}"))
}
