//! Roster state container: pure transitions from actions to effects.
//!
//! The store never talks to the network. `dispatch` applies one action and
//! returns the requests the worker must run; request completions come back as
//! actions. The roster is only ever replaced wholesale by a fetch result.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::records::{
    DraftField, EditDraft, RecordId, StudentPayload, StudentRecord, UploadHistoryEntry,
    UploadReceipt,
};

pub const MSG_NO_STUDENTS: &str = "No students found. Upload a file to get started.";
pub const MSG_CONNECT_FAILED: &str =
    "Failed to connect to server. Please check if backend is running.";
pub const MSG_UPLOAD_FAILED: &str = "Failed to upload file - Check backend connection";
pub const MSG_UPDATED: &str = "Student updated successfully";
pub const MSG_UPDATE_FAILED: &str = "Failed to update student";
pub const MSG_DELETED: &str = "Student deleted successfully";
pub const MSG_DELETE_FAILED: &str = "Failed to delete student";
pub const MSG_BUSY: &str = "Another change is still in progress. Please wait.";

/// Classification of the status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Info,
    Error,
}

/// The single, overwritable message shown after the latest operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    fn info(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

/// The change currently in flight. Only one runs at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    Upload,
    Save,
    Delete,
}

impl Mutation {
    pub fn label(self) -> &'static str {
        match self {
            Mutation::Upload => "uploading",
            Mutation::Save => "saving",
            Mutation::Delete => "deleting",
        }
    }
}

/// The open edit modal.
#[derive(Clone, Debug, PartialEq)]
pub struct EditSession {
    pub draft: EditDraft,
    /// A save request for this draft is in flight.
    pub saving: bool,
}

/// User intents and request completions.
#[derive(Debug)]
pub enum Action {
    RefreshRoster,
    RefreshHistory,
    /// The user asked to choose a file; refused while a change is in flight.
    RequestUpload,
    /// `None` when no file was chosen.
    SubmitUpload(Option<PathBuf>),
    BeginEdit(StudentRecord),
    UpdateDraftField(DraftField, String),
    CommitEdit,
    CancelEdit,
    /// Opens the yes/no confirmation.
    RequestDelete(RecordId),
    ConfirmDelete(bool),

    RosterLoaded(Result<Vec<StudentRecord>>),
    HistoryLoaded(Result<Vec<UploadHistoryEntry>>),
    UploadFinished(Result<UploadReceipt>),
    SaveFinished {
        id: RecordId,
        result: Result<()>,
    },
    DeleteFinished {
        id: RecordId,
        result: Result<()>,
    },
}

/// Requests the worker performs on behalf of the store.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    FetchRoster,
    FetchHistory,
    Upload(PathBuf),
    SaveStudent {
        id: RecordId,
        payload: StudentPayload,
    },
    DeleteStudent(RecordId),
}

/// Roster, upload history, edit draft, status message and busy flags.
#[derive(Debug)]
pub struct RosterStore {
    roster: Vec<StudentRecord>,
    history: Vec<UploadHistoryEntry>,
    edit: Option<EditSession>,
    pending_delete: Option<RecordId>,
    message: Option<StatusMessage>,
    roster_fetches: usize,
    history_fetches: usize,
    mutation: Option<Mutation>,
    accepted_extensions: Vec<String>,
}

impl RosterStore {
    /// Empty store; uploads are limited to the given extensions (no dot).
    pub fn new(accepted_extensions: &[String]) -> Self {
        Self {
            roster: Vec::new(),
            history: Vec::new(),
            edit: None,
            pending_delete: None,
            message: None,
            roster_fetches: 0,
            history_fetches: 0,
            mutation: None,
            accepted_extensions: accepted_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn roster(&self) -> &[StudentRecord] {
        &self.roster
    }

    pub fn history(&self) -> &[UploadHistoryEntry] {
        &self.history
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        self.edit.as_ref()
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.edit.as_ref().map(|s| &s.draft)
    }

    pub fn pending_delete(&self) -> Option<&RecordId> {
        self.pending_delete.as_ref()
    }

    pub fn message(&self) -> Option<&StatusMessage> {
        self.message.as_ref()
    }

    pub fn roster_busy(&self) -> bool {
        self.roster_fetches > 0
    }

    pub fn history_busy(&self) -> bool {
        self.history_fetches > 0
    }

    pub fn mutating(&self) -> bool {
        self.mutation.is_some()
    }

    pub fn mutation(&self) -> Option<Mutation> {
        self.mutation
    }

    pub fn accepted_extensions(&self) -> &[String] {
        &self.accepted_extensions
    }

    /// Apply one action and return the requests it triggers.
    pub fn dispatch(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::RefreshRoster => vec![self.fetch_roster()],
            Action::RefreshHistory => vec![self.fetch_history()],
            Action::RequestUpload => {
                if self.mutating() {
                    self.reject_busy("upload");
                }
                vec![]
            }
            Action::SubmitUpload(file) => self.submit_upload(file),
            Action::BeginEdit(record) => {
                tracing::debug!("edit begin: {}", record.id);
                self.edit = Some(EditSession {
                    draft: EditDraft::from(&record),
                    saving: false,
                });
                vec![]
            }
            Action::UpdateDraftField(field, value) => {
                self.update_draft_field(field, &value);
                vec![]
            }
            Action::CommitEdit => self.commit_edit(),
            Action::CancelEdit => {
                if let Some(s) = self.edit.take() {
                    tracing::debug!("edit cancelled: {}", s.draft.id);
                }
                vec![]
            }
            Action::RequestDelete(id) => {
                if self.mutating() {
                    self.reject_busy("delete");
                } else {
                    self.pending_delete = Some(id);
                }
                vec![]
            }
            Action::ConfirmDelete(confirmed) => self.confirm_delete(confirmed),

            Action::RosterLoaded(result) => {
                self.roster_loaded(result);
                vec![]
            }
            Action::HistoryLoaded(result) => {
                self.history_fetches = self.history_fetches.saturating_sub(1);
                match result {
                    Ok(history) => {
                        tracing::info!("history loaded: {} entries", history.len());
                        self.history = history;
                    }
                    Err(e) => tracing::warn!("history fetch failed: {e:#}"),
                }
                vec![]
            }
            Action::UploadFinished(result) => {
                self.mutation = None;
                match result {
                    Ok(receipt) => {
                        tracing::info!("upload done: {} students", receipt.count);
                        self.message = Some(StatusMessage::success(format!(
                            "Success! Uploaded {} students",
                            receipt.count
                        )));
                        vec![self.fetch_roster(), self.fetch_history()]
                    }
                    Err(e) => {
                        tracing::error!("upload failed: {e:#}");
                        self.message = Some(StatusMessage::error(MSG_UPLOAD_FAILED));
                        vec![]
                    }
                }
            }
            Action::SaveFinished { id, result } => self.save_finished(id, result),
            Action::DeleteFinished { id, result } => {
                self.mutation = None;
                match result {
                    Ok(()) => {
                        tracing::info!("delete done: {id}");
                        self.message = Some(StatusMessage::success(MSG_DELETED));
                        vec![self.fetch_roster()]
                    }
                    Err(e) => {
                        tracing::error!("delete failed: {id}: {e:#}");
                        self.message = Some(StatusMessage::error(MSG_DELETE_FAILED));
                        vec![]
                    }
                }
            }
        }
    }

    fn fetch_roster(&mut self) -> Effect {
        self.roster_fetches += 1;
        Effect::FetchRoster
    }

    fn fetch_history(&mut self) -> Effect {
        self.history_fetches += 1;
        Effect::FetchHistory
    }

    fn roster_loaded(&mut self, result: Result<Vec<StudentRecord>>) {
        self.roster_fetches = self.roster_fetches.saturating_sub(1);
        match result {
            Ok(roster) => {
                tracing::info!("roster loaded: {} students", roster.len());
                if roster.is_empty() {
                    self.message = Some(StatusMessage::info(MSG_NO_STUDENTS));
                } else if self
                    .message
                    .as_ref()
                    .is_some_and(|m| m.text == MSG_CONNECT_FAILED || m.text == MSG_NO_STUDENTS)
                {
                    // Outcomes of other operations stay visible.
                    self.message = None;
                }
                self.roster = roster;
            }
            Err(e) => {
                tracing::error!("roster fetch failed: {e:#}");
                self.message = Some(StatusMessage::error(MSG_CONNECT_FAILED));
            }
        }
    }

    fn submit_upload(&mut self, file: Option<PathBuf>) -> Vec<Effect> {
        let Some(path) = file else {
            return vec![];
        };
        if self.mutating() {
            self.reject_busy("upload");
            return vec![];
        }
        if !self.is_accepted(&path) {
            tracing::warn!("upload rejected by extension: {}", path.display());
            self.message = Some(StatusMessage::error(format!(
                "Unsupported file type. Supported formats: {}",
                self.accepted_extensions
                    .iter()
                    .map(|e| format!(".{e}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
            return vec![];
        }
        tracing::info!("upload start: {}", path.display());
        self.mutation = Some(Mutation::Upload);
        vec![Effect::Upload(path)]
    }

    fn reject_busy(&mut self, what: &str) {
        tracing::warn!("{what} ignored: another change is in flight");
        self.message = Some(StatusMessage::info(MSG_BUSY));
    }

    fn is_accepted(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| self.accepted_extensions.contains(&e))
    }

    fn update_draft_field(&mut self, field: DraftField, value: &str) {
        let Some(session) = self.edit.as_mut() else {
            return;
        };
        if session.saving {
            tracing::debug!("draft locked while saving");
            return;
        }
        if let Err(e) = session.draft.set_field(field, value) {
            self.message = Some(StatusMessage::error(e));
        }
    }

    fn commit_edit(&mut self) -> Vec<Effect> {
        if self.mutating() {
            self.reject_busy("save");
            return vec![];
        }
        let Some(session) = self.edit.as_mut() else {
            return vec![];
        };
        if session.saving {
            return vec![];
        }
        session.saving = true;
        self.mutation = Some(Mutation::Save);
        tracing::info!("save start: {}", session.draft.id);
        vec![Effect::SaveStudent {
            id: session.draft.id.clone(),
            payload: session.draft.to_payload(),
        }]
    }

    fn save_finished(&mut self, id: RecordId, result: Result<()>) -> Vec<Effect> {
        self.mutation = None;
        // A cancelled or replaced draft is left alone.
        let current = self
            .edit
            .as_ref()
            .is_some_and(|s| s.saving && s.draft.id == id);
        match result {
            Ok(()) => {
                tracing::info!("save done: {id}");
                if current {
                    self.edit = None;
                }
                self.message = Some(StatusMessage::success(MSG_UPDATED));
                vec![self.fetch_roster()]
            }
            Err(e) => {
                tracing::error!("save failed: {id}: {e:#}");
                if current && let Some(s) = self.edit.as_mut() {
                    s.saving = false;
                }
                self.message = Some(StatusMessage::error(MSG_UPDATE_FAILED));
                vec![]
            }
        }
    }

    fn confirm_delete(&mut self, confirmed: bool) -> Vec<Effect> {
        let Some(id) = self.pending_delete.take() else {
            return vec![];
        };
        if !confirmed {
            tracing::debug!("delete declined: {id}");
            return vec![];
        }
        if self.mutating() {
            self.reject_busy("delete");
            return vec![];
        }
        tracing::info!("delete start: {id}");
        self.mutation = Some(Mutation::Delete);
        vec![Effect::DeleteStudent(id)]
    }
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new(&crate::config::UploadCfg::default().accepted_extensions)
    }
}
