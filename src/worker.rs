//! Background worker running store effects against the grade backend.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    api::{StudentApi, UploadFile},
    store::{Action, Effect},
};

/// Main worker loop: one task per effect, completions sent back as actions.
///
/// Requests are not serialized; fetches and mutations may overlap and their
/// completions arrive in whatever order the backend answers.
pub async fn run(
    mut rx: mpsc::Receiver<Effect>,
    tx: mpsc::Sender<Action>,
    api: Arc<dyn StudentApi>,
) {
    tracing::info!("worker started");
    while let Some(effect) = rx.recv().await {
        let api = Arc::clone(&api);
        let tx = tx.clone();
        tokio::spawn(async move {
            let action = execute(api.as_ref(), effect).await;
            // The UI has gone away when the receiver is closed.
            if tx.send(action).await.is_err() {
                tracing::debug!("completion dropped: ui closed");
            }
        });
    }
    tracing::info!("worker stopped");
}

/// Perform a single request and wrap its outcome as a completion action.
pub async fn execute(api: &dyn StudentApi, effect: Effect) -> Action {
    match effect {
        Effect::FetchRoster => {
            tracing::info!("GET students");
            Action::RosterLoaded(api.list_students().await)
        }
        Effect::FetchHistory => {
            tracing::info!("GET upload history");
            Action::HistoryLoaded(api.list_upload_history().await)
        }
        Effect::Upload(path) => {
            tracing::info!("POST upload: {}", path.display());
            let result = match UploadFile::read(&path).await {
                Ok(file) => api.upload(file).await,
                Err(e) => Err(e.context(format!("reading {}", path.display()))),
            };
            Action::UploadFinished(result)
        }
        Effect::SaveStudent { id, payload } => {
            tracing::info!("PUT student {id}");
            let result = api.update_student(&id, &payload).await;
            Action::SaveFinished { id, result }
        }
        Effect::DeleteStudent(id) => {
            tracing::info!("DELETE student {id}");
            let result = api.delete_student(&id).await;
            Action::DeleteFinished { id, result }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        records::{
            DraftField, RecordId, StudentPayload, StudentRecord, UploadHistoryEntry,
            UploadReceipt,
        },
        store::{RosterStore, StatusKind},
    };
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    /// In-memory backend; `fail_*` switches make the matching call fail.
    #[derive(Default)]
    struct StubApi {
        roster: Mutex<Vec<StudentRecord>>,
        fail_students: bool,
        fail_history: bool,
        fail_mutations: bool,
        calls: AtomicUsize,
        uploads: Mutex<Vec<UploadFile>>,
    }

    impl StubApi {
        fn with_roster(roster: Vec<StudentRecord>) -> Self {
            Self {
                roster: Mutex::new(roster),
                ..Self::default()
            }
        }

        fn call(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }

        fn mutation(&self) -> Result<()> {
            self.call();
            if self.fail_mutations {
                Err(anyhow!("HTTP status 500 Internal Server Error"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl StudentApi for StubApi {
        async fn list_students(&self) -> Result<Vec<StudentRecord>> {
            self.call();
            if self.fail_students {
                return Err(anyhow!("connection refused"));
            }
            Ok(self.roster.lock().unwrap().clone())
        }

        async fn list_upload_history(&self) -> Result<Vec<UploadHistoryEntry>> {
            self.call();
            if self.fail_history {
                return Err(anyhow!("connection refused"));
            }
            Ok(vec![])
        }

        async fn upload(&self, file: UploadFile) -> Result<UploadReceipt> {
            self.mutation()?;
            self.uploads.lock().unwrap().push(file);
            Ok(UploadReceipt { count: 2 })
        }

        async fn update_student(&self, id: &RecordId, payload: &StudentPayload) -> Result<()> {
            self.mutation()?;
            let mut roster = self.roster.lock().unwrap();
            if let Some(r) = roster.iter_mut().find(|r| &r.id == id) {
                r.student_name = payload.student_name.clone();
                r.total_marks = payload.total_marks;
                r.marks_obtained = payload.marks_obtained;
                r.percentage = payload.marks_obtained / payload.total_marks * 100.0;
            }
            Ok(())
        }

        async fn delete_student(&self, id: &RecordId) -> Result<()> {
            self.mutation()?;
            self.roster.lock().unwrap().retain(|r| &r.id != id);
            Ok(())
        }
    }

    fn student(id: &str, total: f64, obtained: f64) -> StudentRecord {
        StudentRecord {
            id: RecordId::from(id),
            student_id: format!("S-{id}"),
            student_name: "A".into(),
            total_marks: total,
            marks_obtained: obtained,
            percentage: obtained / total * 100.0,
        }
    }

    /// Apply an action and run every resulting effect to completion, in order.
    async fn drive(store: &mut RosterStore, api: &dyn StudentApi, action: Action) {
        let mut queue: VecDeque<Effect> = store.dispatch(action).into();
        while let Some(effect) = queue.pop_front() {
            let done = execute(api, effect).await;
            queue.extend(store.dispatch(done));
        }
    }

    fn assert_idle(store: &RosterStore) {
        assert!(!store.roster_busy());
        assert!(!store.history_busy());
        assert!(!store.mutating());
    }

    #[tokio::test]
    async fn edit_commit_reconciles_with_server_values() {
        let api = StubApi::with_roster(vec![student("1", 100.0, 50.0)]);
        let mut store = RosterStore::default();
        drive(&mut store, &api, Action::RefreshRoster).await;

        let record = store.roster()[0].clone();
        drive(&mut store, &api, Action::BeginEdit(record)).await;
        drive(
            &mut store,
            &api,
            Action::UpdateDraftField(DraftField::TotalMarks, "80".into()),
        )
        .await;
        drive(&mut store, &api, Action::CommitEdit).await;

        assert!(store.draft().is_none());
        assert_eq!(store.roster()[0].total_marks, 80.0);
        // Percentage comes from the server, not a local recomputation.
        assert_eq!(store.roster()[0].percentage, 62.5);
        assert_eq!(store.message().unwrap().kind, StatusKind::Success);
        assert_idle(&store);
    }

    #[tokio::test]
    async fn failing_backend_releases_every_busy_flag() {
        let api = StubApi {
            fail_students: true,
            fail_history: true,
            fail_mutations: true,
            ..StubApi::default()
        };
        let mut store = RosterStore::default();

        drive(&mut store, &api, Action::RefreshRoster).await;
        assert_idle(&store);
        drive(&mut store, &api, Action::RefreshHistory).await;
        assert_idle(&store);

        store.dispatch(Action::BeginEdit(student("1", 100.0, 50.0)));
        drive(&mut store, &api, Action::CommitEdit).await;
        assert_idle(&store);
        assert!(store.draft().is_some());

        store.dispatch(Action::RequestDelete(RecordId::from("1")));
        drive(&mut store, &api, Action::ConfirmDelete(true)).await;
        assert_idle(&store);
        assert_eq!(store.message().unwrap().kind, StatusKind::Error);
    }

    #[tokio::test]
    async fn declined_delete_makes_no_request() {
        let api = StubApi::with_roster(vec![student("1", 100.0, 50.0)]);
        let mut store = RosterStore::default();

        store.dispatch(Action::RequestDelete(RecordId::from("1")));
        drive(&mut store, &api, Action::ConfirmDelete(false)).await;

        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.roster.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn confirmed_delete_refetches_roster() {
        let api = StubApi::with_roster(vec![student("1", 100.0, 50.0), student("2", 10.0, 9.0)]);
        let mut store = RosterStore::default();
        drive(&mut store, &api, Action::RefreshRoster).await;

        store.dispatch(Action::RequestDelete(RecordId::from("1")));
        drive(&mut store, &api, Action::ConfirmDelete(true)).await;

        assert_eq!(store.roster(), api.roster.lock().unwrap().as_slice());
        assert_eq!(store.roster().len(), 1);
        assert_idle(&store);
    }

    #[tokio::test]
    async fn upload_reads_file_and_resyncs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grades.csv");
        std::fs::write(&path, "student_id,student_name\n1,A\n").unwrap();
        let api = StubApi::with_roster(vec![student("1", 100.0, 50.0)]);
        let mut store = RosterStore::default();

        drive(&mut store, &api, Action::SubmitUpload(Some(path))).await;

        let uploads = api.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].filename, "grades.csv");
        assert_eq!(store.roster().len(), 1);
        assert_eq!(store.message().unwrap().text, "Success! Uploaded 2 students");
        // upload + roster + history
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
        assert_idle(&store);
    }

    #[tokio::test]
    async fn unreadable_upload_file_is_an_upload_failure() {
        let dir = tempfile::tempdir().unwrap();
        let api = StubApi::default();
        let mut store = RosterStore::default();

        drive(
            &mut store,
            &api,
            Action::SubmitUpload(Some(dir.path().join("missing.csv"))),
        )
        .await;

        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.message().unwrap().kind, StatusKind::Error);
        assert_idle(&store);
    }

    #[tokio::test]
    async fn run_sends_completions_back() {
        let api: Arc<dyn StudentApi> = Arc::new(StubApi::with_roster(vec![student("1", 4.0, 2.0)]));
        let (effect_tx, effect_rx) = mpsc::channel(8);
        let (action_tx, mut action_rx) = mpsc::channel(8);
        let worker = tokio::spawn(run(effect_rx, action_tx, api));

        let mut store = RosterStore::default();
        let mut effects = store.dispatch(Action::RefreshRoster);
        effects.extend(store.dispatch(Action::RefreshHistory));
        for effect in effects {
            effect_tx.send(effect).await.unwrap();
        }
        for _ in 0..2 {
            let action = tokio::time::timeout(Duration::from_secs(5), action_rx.recv())
                .await
                .unwrap()
                .unwrap();
            store.dispatch(action);
        }

        assert_eq!(store.roster().len(), 1);
        assert_idle(&store);
        drop(effect_tx);
        worker.await.unwrap();
    }
}
