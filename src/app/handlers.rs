//! キー入力ハンドラー関数。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::PathBuf;

use crate::{
    events::Screen,
    input::{InputBoxState, InputTarget},
    records::DraftField,
    shortcuts,
    store::Action,
};

use super::App;

/// キー入力を1件処理し、終了すべきならtrueを返す。
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 押下以外（リピート/リリース）は無視する。
    if k.kind != KeyEventKind::Press {
        return Ok(false);
    }

    // モーダル類は重なり順に優先して処理する。
    if app.input_box.is_some() {
        return handle_input_box_key(app, k).await;
    }
    if app.store.pending_delete().is_some() {
        return handle_confirm_key(app, k).await;
    }
    if app.store.draft().is_some() {
        return handle_edit_key(app, k).await;
    }

    match app.ui.screen {
        Screen::Main => handle_main_key(app, k).await,
        Screen::History => handle_history_key(app, k).await,
    }
}

/// Ctrl+Cかどうかを判定する。
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// 学生一覧画面のキー処理。
async fn handle_main_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.main;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if shortcuts::matches_shortcut(&k, &sc.refresh) {
        // 手動での再取得（接続失敗時のリトライも兼ねる）。
        app.dispatch(Action::RefreshRoster).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.upload) {
        // 変更処理中はストア側で案内を出し、入力ボックスは開かない。
        app.dispatch(Action::RequestUpload).await?;
        if !app.store.mutating() {
            let exts = app
                .store
                .accepted_extensions()
                .iter()
                .map(|e| format!(".{e}"))
                .collect::<Vec<_>>()
                .join("/");
            app.input_box = Some(InputBoxState::new(
                format!("File to upload ({exts}):"),
                "",
                InputTarget::UploadPath,
            ));
        }
    } else if shortcuts::matches_shortcut(&k, &sc.history) {
        app.ui.screen = Screen::History;
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        if app.ui.selected + 1 < app.store.roster().len() {
            app.ui.selected += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        app.ui.selected = app.ui.selected.saturating_sub(1);
    } else if shortcuts::matches_shortcut(&k, &sc.edit) {
        // 選択中のレコードをコピーして編集モーダルを開く。
        if let Some(record) = app.store.roster().get(app.ui.selected).cloned() {
            app.ui.editing_field_idx = 0;
            app.dispatch(Action::BeginEdit(record)).await?;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.delete)
        && let Some(record) = app.store.roster().get(app.ui.selected)
    {
        // 確認ダイアログを開く（まだ送信しない）。
        let id = record.id.clone();
        app.dispatch(Action::RequestDelete(id)).await?;
    }

    Ok(false)
}

/// 履歴画面のキー処理。
async fn handle_history_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.history;

    if shortcuts::matches_shortcut(&k, &sc.back) {
        app.ui.screen = Screen::Main;
    } else if shortcuts::matches_shortcut(&k, &sc.refresh) {
        app.dispatch(Action::RefreshHistory).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        if app.ui.history_selected + 1 < app.store.history().len() {
            app.ui.history_selected += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        app.ui.history_selected = app.ui.history_selected.saturating_sub(1);
    }

    Ok(false)
}

/// 編集モーダルのキー処理。
async fn handle_edit_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.edit;

    if shortcuts::matches_shortcut(&k, &sc.cancel) {
        app.dispatch(Action::CancelEdit).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.next_field) {
        app.ui.editing_field_idx = (app.ui.editing_field_idx + 1) % DraftField::ALL.len();
    } else if shortcuts::matches_shortcut(&k, &sc.save) {
        app.dispatch(Action::CommitEdit).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.edit_field)
        && let Some(session) = app.store.edit_session()
        && !session.saving
    {
        // 現在のフィールド値を入力ボックスへ読み込む。
        let field = DraftField::ALL[app.ui.editing_field_idx % DraftField::ALL.len()];
        let value = session.draft.field_value(field);
        app.input_box = Some(InputBoxState::new(
            format!("{}:", field.label()),
            value,
            InputTarget::Draft(field),
        ));
    }

    Ok(false)
}

/// 削除確認ダイアログのキー処理。
async fn handle_confirm_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.confirm;

    if shortcuts::matches_shortcut(&k, &sc.yes) {
        app.dispatch(Action::ConfirmDelete(true)).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.no) {
        app.dispatch(Action::ConfirmDelete(false)).await?;
    }

    Ok(false)
}

/// 入力ボックスのキー処理。
async fn handle_input_box_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let Some(input_state) = &mut app.input_box else {
        return Ok(false);
    };
    let sc = &app.shortcuts.input_box;

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        // 閉じてから値を反映する。
        let value = input_state.value.clone();
        let target = input_state.target;
        app.input_box = None;
        apply_input(app, target, value).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        app.input_box = None;
    } else if shortcuts::matches_shortcut(&k, &sc.backspace) {
        input_state.backspace();
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        input_state.delete();
    } else if shortcuts::matches_shortcut(&k, &sc.left) {
        input_state.move_left();
    } else if shortcuts::matches_shortcut(&k, &sc.right) {
        input_state.move_right();
    } else if shortcuts::matches_shortcut(&k, &sc.home) {
        input_state.move_home();
    } else if shortcuts::matches_shortcut(&k, &sc.end) {
        input_state.move_end();
    } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
        input_state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        input_state.insert_char(c);
    }

    Ok(false)
}

/// 入力ボックスの確定値を反映先へ渡す。
async fn apply_input(app: &mut App, target: InputTarget, value: String) -> Result<()> {
    match target {
        InputTarget::UploadPath => {
            // 空欄は「ファイル未選択」として扱う。
            let path = value.trim();
            let file = (!path.is_empty()).then(|| PathBuf::from(path));
            app.dispatch(Action::SubmitUpload(file)).await
        }
        InputTarget::Draft(field) => app.dispatch(Action::UpdateDraftField(field, value)).await,
    }
}
