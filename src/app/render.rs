//! TUI描画関連の関数。

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::{
    events::Screen,
    input::{self, centered_popup},
    layout,
    records::{DraftField, UploadStatus, format_number},
    shortcuts::Shortcuts,
    store::{EditSession, StatusKind},
};

use super::App;

/// 画面全体のレイアウトを描画する。
pub fn draw(f: &mut Frame, app: &App) {
    let main_layout = layout::create_main_layout(f.area());
    let body_layout = layout::create_body_layout(main_layout.body);

    // ヘッダー（タイトルと接続先）。
    let header = Paragraph::new(format!("Current API URL: {}", app.api_url)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Student Grade Management System"),
    );
    f.render_widget(header, main_layout.header);

    match app.ui.screen {
        Screen::Main => draw_students(f, app, body_layout.table),
        Screen::History => draw_history(f, app, body_layout.table),
    }

    let info_panel = Paragraph::new(build_info_text(app))
        .block(Block::default().borders(Borders::ALL).title("INFO"))
        .wrap(Wrap { trim: true });
    f.render_widget(info_panel, body_layout.info_panel);

    let help_bar = Paragraph::new(help_text(app, &app.shortcuts))
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_bar, main_layout.help_bar);

    f.render_widget(build_status_bar(app), main_layout.status_bar);

    // モーダルは下から順に重ねる。
    if let Some(session) = app.store.edit_session() {
        draw_edit_modal(f, app, session);
    }
    if app.store.pending_delete().is_some() {
        draw_confirm_delete(f, app);
    }
    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

/// 学生一覧テーブルを描画する。
fn draw_students(f: &mut Frame, app: &App, area: Rect) {
    let roster = app.store.roster();
    let title = format!("Students ({})", roster.len());

    // 空のときは読み込み中/未登録の案内を出す。
    if roster.is_empty() {
        let text = if app.store.roster_busy() {
            "Loading students data...".to_string()
        } else {
            format!(
                "No students found. Upload an Excel or CSV file to get started.\n\nPress {} to retry the connection.",
                format_keys(&app.shortcuts.main.refresh)
            )
        };
        let p = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        f.render_widget(p, area);
        return;
    }

    let rows = roster.iter().map(|s| {
        Row::new(vec![
            s.student_id.clone(),
            s.student_name.clone(),
            format_number(s.total_marks),
            format_number(s.marks_obtained),
            format!("{}%", format_number(s.percentage)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Min(12),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(title))
    .header(Row::new(vec!["Student ID", "Name", "Total", "Obtained", "Percent"]).bold())
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(255, 140, 0))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = TableState::default();
    state.select(Some(app.ui.selected));
    f.render_stateful_widget(table, area, &mut state);
}

/// アップロード履歴テーブルを描画する。
fn draw_history(f: &mut Frame, app: &App, area: Rect) {
    let history = app.store.history();
    let block = Block::default().borders(Borders::ALL).title("Upload History");

    if history.is_empty() {
        let text = if app.store.history_busy() {
            "Loading upload history..."
        } else {
            "No upload history found."
        };
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    // 失敗した行は赤で表示する。
    let rows = history.iter().map(|h| {
        let style = match h.status {
            UploadStatus::Error => Style::default().fg(Color::Red),
            UploadStatus::Success => Style::default().fg(Color::Green),
        };
        Row::new(vec![
            h.local_date_label(),
            h.filename.clone(),
            h.file_type.clone(),
            h.students_count.to_string(),
            h.size_label(),
            h.status_label().to_string(),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(19),
            Constraint::Min(12),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(8),
        ],
    )
    .block(block)
    .header(Row::new(vec!["Date & Time", "Filename", "Type", "Students", "Size", "Status"]).bold())
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    state.select(Some(app.ui.history_selected));
    f.render_stateful_widget(table, area, &mut state);
}

/// INFOパネルの文字列を構築する。
fn build_info_text(app: &App) -> String {
    match app.ui.screen {
        Screen::Main => match app.store.roster().get(app.ui.selected) {
            Some(s) => format!(
                "Student ID: {}\nName: {}\nTotal Marks: {}\nMarks Obtained: {}\nPercentage: {}%\n\nRecord: {}",
                s.student_id,
                s.student_name,
                format_number(s.total_marks),
                format_number(s.marks_obtained),
                format_number(s.percentage),
                s.id,
            ),
            None => "No student selected".to_string(),
        },
        Screen::History => {
            let history = app.store.history();
            let ok = history.iter().filter(|h| h.status == UploadStatus::Success).count();
            format!(
                "Uploads: {}\nSucceeded: {}\nFailed: {}",
                history.len(),
                ok,
                history.len() - ok
            )
        }
    }
}

/// ステータスバーを構築する。
fn build_status_bar(app: &App) -> Paragraph<'static> {
    // 実行中の処理を短いラベルで並べる。
    let mut busy = vec![];
    if app.store.roster_busy() {
        busy.push("loading students");
    }
    if app.store.history_busy() {
        busy.push("loading history");
    }
    if let Some(mutation) = app.store.mutation() {
        busy.push(mutation.label());
    }
    let busy = if busy.is_empty() {
        String::new()
    } else {
        format!("[{}] ", busy.join(", "))
    };

    let (text, style) = match app.store.message() {
        Some(m) => {
            let color = match m.kind {
                StatusKind::Success => Color::Green,
                StatusKind::Info => Color::Yellow,
                StatusKind::Error => Color::Red,
            };
            (format!("{busy}{}", m.text), Style::default().fg(color))
        }
        None => (format!("{busy}Ready"), Style::default()),
    };

    Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .style(style)
        .wrap(Wrap { trim: true })
}

/// 編集モーダルを描画する。
fn draw_edit_modal(f: &mut Frame, app: &App, session: &EditSession) {
    let area = centered_popup(f.area(), 60, 10);
    f.render_widget(Clear, area);

    let draft = &session.draft;
    let mut lines = vec![format!("Student ID: {}", draft.student_id), String::new()];
    for (i, field) in DraftField::ALL.iter().enumerate() {
        let marker = if i == app.ui.editing_field_idx { "→" } else { " " };
        lines.push(format!("{marker} {}: {}", field.label(), draft.field_value(*field)));
    }
    lines.push(String::new());
    if session.saving {
        lines.push("Saving...".into());
    } else {
        lines.push(format!(
            "{}: edit | {}: next | {}: save | {}: cancel",
            format_keys(&app.shortcuts.edit.edit_field),
            format_keys(&app.shortcuts.edit.next_field),
            format_keys(&app.shortcuts.edit.save),
            format_keys(&app.shortcuts.edit.cancel),
        ));
    }

    let modal = Paragraph::new(lines.join("\n"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Edit Student")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(modal, area);
}

/// 削除確認ダイアログを描画する。
fn draw_confirm_delete(f: &mut Frame, app: &App) {
    let area = centered_popup(f.area(), 50, 5);
    f.render_widget(Clear, area);

    let text = format!(
        "Are you sure you want to delete this student?\n{}: yes | {}: no",
        format_keys(&app.shortcuts.confirm.yes),
        format_keys(&app.shortcuts.confirm.no),
    );
    let dialog = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm")
                .style(Style::default().fg(Color::Red)),
        );
    f.render_widget(dialog, area);
}

/// 現在画面に応じたヘルプ文字列を返す。
fn help_text(app: &App, shortcuts: &Shortcuts) -> String {
    match app.ui.screen {
        Screen::Main => format!(
            "{}: quit | {}: refresh | {}: upload | {}: edit | {}: delete | {}: history | {}/{}: navigate",
            format_keys(&shortcuts.main.quit),
            format_keys(&shortcuts.main.refresh),
            format_keys(&shortcuts.main.upload),
            format_keys(&shortcuts.main.edit),
            format_keys(&shortcuts.main.delete),
            format_keys(&shortcuts.main.history),
            format_keys(&shortcuts.main.up),
            format_keys(&shortcuts.main.down),
        ),
        Screen::History => format!(
            "{}: back | {}: refresh | {}/{}: navigate",
            format_keys(&shortcuts.history.back),
            format_keys(&shortcuts.history.refresh),
            format_keys(&shortcuts.history.up),
            format_keys(&shortcuts.history.down),
        ),
    }
}

/// ショートカットキーの配列を表示用文字列に変換する。
fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, records::UploadHistoryEntry, store::Action};
    use ratatui::{Terminal, backend::TestBackend};
    use tokio::sync::mpsc;

    fn app() -> App {
        let (effect_tx, _) = mpsc::channel(4);
        let (_, action_rx) = mpsc::channel(4);
        App::new(&Config::default(), Shortcuts::default(), effect_tx, action_rx)
    }

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_empty_roster_shows_retry_hint() {
        // 取得失敗後の空表示にリトライ案内が出る。
        let mut app = app();
        app.store.dispatch(Action::RefreshRoster);
        app.store
            .dispatch(Action::RosterLoaded(Err(anyhow::anyhow!("refused"))));

        let text = screen_text(&app);
        assert!(text.contains("Press r to retry"));
        assert!(text.contains("Failed to connect to server"));
    }

    #[test]
    fn test_status_bar_names_running_change() {
        // 実行中の変更処理の種類がステータスに表示される。
        let mut app = app();
        app.store
            .dispatch(Action::SubmitUpload(Some("term1.csv".into())));

        let text = screen_text(&app);
        assert!(text.contains("[uploading]"));
        assert!(!text.contains("saving"));
    }

    #[test]
    fn test_history_screen_lists_entries() {
        // 履歴画面に取り込み件数と状態が表示される。
        let mut app = app();
        let entry: UploadHistoryEntry = serde_json::from_str(
            r#"{"upload_date":"2024-03-01T10:00:00Z","filename":"term1.xlsx",
                "file_type":"xlsx","file_size":10240,"students_count":30,"status":"success"}"#,
        )
        .unwrap();
        app.store.dispatch(Action::RefreshHistory);
        app.store.dispatch(Action::HistoryLoaded(Ok(vec![entry])));
        app.ui.screen = Screen::History;

        let text = screen_text(&app);
        assert!(text.contains("term1.xlsx"));
        assert!(text.contains("10.0 KB"));
        assert!(text.contains("Success"));
    }
}
