//! レイアウト計算のヘルパー関数

use ratatui::prelude::*;

/// メインレイアウトの4つの領域
pub struct MainLayout {
    /// タイトルと接続先URLの領域
    pub header: Rect,
    /// 一覧 + INFO Panelの領域
    pub body: Rect,
    /// HELPバーの領域
    pub help_bar: Rect,
    /// STATUSバーの領域
    pub status_bar: Rect,
}

/// ボディ部の2つの領域（一覧 + INFO Panel）
pub struct BodyLayout {
    /// 学生/履歴テーブルの領域
    pub table: Rect,
    /// INFO Panelの領域
    pub info_panel: Rect,
}

/// 画面を4つの領域に分割（Header + Body + HELP + STATUS）
pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // ヘッダー
            Constraint::Min(1),    // Body
            Constraint::Length(3), // HELPバー
            Constraint::Length(3), // STATUSバー
        ])
        .split(area);

    MainLayout {
        header: chunks[0],
        body: chunks[1],
        help_bar: chunks[2],
        status_bar: chunks[3],
    }
}

/// Body領域を2つに分割（テーブル 70% + INFO Panel 30%）
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    BodyLayout {
        table: chunks[0],
        info_panel: chunks[1],
    }
}
