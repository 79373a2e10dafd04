//! TUI内での文字列入力コンポーネント（InputBox）とポップアップ配置。

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::records::DraftField;

/// InputBox入力状態
#[derive(Clone, Debug)]
pub struct InputBoxState {
    /// プロンプトメッセージ
    pub prompt: String,
    /// 現在の入力値
    pub value: String,
    /// カーソル位置（文字単位）
    pub cursor: usize,
    /// 入力完了時の反映先
    pub target: InputTarget,
}

/// 入力完了時に値を渡す先
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputTarget {
    /// アップロードするファイルのパス
    UploadPath,
    /// 編集中ドラフトの項目
    Draft(DraftField),
}

impl InputBoxState {
    /// 初期値を入れ、カーソルを末尾に置いた状態で開く。
    pub fn new(prompt: impl Into<String>, value: impl Into<String>, target: InputTarget) -> Self {
        let value = value.into();
        Self {
            prompt: prompt.into(),
            cursor: value.chars().count(),
            value,
            target,
        }
    }

    /// 文字位置をバイト位置へ変換する。
    fn byte_at(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// 文字を挿入
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_at(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Backspace（カーソル前の文字を削除）
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_at(self.cursor);
        self.value.remove(at);
    }

    /// Delete（カーソル位置の文字を削除）
    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }

    /// カーソルを左に移動
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// カーソルを右に移動
    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    /// カーソルを先頭に移動
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// カーソルを末尾に移動
    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// 行全体をクリア
    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// 表示幅に収まる範囲とカーソル記号を含む文字列を作る。
    fn visible_with_cursor(&self, width: usize) -> String {
        // カーソルが右端を超えたら横スクロールする。
        let offset = self.cursor.saturating_sub(width.saturating_sub(2));
        let chars: Vec<char> = self.value.chars().skip(offset).take(width).collect();
        let at = (self.cursor - offset).min(chars.len());
        let before: String = chars[..at].iter().collect();
        let after: String = chars[at..].iter().collect();
        format!("{before}|{after}")
    }
}

/// InputBoxをポップアップとして描画
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    let popup_area = centered_popup(f.area(), 70, 7);

    // 既存の描画を消してポップアップ用の背景にする。
    f.render_widget(Clear, popup_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Input")
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    let inner_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // プロンプト
            Constraint::Length(1), // 入力フィールド
            Constraint::Length(1), // 空行
            Constraint::Length(1), // ヘルプ
        ])
        .split(popup_area);

    let prompt_widget = Paragraph::new(state.prompt.clone()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(prompt_widget, inner_layout[0]);

    let text = state.visible_with_cursor(inner_layout[1].width as usize);
    let input_widget = Paragraph::new(text).style(Style::default().fg(Color::Green));
    f.render_widget(input_widget, inner_layout[1]);

    let help = Paragraph::new("Enter=確定 | ESC=キャンセル | Ctrl+U=クリア")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, inner_layout[3]);
}

/// 中央配置のポップアップ領域を計算
pub fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    // 縦方向の余白を作り、中央行を取り出す。
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    // 横方向も中央に寄せてポップアップ領域を返す。
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(value: &str) -> InputBoxState {
        InputBoxState::new("Path:", value, InputTarget::UploadPath)
    }

    #[test]
    fn test_insert_and_delete_multibyte() {
        // マルチバイト文字でも文字単位で編集できることを検証する。
        let mut s = boxed("成績.csv");
        s.move_home();
        s.move_right();
        s.insert_char('表');
        assert_eq!(s.value, "成表績.csv");
        s.backspace();
        assert_eq!(s.value, "成績.csv");
        s.delete();
        assert_eq!(s.value, "成.csv");
        assert_eq!(s.cursor, 1);
    }

    #[test]
    fn test_cursor_bounds() {
        // カーソルが範囲外に出ないことを検証する。
        let mut s = boxed("ab");
        s.move_right();
        assert_eq!(s.cursor, 2);
        s.move_home();
        s.move_left();
        assert_eq!(s.cursor, 0);
        s.backspace();
        assert_eq!(s.value, "ab");
        s.clear_line();
        assert!(s.value.is_empty());
        assert_eq!(s.cursor, 0);
    }

    #[test]
    fn test_visible_with_cursor_scrolls() {
        // 表示幅を超えたらカーソル付近が見えるようにスクロールする。
        let s = boxed("abcdefghij");
        assert_eq!(s.visible_with_cursor(6), "ghij|");
        let mut s = boxed("abc");
        s.move_home();
        assert_eq!(s.visible_with_cursor(10), "|abc");
    }
}
