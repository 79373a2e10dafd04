//! 画面遷移用のUI状態と画面種別。

/// TUIで現在表示中の画面。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// 学生一覧。
    Main,
    /// アップロード履歴。
    History,
}

/// 描画側と共有するUI状態（名簿そのものはストアが持つ）。
#[derive(Clone, Debug)]
pub struct UiState {
    /// 現在の画面。
    pub screen: Screen,
    /// 学生一覧の選択行。
    pub selected: usize,
    /// 履歴一覧の選択行。
    pub history_selected: usize,
    /// 編集モーダルでのフィールド位置。
    pub editing_field_idx: usize,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Main,
            selected: 0,
            history_selected: 0,
            editing_field_idx: 0,
        }
    }

    /// 一覧の再取得で件数が減っても選択行が範囲内に収まるようにする。
    pub fn clamp_selection(&mut self, roster_len: usize, history_len: usize) {
        self.selected = self.selected.min(roster_len.saturating_sub(1));
        self.history_selected = self.history_selected.min(history_len.saturating_sub(1));
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
