//! ショートカット設定の管理。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// ショートカット設定の全体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortcuts {
    pub main: MainShortcuts,
    pub history: HistoryShortcuts,
    pub edit: EditShortcuts,
    pub confirm: ConfirmShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// 学生一覧画面のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainShortcuts {
    pub quit: Vec<String>,
    pub refresh: Vec<String>,
    pub upload: Vec<String>,
    pub edit: Vec<String>,
    pub delete: Vec<String>,
    pub history: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
}

/// 履歴画面のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryShortcuts {
    pub back: Vec<String>,
    pub refresh: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
}

/// 編集モーダルのショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditShortcuts {
    pub cancel: Vec<String>,
    pub next_field: Vec<String>,
    pub edit_field: Vec<String>,
    pub save: Vec<String>,
}

/// 削除確認のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmShortcuts {
    pub yes: Vec<String>,
    pub no: Vec<String>,
}

/// InputBoxのショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

impl Shortcuts {
    /// TOMLから読み込み、無ければデフォルトを返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            main: MainShortcuts {
                quit: vec!["q".into()],
                refresh: vec!["r".into()],
                upload: vec!["u".into()],
                edit: vec!["Enter".into(), "e".into()],
                delete: vec!["d".into(), "Delete".into()],
                history: vec!["h".into()],
                down: vec!["Down".into(), "j".into()],
                up: vec!["Up".into(), "k".into()],
            },
            history: HistoryShortcuts {
                back: vec!["Esc".into(), "h".into()],
                refresh: vec!["r".into()],
                down: vec!["Down".into(), "j".into()],
                up: vec!["Up".into(), "k".into()],
            },
            edit: EditShortcuts {
                cancel: vec!["Esc".into()],
                next_field: vec!["Tab".into(), "Down".into()],
                edit_field: vec!["e".into()],
                save: vec!["Enter".into()],
            },
            confirm: ConfirmShortcuts {
                yes: vec!["y".into()],
                no: vec!["n".into(), "Esc".into()],
            },
            input_box: InputBoxShortcuts {
                confirm: vec!["Enter".into()],
                cancel: vec!["Esc".into()],
                backspace: vec!["Backspace".into()],
                delete: vec!["Delete".into()],
                left: vec!["Left".into()],
                right: vec!["Right".into()],
                home: vec!["Home".into()],
                end: vec!["End".into()],
                clear_line: vec!["Ctrl+u".into()],
            },
        }
    }
}

/// KeyEventがいずれかのショートカット文字列と一致するか判定する。
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts.iter().any(|s| matches_single_shortcut(key, s))
}

/// KeyEventが単一のショートカット文字列と一致するか判定する。
fn matches_single_shortcut(key: &KeyEvent, shortcut: &str) -> bool {
    // 末尾がキー名、それより前が修飾キー（例: "Ctrl+u"）。
    let mut parts = shortcut.rsplit('+');
    let Some(key_str) = parts.next() else {
        return false;
    };

    let mut expected_modifiers = KeyModifiers::empty();
    for modifier in parts {
        match modifier.to_ascii_lowercase().as_str() {
            "ctrl" => expected_modifiers |= KeyModifiers::CONTROL,
            "alt" => expected_modifiers |= KeyModifiers::ALT,
            "shift" => expected_modifiers |= KeyModifiers::SHIFT,
            _ => return false,
        }
    }

    // 大文字入力ではSHIFTが付くことがあるため、単一文字はSHIFTを無視する。
    let (actual, expected) = match key.code {
        KeyCode::Char(_) => (
            key.modifiers.difference(KeyModifiers::SHIFT),
            expected_modifiers.difference(KeyModifiers::SHIFT),
        ),
        _ => (key.modifiers, expected_modifiers),
    };
    if actual != expected {
        return false;
    }

    let code = match key_str.to_ascii_lowercase().as_str() {
        "enter" => KeyCode::Enter,
        "esc" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        _ => {
            let mut chars = key_str.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return false,
            }
        }
    };
    key.code == code
}
