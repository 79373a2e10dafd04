//! TUIのイベントループ、入力処理、状態管理。

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::mpsc;

use crate::{
    api::{HttpStudentApi, StudentApi},
    config::{API_URL_ENV, Config},
    events::UiState,
    input::InputBoxState,
    shortcuts::Shortcuts,
    store::{Action, Effect, RosterStore},
    ui::Tui,
    worker,
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// 入力処理と描画で共有するアプリ状態。
pub struct App {
    /// 接続先のベースURL（ヘッダー表示用）。
    pub api_url: String,
    /// 選択位置や画面種別などUI固有の状態。
    pub ui: UiState,
    /// 名簿・履歴・編集ドラフト・ステータスを持つストア。
    pub store: RosterStore,
    /// Workerへのリクエスト送信チャネル。
    pub effect_tx: mpsc::Sender<Effect>,
    /// Workerからの完了通知の受信チャネル。
    pub action_rx: mpsc::Receiver<Action>,
    /// 入力ボックスの状態（入力中はSome）。
    pub input_box: Option<InputBoxState>,
    /// ショートカットキー設定。
    pub shortcuts: Shortcuts,
}

impl App {
    /// 設定とWorkerチャネルからアプリ状態を組み立てる。
    pub fn new(
        cfg: &Config,
        shortcuts: Shortcuts,
        effect_tx: mpsc::Sender<Effect>,
        action_rx: mpsc::Receiver<Action>,
    ) -> Self {
        Self {
            api_url: cfg.api.base_url.clone(),
            ui: UiState::new(),
            store: RosterStore::new(&cfg.upload.accepted_extensions),
            effect_tx,
            action_rx,
            input_box: None,
            shortcuts,
        }
    }

    /// ストアへアクションを適用し、発生したリクエストをWorkerへ送る。
    pub async fn dispatch(&mut self, action: Action) -> Result<()> {
        for effect in self.store.dispatch(action) {
            self.effect_tx.send(effect).await?;
        }
        // 再取得で件数が変わっても選択行を範囲内に保つ。
        self.ui
            .clamp_selection(self.store.roster().len(), self.store.history().len());
        Ok(())
    }
}

/// ユーザーが終了するまでメインTUIループを回す。
pub async fn run_app(terminal: &mut Tui) -> Result<()> {
    // 設定ファイルを読み込み、環境変数で接続先を上書きする。
    let cfg = Config::load_or_default(&PathBuf::from("config.toml"))?
        .with_api_url_override(std::env::var(API_URL_ENV).ok());
    let shortcuts = Shortcuts::load_or_default("shortcut.toml")?;
    tracing::info!("api base url: {}", cfg.api.base_url);

    // Worker通信用のチャネルを作り、HTTPクライアントでWorkerを起動する。
    let api: Arc<dyn StudentApi> = Arc::new(HttpStudentApi::new(&cfg.api)?);
    let (effect_tx, effect_rx) = mpsc::channel::<Effect>(64);
    let (action_tx, action_rx) = mpsc::channel::<Action>(256);
    tokio::spawn(worker::run(effect_rx, action_tx, api));

    let mut app = App::new(&cfg, shortcuts, effect_tx, action_rx);

    // 起動時に名簿と履歴を並行して取得する。
    app.dispatch(Action::RefreshRoster).await?;
    app.dispatch(Action::RefreshHistory).await?;

    loop {
        terminal.draw(|f| draw(f, &app))?;

        // 入力処理の前にWorkerの完了通知を1件ずつ適用する。
        while let Ok(action) = app.action_rx.try_recv() {
            app.dispatch(action).await?;
        }

        // UIの応答性確保のため短いタイムアウトで入力をポーリングする。
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
        {
            if is_ctrl_c(&k) {
                break;
            }
            if handle_key(&mut app, k).await? {
                break;
            }
        }
    }
    Ok(())
}
