//! TUIのイベントループ、入力処理、状態管理。

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event};
use std::{path::PathBuf, time::Duration};
use tokio::sync::{broadcast, mpsc};

use crate::{
    config::Config,
    events::UiState,
    form::FormState,
    input::InputBoxState,
    shortcuts::Shortcuts,
    ui::Tui,
    widgets::{CountryPicker, DisclosureMenu},
    worker::{self, WorkerCmd, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// 入力処理と描画で共有するアプリ状態。
pub struct App {
    /// 永続化された設定ファイルのパス。
    pub cfg_path: PathBuf,
    /// メモリ上の現在設定。
    pub cfg: Config,
    /// 選択位置やステータスなどUI固有の状態。
    pub ui: UiState,
    /// Workerから届いた最新のフォーム。
    pub form: FormState,
    /// 実行中のアクション数。
    pub in_flight: usize,
    /// Workerへのコマンド送信チャネル。
    pub worker_tx: mpsc::Sender<WorkerCmd>,
    /// Workerからのイベント受信チャネル。
    pub worker_rx: mpsc::Receiver<WorkerEvent>,
    /// 端末フォーカス復帰の通知先（印刷後の後始末用）。
    pub focus_tx: broadcast::Sender<()>,

    // 設定画面の編集バッファ。
    pub base_url: String,
    pub database: String,
    pub login: String,
    pub password: String,

    /// 入力ボックスの状態（入力中はSome）。
    pub input_box: Option<InputBoxState>,
    /// 設定メニュー。
    pub menu: DisclosureMenu,
    /// 国選択リスト。
    pub picker: CountryPicker,

    /// ショートカットキー設定。
    pub shortcuts: Shortcuts,
}

impl App {
    /// 設定とWorkerとのチャネルから初期状態を組み立てる。
    pub fn new(
        cfg_path: PathBuf,
        cfg: Config,
        shortcuts: Shortcuts,
        worker_tx: mpsc::Sender<WorkerCmd>,
        worker_rx: mpsc::Receiver<WorkerEvent>,
        focus_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            cfg_path,
            base_url: cfg.odoo.base_url.clone(),
            database: cfg.odoo.database.clone(),
            login: cfg.odoo.login.clone(),
            password: cfg.odoo.password.clone(),
            cfg,
            ui: UiState::new(),
            form: FormState::default(),
            in_flight: 0,
            worker_tx,
            worker_rx,
            focus_tx,
            input_box: None,
            menu: DisclosureMenu::default(),
            picker: CountryPicker::default(),
            shortcuts,
        }
    }

    /// 実行中ならtrue。
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }
}

/// ユーザーが終了するまでメインTUIループを回す。
pub async fn run_app(terminal: &mut Tui) -> Result<()> {
    let cfg_path = PathBuf::from("config.toml");
    let cfg = Config::load_or_default(&cfg_path)?;

    let shortcuts_path = PathBuf::from("shortcut.toml");
    let shortcuts = Shortcuts::load_or_default(&shortcuts_path)?;

    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(64);
    let (tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(256);
    let (focus_tx, _) = broadcast::channel::<()>(16);

    tokio::spawn(worker::run(rx_cmd, tx_ev, cfg.clone(), focus_tx.clone()));

    let mut app = App::new(cfg_path, cfg, shortcuts, tx_cmd, rx_ev, focus_tx);

    loop {
        terminal.draw(|f| draw(f, &app))?;

        // 入力処理の前にWorkerイベントを消化する。
        while let Ok(ev) = app.worker_rx.try_recv() {
            handle_worker_event(&mut app, ev);
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(k) => {
                    if is_ctrl_c(&k) {
                        break;
                    }
                    if handle_key(&mut app, k).await? {
                        break;
                    }
                }
                Event::FocusGained => {
                    // 待機中の印刷セッションが無ければ受信者はいない。
                    let _ = app.focus_tx.send(());
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// WorkerイベントをUI状態へ反映する。
fn handle_worker_event(app: &mut App, ev: WorkerEvent) {
    match ev {
        WorkerEvent::FormUpdated(form) => {
            // コード列が入れ替わったらプレビューを先頭へ戻す。
            if form.access_codes() != app.form.access_codes() {
                app.ui.pager.reset();
            }
            app.form = form;
        }
        WorkerEvent::Notice(notice) => {
            app.ui.error = None;
            app.ui.push_notice(notice);
        }
        WorkerEvent::ActionFinished => {
            app.in_flight = app.in_flight.saturating_sub(1);
        }
        WorkerEvent::CountriesLoaded {
            countries,
            fallback,
        } => {
            app.picker = CountryPicker::new(countries, fallback);
        }
        WorkerEvent::Log(s) => {
            app.ui.log.push(s);
        }
        WorkerEvent::Error(s) => {
            app.ui.log.push(format!("[error] {s}"));
            app.ui.error = Some(s);
        }
    }
}

/// Workerへコマンドを送る。実行中のアクションがあれば新しいアクションは受け付けない。
pub async fn dispatch(app: &mut App, cmd: WorkerCmd) -> Result<()> {
    if cmd.is_action() {
        if app.is_busy() {
            app.ui.status = "Busy: wait for the current action to finish".into();
            return Ok(());
        }
        app.in_flight += 1;
        app.ui.status = "Working...".into();
    }
    tracing::debug!("dispatch {cmd:?}");
    let is_action = cmd.is_action();
    if let Err(e) = app.worker_tx.send(cmd).await {
        // Workerが終了済み（接続初期化の失敗など）。TUIは閉じずに知らせる。
        tracing::error!("worker is not running: {e}");
        if is_action {
            app.in_flight = app.in_flight.saturating_sub(1);
        }
        app.ui.error = Some("Worker stopped; check the log and restart the app".into());
    }
    Ok(())
}
