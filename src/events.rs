//! 画面遷移用のUI状態と画面種別。

use crate::{notice::Notice, preview::Pager};

/// TUIで現在表示中の画面。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    /// フォームとプレビュー。
    Main,
    /// サーバー設定の編集。
    Settings,
    /// オペレーターの国選択。
    Countries,
}

/// 描画側と共有するUI状態。
#[derive(Clone, Debug)]
pub struct UiState {
    pub screen: Screen,
    /// フォームで選択中のフィールド位置。
    pub selected_field: usize,
    /// プレビューのページ位置。
    pub pager: Pager,
    /// 右側パネルに表示するログ。
    pub log: Vec<String>,
    /// 画面下部のステータス文言。
    pub status: String,
    /// 直近の通知（ステータスバーの色分け用）。
    pub last_notice: Option<Notice>,
    /// エラーメッセージ（強調表示用）。
    pub error: Option<String>,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Main,
            selected_field: 0,
            pager: Pager::default(),
            log: vec![],
            status: "Ready".into(),
            last_notice: None,
            error: None,
        }
    }

    /// 通知をログとステータスへ反映する。
    pub fn push_notice(&mut self, notice: Notice) {
        self.log.push(format!("[{}] {}", notice.tag(), notice.message));
        self.status = notice.message.clone();
        self.last_notice = Some(notice);
    }
}
