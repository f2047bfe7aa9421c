//! 設定メニュー（ディスクロージャ型）の状態と描画。

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState},
};

/// メニュー項目。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuItem {
    /// サーバー設定画面へ。
    ServerSettings,
    /// オペレーターの国を選ぶ。
    OperatorCountry,
    /// メニューを閉じる。
    Close,
}

impl MenuItem {
    pub const ALL: [MenuItem; 3] = [
        MenuItem::ServerSettings,
        MenuItem::OperatorCountry,
        MenuItem::Close,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuItem::ServerSettings => "Server settings",
            MenuItem::OperatorCountry => "Operator country",
            MenuItem::Close => "Close",
        }
    }
}

/// 開閉状態とフォーカス位置。
///
/// 開いた直後はどの項目にもフォーカスしない。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisclosureMenu {
    open: bool,
    focused: Option<usize>,
}

impl DisclosureMenu {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        if self.open {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn open(&mut self) {
        self.open = true;
        self.focused = None;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.focused = None;
    }

    /// 次の項目へ（末尾の次は先頭）。
    pub fn next(&mut self) {
        if !self.open {
            return;
        }
        let len = MenuItem::ALL.len();
        self.focused = Some(match self.focused {
            Some(i) => (i + 1) % len,
            None => 0,
        });
    }

    /// 前の項目へ（先頭の前は末尾）。
    pub fn prev(&mut self) {
        if !self.open {
            return;
        }
        let len = MenuItem::ALL.len();
        self.focused = Some(match self.focused {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        });
    }

    /// Escで閉じる。
    pub fn escape(&mut self) {
        self.close();
    }

    pub fn focused(&self) -> Option<MenuItem> {
        self.focused.map(|i| MenuItem::ALL[i])
    }
}

/// メニューを右上のポップアップとして描画する。
pub fn render_menu(f: &mut Frame, menu: &DisclosureMenu) {
    if !menu.is_open() {
        return;
    }
    let area = f.area();
    let width = 28.min(area.width);
    let height = (MenuItem::ALL.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width),
        y: area.y,
        width,
        height,
    };

    f.render_widget(Clear, popup);
    let items: Vec<ListItem> = MenuItem::ALL
        .iter()
        .map(|item| ListItem::new(item.label()))
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Menu"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(menu.focused);
    f.render_stateful_widget(list, popup, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_has_no_focus() {
        let mut menu = DisclosureMenu::default();
        assert!(!menu.is_open());
        menu.toggle();
        assert!(menu.is_open());
        assert_eq!(menu.focused(), None);
        menu.toggle();
        assert!(!menu.is_open());
    }

    #[test]
    fn test_next_prev_wrap() {
        let mut menu = DisclosureMenu::default();
        menu.open();
        menu.next();
        assert_eq!(menu.focused(), Some(MenuItem::ServerSettings));
        menu.next();
        menu.next();
        assert_eq!(menu.focused(), Some(MenuItem::Close));
        menu.next();
        assert_eq!(menu.focused(), Some(MenuItem::ServerSettings));
        menu.prev();
        assert_eq!(menu.focused(), Some(MenuItem::Close));
    }

    #[test]
    fn test_prev_from_nothing_goes_to_last() {
        let mut menu = DisclosureMenu::default();
        menu.open();
        menu.prev();
        assert_eq!(menu.focused(), Some(MenuItem::Close));
    }

    #[test]
    fn test_escape_closes_and_clears_focus() {
        let mut menu = DisclosureMenu::default();
        menu.open();
        menu.next();
        menu.escape();
        assert!(!menu.is_open());
        assert_eq!(menu.focused(), None);
        // 閉じている間は移動しない。
        menu.next();
        assert_eq!(menu.focused(), None);
    }
}
