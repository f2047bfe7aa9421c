//! 国選択リスト：部分一致フィルタとカーソル。

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::odoo::countries::Country;

/// 読み込んだ国一覧と絞り込み状態。
#[derive(Clone, Debug, Default)]
pub struct CountryPicker {
    countries: Vec<Country>,
    filter: String,
    cursor: usize,
    /// 組み込みリストを使っているか。
    pub fallback: bool,
}

impl CountryPicker {
    pub fn new(countries: Vec<Country>, fallback: bool) -> Self {
        Self {
            countries,
            filter: String::new(),
            cursor: 0,
            fallback,
        }
    }

    pub fn is_loaded(&self) -> bool {
        !self.countries.is_empty()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// 絞り込み文字列を変え、カーソルを先頭に戻す。
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        self.cursor = 0;
    }

    pub fn push_filter(&mut self, c: char) {
        self.filter.push(c);
        self.cursor = 0;
    }

    pub fn pop_filter(&mut self) {
        self.filter.pop();
        self.cursor = 0;
    }

    /// 名前に絞り込み文字列を含む国（大文字小文字は区別しない）。
    pub fn filtered(&self) -> Vec<&Country> {
        let needle = self.filter.to_lowercase();
        self.countries
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn down(&mut self) {
        let len = self.filtered().len();
        if len > 0 && self.cursor + 1 < len {
            self.cursor += 1;
        }
    }

    pub fn up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// カーソル位置の国。
    pub fn selected(&self) -> Option<Country> {
        self.filtered().get(self.cursor).map(|c| (*c).clone())
    }
}

/// 国選択画面を描画する。
pub fn render_country_picker(f: &mut Frame, area: Rect, picker: &CountryPicker) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let search = Paragraph::new(format!("{}|", picker.filter()))
        .block(Block::default().borders(Borders::ALL).title("Search"));
    f.render_widget(search, chunks[0]);

    let title = if !picker.is_loaded() {
        "Countries (loading...)".to_string()
    } else if picker.fallback {
        "Countries (offline list)".to_string()
    } else {
        "Countries".to_string()
    };
    let items: Vec<ListItem> = picker
        .filtered()
        .into_iter()
        .map(|c| ListItem::new(c.name.clone()))
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if picker.is_loaded() {
        state.select(Some(picker.cursor()));
    }
    f.render_stateful_widget(list, chunks[1], &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odoo::countries::fallback_countries;

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let mut picker = CountryPicker::new(fallback_countries(), true);
        picker.set_filter("AN");
        let names: Vec<&str> = picker.filtered().iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"Canada"));
        assert!(names.contains(&"France"));
        assert!(!names.contains(&"United States"));
    }

    #[test]
    fn test_cursor_stays_in_filtered_list() {
        let mut picker = CountryPicker::new(fallback_countries(), true);
        picker.set_filter("united");
        let len = picker.filtered().len();
        for _ in 0..10 {
            picker.down();
        }
        assert_eq!(picker.cursor(), len - 1);
        picker.push_filter('x');
        assert_eq!(picker.cursor(), 0);
        assert_eq!(picker.selected(), None);
    }

    #[test]
    fn test_select_returns_country() {
        let mut picker = CountryPicker::new(fallback_countries(), false);
        picker.set_filter("indo");
        let chosen = picker.selected().unwrap();
        assert_eq!(chosen.name, "Indonesia");
        picker.pop_filter();
        picker.up();
        assert_eq!(picker.cursor(), 0);
    }
}
