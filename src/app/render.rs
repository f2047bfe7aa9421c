//! TUI描画関連の関数。

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::{
    events::Screen,
    form::FormField,
    input, layout,
    notice::NoticeLevel,
    preview::{self, PreviewCard},
    shortcuts::Shortcuts,
    widgets::{country_picker, menu},
};

use super::App;

/// 画面全体のレイアウトを描画する。
pub fn draw(f: &mut Frame, app: &App) {
    let main_layout = layout::create_main_layout(f.area());

    if app.ui.screen == Screen::Countries {
        country_picker::render_country_picker(f, main_layout.body, &app.picker);
    } else {
        let body_layout = layout::create_body_layout(main_layout.body);
        draw_form_panel(f, app, body_layout.form_panel);
        draw_preview_panel(f, app, body_layout.preview_panel);

        let info_text = if app.ui.screen == Screen::Settings {
            build_settings_info_text(app)
        } else {
            build_main_info_text(app)
        };
        let info_panel = Paragraph::new(info_text)
            .block(Block::default().borders(Borders::ALL).title("INFO"))
            .wrap(Wrap { trim: true });
        f.render_widget(info_panel, body_layout.info_panel);
    }

    let help_text = get_help_text(&app.ui.screen, &app.shortcuts);
    let help_bar = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_bar, main_layout.help_bar);

    f.render_widget(build_status_bar(app), main_layout.status_bar);

    // ポップアップは最後に重ねる。
    menu::render_menu(f, &app.menu);
    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

/// フォームのフィールド一覧を描画する。
fn draw_form_panel(f: &mut Frame, app: &App, area: Rect) {
    let mut items: Vec<ListItem> = FormField::ALL
        .iter()
        .map(|field| {
            let value = app.form.value_of(*field);
            let value = if value.is_empty() { "-".to_string() } else { value };
            let hint = if field.is_choice() { " ⇄" } else { "" };
            ListItem::new(format!("{:<14}{}{}", field.label(), value, hint))
        })
        .collect();

    let file = app
        .form
        .selected_file
        .as_ref()
        .map(|f| f.name.clone())
        .unwrap_or_else(|| "(no file)".into());
    items.push(ListItem::new(""));
    items.push(ListItem::new(format!("{:<14}{}", "Excel file", file)));

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("FORM"))
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(255, 140, 0))
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
    let mut state = ListState::default();
    if app.ui.screen == Screen::Main {
        state.select(Some(app.ui.selected_field));
    }
    f.render_stateful_widget(list, area, &mut state);
}

/// 現在ページのカードを描画する。
fn draw_preview_panel(f: &mut Frame, app: &App, area: Rect) {
    let cards = preview::cards(&app.form);
    let (title, text) = match app.ui.pager.current(cards.len()) {
        Some(i) => (format!("PREVIEW ({})", cards[i].page_label()), card_text(&cards[i])),
        None => ("PREVIEW".to_string(), "No codes yet.\n\ng: generate | i: import".to_string()),
    };
    let panel = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true });
    f.render_widget(panel, area);
}

fn card_text(card: &PreviewCard) -> String {
    format!(
        "Access Code\n  {}\n\nBooking:  {}\nFrom:     {}\nPrice:    {}\nBottle:   {}\nExpires:  {}",
        card.code,
        card.booking_code,
        card.booking_from,
        card.booking_price,
        card.bottle_size,
        card.expiry,
    )
}

/// メイン画面用の情報テキストを構築する。
fn build_main_info_text(app: &App) -> String {
    let country = if app.cfg.operator.country_name.is_empty() {
        "-"
    } else {
        app.cfg.operator.country_name.as_str()
    };
    let mode = if app.cfg.workflow.custom_mode {
        "on"
    } else {
        "off"
    };
    format!(
        "Server: {}\nDB: {}\nCountry: {}\nCustom POS mode: {}\nDownloads: {}\nQR text: {}\n\nLog:\n{}",
        app.cfg.odoo.base_url,
        app.cfg.odoo.database,
        country,
        mode,
        app.cfg.output.download_dir,
        app.form.qr_code_text().unwrap_or("-"),
        app.ui
            .log
            .iter()
            .rev()
            .take(10)
            .rev()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// 設定画面用の情報テキストを構築する（パスワードは伏せる）。
fn build_settings_info_text(app: &App) -> String {
    format!(
        "Server settings\n\nURL: {}\nDatabase: {}\nLogin: {}\nPassword: {}",
        app.base_url,
        app.database,
        app.login,
        "*".repeat(app.password.chars().count()),
    )
}

/// ステータスバーを構築する。
fn build_status_bar(app: &App) -> Paragraph<'static> {
    let screen_name = match app.ui.screen {
        Screen::Main => "Main",
        Screen::Settings => "Settings",
        Screen::Countries => "Country",
    };
    let busy = if app.is_busy() { " | BUSY" } else { "" };
    let codes = format!("Codes: {}{}", app.form.total_pages(), busy);

    let status_text = if let Some(err) = &app.ui.error {
        format!("[{}] {} | ERROR: {}", screen_name, codes, err)
    } else {
        format!("[{}] {} | {}", screen_name, codes, app.ui.status)
    };

    let color = match (&app.ui.error, &app.ui.last_notice) {
        (Some(_), _) => Some(Color::Red),
        (None, Some(n)) => Some(match n.level {
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Info => Color::Cyan,
            NoticeLevel::Warning => Color::Yellow,
            NoticeLevel::Danger => Color::Red,
        }),
        (None, None) => None,
    };

    let mut status_bar = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .wrap(Wrap { trim: true });
    if let Some(color) = color {
        status_bar = status_bar.style(Style::default().fg(color));
    }
    status_bar
}

/// 現在画面に応じたヘルプ文字列を返す。
fn get_help_text(screen: &Screen, shortcuts: &Shortcuts) -> String {
    match screen {
        Screen::Main => {
            let sc = &shortcuts.main;
            format!(
                "{}/{}: field | {}: edit | {}: generate | {}: file | {}: clear file | {}: import | {}: template | {}: download | {}: print | {}/{}: page | {}: menu | {}: quit",
                format_keys(&sc.up),
                format_keys(&sc.down),
                format_keys(&sc.edit),
                format_keys(&sc.generate),
                format_keys(&sc.select_file),
                format_keys(&sc.clear_file),
                format_keys(&sc.import),
                format_keys(&sc.template),
                format_keys(&sc.download),
                format_keys(&sc.print),
                format_keys(&sc.prev_page),
                format_keys(&sc.next_page),
                format_keys(&sc.menu),
                format_keys(&sc.quit),
            )
        }
        Screen::Settings => {
            let sc = &shortcuts.settings;
            format!(
                "{}: URL | {}: database | {}: login | {}: password | {}: save | {}: cancel",
                format_keys(&sc.base_url),
                format_keys(&sc.database),
                format_keys(&sc.login),
                format_keys(&sc.password),
                format_keys(&sc.save),
                format_keys(&sc.cancel),
            )
        }
        Screen::Countries => {
            let sc = &shortcuts.countries;
            format!(
                "type to filter | {}: erase | {}/{}: move | {}: select | {}: back",
                format_keys(&sc.erase),
                format_keys(&sc.up),
                format_keys(&sc.down),
                format_keys(&sc.select),
                format_keys(&sc.cancel),
            )
        }
    }
}

/// ショートカットキーの配列を表示用文字列に変換する。
fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}
