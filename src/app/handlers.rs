//! キー入力ハンドラー関数。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;

use crate::{
    events::Screen,
    form::FormField,
    input::{InputBoxState, InputCallbackId},
    shortcuts,
    widgets::MenuItem,
    worker::WorkerCmd,
};

use super::{App, dispatch};

/// キー入力を1件処理し、終了すべきならtrueを返す。
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 入力ボックスが開いていれば最優先で処理する。
    if app.input_box.is_some() {
        return handle_input_box_key(app, k).await;
    }
    if app.menu.is_open() {
        return handle_menu_key(app, k).await;
    }

    match app.ui.screen {
        Screen::Main => handle_main_key(app, k).await,
        Screen::Settings => handle_settings_key(app, k).await,
        Screen::Countries => handle_countries_key(app, k),
    }
}

/// Ctrl+Cかどうかを判定する。
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// メイン画面のキー処理。
async fn handle_main_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = app.shortcuts.main.clone();
    let field_count = FormField::ALL.len();

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if shortcuts::matches_shortcut(&k, &sc.menu) {
        app.menu.toggle();
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        app.ui.selected_field = (app.ui.selected_field + 1) % field_count;
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        app.ui.selected_field = (app.ui.selected_field + field_count - 1) % field_count;
    } else if shortcuts::matches_shortcut(&k, &sc.edit) {
        let field = FormField::ALL[app.ui.selected_field];
        if let Some(value) = app.form.next_choice(field) {
            // 選択式のフィールドは次の候補へ切り替える。
            dispatch(app, WorkerCmd::Edit { field, value }).await?;
        } else {
            app.input_box = Some(InputBoxState::new(
                format!("{}:", field.label()),
                app.form.value_of(field),
                InputCallbackId::Form(field),
            ));
        }
    } else if shortcuts::matches_shortcut(&k, &sc.select_file) {
        let current = app
            .form
            .selected_file
            .as_ref()
            .map(|f| f.path.display().to_string())
            .unwrap_or_default();
        app.input_box = Some(InputBoxState::new(
            "Excel file path (.xlsx):",
            current,
            InputCallbackId::ImportFile,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.clear_file) {
        dispatch(app, WorkerCmd::ClearFile).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.generate) {
        dispatch(app, WorkerCmd::GenerateSingle).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.import) {
        dispatch(app, WorkerCmd::BulkImport).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.template) {
        dispatch(app, WorkerCmd::ExportTemplate).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.download) {
        dispatch(app, WorkerCmd::DownloadPdf).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.print) {
        dispatch(app, WorkerCmd::PrintPdf).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.next_page) {
        app.ui.pager.next(app.form.total_pages());
    } else if shortcuts::matches_shortcut(&k, &sc.prev_page) {
        app.ui.pager.prev(app.form.total_pages());
    }

    Ok(false)
}

/// 設定メニューのキー処理。
async fn handle_menu_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.menu;

    if shortcuts::matches_shortcut(&k, &sc.close) {
        app.menu.escape();
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        app.menu.next();
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        app.menu.prev();
    } else if shortcuts::matches_shortcut(&k, &sc.select) {
        let chosen = app.menu.focused();
        app.menu.close();
        match chosen {
            Some(MenuItem::ServerSettings) => {
                reload_settings_buffers(app);
                app.ui.screen = Screen::Settings;
                app.ui.status = "Settings".into();
            }
            Some(MenuItem::OperatorCountry) => {
                app.picker.set_filter("");
                app.ui.screen = Screen::Countries;
                if !app.picker.is_loaded() {
                    dispatch(app, WorkerCmd::LoadCountries).await?;
                }
            }
            Some(MenuItem::Close) | None => {}
        }
    }

    Ok(false)
}

/// 設定画面のキー処理。
async fn handle_settings_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.settings;

    if shortcuts::matches_shortcut(&k, &sc.cancel) {
        // 変更を破棄してメイン画面へ戻る。
        reload_settings_buffers(app);
        app.ui.screen = Screen::Main;
    } else if shortcuts::matches_shortcut(&k, &sc.save) {
        app.cfg.odoo.base_url = app.base_url.trim().to_string();
        app.cfg.odoo.database = app.database.clone();
        app.cfg.odoo.login = app.login.clone();
        app.cfg.odoo.password = app.password.clone();
        app.cfg.save(&app.cfg_path)?;

        // Workerは新しい設定で接続し直す（入力中のフォームは保持）。
        dispatch(app, WorkerCmd::SaveSettings(app.cfg.clone())).await?;
        app.ui.screen = Screen::Main;
        app.ui.status = "Saved settings".into();
    } else if shortcuts::matches_shortcut(&k, &sc.base_url) {
        app.input_box = Some(InputBoxState::new(
            "Server URL:",
            app.base_url.clone(),
            InputCallbackId::SettingsBaseUrl,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.database) {
        app.input_box = Some(InputBoxState::new(
            "Database:",
            app.database.clone(),
            InputCallbackId::SettingsDatabase,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.login) {
        app.input_box = Some(InputBoxState::new(
            "Login:",
            app.login.clone(),
            InputCallbackId::SettingsLogin,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.password) {
        app.input_box = Some(
            InputBoxState::new(
                "Password:",
                app.password.clone(),
                InputCallbackId::SettingsPassword,
            )
            .masked(),
        );
    }

    Ok(false)
}

/// 国選択画面のキー処理。文字キーは絞り込みに使う。
fn handle_countries_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.countries;

    if shortcuts::matches_shortcut(&k, &sc.cancel) {
        app.ui.screen = Screen::Main;
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        app.picker.down();
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        app.picker.up();
    } else if shortcuts::matches_shortcut(&k, &sc.erase) {
        app.picker.pop_filter();
    } else if shortcuts::matches_shortcut(&k, &sc.select) {
        if let Some(country) = app.picker.selected() {
            tracing::info!("operator country set: {} ({})", country.name, country.id);
            app.cfg.operator.country_id = Some(country.id);
            app.cfg.operator.country_name = country.name.clone();
            app.cfg.save(&app.cfg_path)?;
            app.ui.status = format!("Country set: {}", country.name);
            app.ui.screen = Screen::Main;
        }
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        app.picker.push_filter(c);
    }

    Ok(false)
}

/// 入力ボックスのキー処理。
async fn handle_input_box_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let Some(input_state) = &mut app.input_box else {
        return Ok(false);
    };
    let sc = &app.shortcuts.input_box;

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        let value = input_state.value.clone();
        let callback_id = input_state.callback_id.clone();
        app.input_box = None;
        apply_input_callback(app, callback_id, value).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        app.input_box = None;
    } else if shortcuts::matches_shortcut(&k, &sc.backspace) {
        input_state.backspace();
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        input_state.delete();
    } else if shortcuts::matches_shortcut(&k, &sc.left) {
        input_state.move_left();
    } else if shortcuts::matches_shortcut(&k, &sc.right) {
        input_state.move_right();
    } else if shortcuts::matches_shortcut(&k, &sc.home) {
        input_state.move_home();
    } else if shortcuts::matches_shortcut(&k, &sc.end) {
        input_state.move_end();
    } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
        input_state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        input_state.insert_char(c);
    }

    Ok(false)
}

/// 入力ボックスのコールバックを適用する。
async fn apply_input_callback(
    app: &mut App,
    callback_id: InputCallbackId,
    value: String,
) -> Result<()> {
    match callback_id {
        InputCallbackId::Form(field) => dispatch(app, WorkerCmd::Edit { field, value }).await?,
        InputCallbackId::ImportFile => {
            let path = value.trim();
            if path.is_empty() {
                dispatch(app, WorkerCmd::ClearFile).await?;
            } else {
                dispatch(app, WorkerCmd::SelectFile(PathBuf::from(path))).await?;
            }
        }
        InputCallbackId::SettingsBaseUrl => app.base_url = value,
        InputCallbackId::SettingsDatabase => app.database = value,
        InputCallbackId::SettingsLogin => app.login = value,
        InputCallbackId::SettingsPassword => app.password = value,
    }
    Ok(())
}

/// 設定画面用の編集バッファを設定値から再読み込みする。
fn reload_settings_buffers(app: &mut App) {
    app.base_url = app.cfg.odoo.base_url.clone();
    app.database = app.cfg.odoo.database.clone();
    app.login = app.cfg.odoo.login.clone();
    app.password = app.cfg.odoo.password.clone();
}
