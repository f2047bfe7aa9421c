//! ショートカット設定の管理。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// ショートカット設定の全体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortcuts {
    pub main: MainShortcuts,
    pub settings: SettingsShortcuts,
    pub menu: MenuShortcuts,
    pub countries: CountryShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// メイン画面（フォーム + プレビュー）のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainShortcuts {
    pub quit: Vec<String>,
    pub menu: Vec<String>,
    pub edit: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
    pub generate: Vec<String>,
    pub import: Vec<String>,
    pub select_file: Vec<String>,
    pub clear_file: Vec<String>,
    pub template: Vec<String>,
    pub download: Vec<String>,
    pub print: Vec<String>,
    pub next_page: Vec<String>,
    pub prev_page: Vec<String>,
}

/// サーバー設定画面のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsShortcuts {
    pub cancel: Vec<String>,
    pub save: Vec<String>,
    pub base_url: Vec<String>,
    pub database: Vec<String>,
    pub login: Vec<String>,
    pub password: Vec<String>,
}

/// 設定メニューのショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuShortcuts {
    pub down: Vec<String>,
    pub up: Vec<String>,
    pub select: Vec<String>,
    pub close: Vec<String>,
}

/// 国選択画面のショートカット。文字キーは絞り込みに使うため矢印のみ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryShortcuts {
    pub down: Vec<String>,
    pub up: Vec<String>,
    pub select: Vec<String>,
    pub cancel: Vec<String>,
    pub erase: Vec<String>,
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
            let shortcuts: Shortcuts = toml::from_str(&content)?;
            Ok(shortcuts)
        } else {
            Ok(Self::default())
        }
    }
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            main: MainShortcuts {
                quit: keys(&["q"]),
                menu: keys(&["m"]),
                edit: keys(&["Enter"]),
                down: keys(&["Down", "j"]),
                up: keys(&["Up", "k"]),
                generate: keys(&["g"]),
                import: keys(&["i"]),
                select_file: keys(&["f"]),
                clear_file: keys(&["x"]),
                template: keys(&["t"]),
                download: keys(&["d"]),
                print: keys(&["p"]),
                next_page: keys(&["Right", "]"]),
                prev_page: keys(&["Left", "["]),
            },
            settings: SettingsShortcuts {
                cancel: keys(&["Esc"]),
                save: keys(&["Enter"]),
                base_url: keys(&["u"]),
                database: keys(&["b"]),
                login: keys(&["l"]),
                password: keys(&["w"]),
            },
            menu: MenuShortcuts {
                down: keys(&["Down", "j"]),
                up: keys(&["Up", "k"]),
                select: keys(&["Enter"]),
                close: keys(&["Esc", "m"]),
            },
            countries: CountryShortcuts {
                down: keys(&["Down"]),
                up: keys(&["Up"]),
                select: keys(&["Enter"]),
                cancel: keys(&["Esc"]),
                erase: keys(&["Backspace"]),
            },
            // 値の入力中に h/l を打てるよう、移動は矢印のみ。
            input_box: InputBoxShortcuts {
                confirm: keys(&["Enter"]),
                cancel: keys(&["Esc"]),
                backspace: keys(&["Backspace"]),
                delete: keys(&["Delete"]),
                left: keys(&["Left"]),
                right: keys(&["Right"]),
                home: keys(&["Home"]),
                end: keys(&["End"]),
                clear_line: keys(&["Ctrl+u"]),
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
    // "Ctrl+u" は修飾キーとキー本体に分ける。"+" 単体はキーとして扱う。
    let (modifiers_str, key_str) = match shortcut.rsplit_once('+') {
        Some((mods, k)) if !mods.is_empty() && !k.is_empty() => {
            (mods.split('+').collect::<Vec<_>>(), k)
        }
        _ => (Vec::new(), shortcut),
    };

    let mut expected_modifiers = KeyModifiers::empty();
    for modifier in modifiers_str {
        match modifier {
            "Ctrl" | "ctrl" => expected_modifiers |= KeyModifiers::CONTROL,
            "Alt" | "alt" => expected_modifiers |= KeyModifiers::ALT,
            "Shift" | "shift" => expected_modifiers |= KeyModifiers::SHIFT,
            _ => return false,
        }
    }

    // 記号キーは端末によってSHIFT付きで届くため、文字キーではSHIFTを無視する。
    let actual = match key.code {
        KeyCode::Char(_) => key.modifiers.difference(KeyModifiers::SHIFT),
        _ => key.modifiers,
    };
    if actual != expected_modifiers {
        return false;
    }

    match key_str {
        "Enter" | "enter" => key.code == KeyCode::Enter,
        "Esc" | "esc" => key.code == KeyCode::Esc,
        "Tab" | "tab" => key.code == KeyCode::Tab,
        "Backspace" | "backspace" => key.code == KeyCode::Backspace,
        "Delete" | "delete" => key.code == KeyCode::Delete,
        "Up" | "up" => key.code == KeyCode::Up,
        "Down" | "down" => key.code == KeyCode::Down,
        "Left" | "left" => key.code == KeyCode::Left,
        "Right" | "right" => key.code == KeyCode::Right,
        "Home" | "home" => key.code == KeyCode::Home,
        "End" | "end" => key.code == KeyCode::End,
        s => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => key.code == KeyCode::Char(c),
                _ => false,
            }
        }
    }
}
