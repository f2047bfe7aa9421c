//! 画面から独立して使える小さなウィジェット群。

/// 国選択リスト。
pub mod country_picker;
/// 設定メニュー（開閉式）。
pub mod menu;

pub use country_picker::CountryPicker;
pub use menu::{DisclosureMenu, MenuItem};
