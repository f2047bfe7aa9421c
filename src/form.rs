//! Booking form state and the generated code records it owns.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Validity length used when the input is not a positive number.
pub const DEFAULT_ACTIVE_DAYS: u32 = 7;
/// Copy count used when the input is not a positive number.
pub const DEFAULT_COPIES: u32 = 3;
/// Upper bound for copies of a single generated code.
pub const MAX_COPIES: u32 = 100;
/// Bottle size assumed by the backend when none is given.
pub const DEFAULT_BOTTLE_SIZE: &str = "100ml";
/// Bottle sizes offered by the backend selection field.
pub const BOTTLE_SIZES: [&str; 3] = ["30ml", "50ml", "100ml"];

/// Unit of the validity window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidityUnit {
    Hours,
    #[default]
    Days,
}

impl ValidityUnit {
    /// Wire/display name.
    pub fn as_str(self) -> &'static str {
        match self {
            ValidityUnit::Hours => "hours",
            ValidityUnit::Days => "days",
        }
    }

    /// Parse a wire name; anything unknown falls back to days.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "hours" | "hour" | "h" => ValidityUnit::Hours,
            _ => ValidityUnit::Days,
        }
    }

    /// The other unit, for cycling in the form.
    pub fn toggled(self) -> Self {
        match self {
            ValidityUnit::Hours => ValidityUnit::Days,
            ValidityUnit::Days => ValidityUnit::Hours,
        }
    }
}

/// Editable form fields, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    BookingCode,
    BookingFrom,
    BookingPrice,
    BottleSize,
    ActiveDays,
    ActivePeriod,
    NumberOfCopies,
}

impl FormField {
    /// All fields in the order the form shows them.
    pub const ALL: [FormField; 7] = [
        FormField::BookingCode,
        FormField::BookingFrom,
        FormField::BookingPrice,
        FormField::BottleSize,
        FormField::ActiveDays,
        FormField::ActivePeriod,
        FormField::NumberOfCopies,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::BookingCode => "Booking Code",
            FormField::BookingFrom => "Booking From",
            FormField::BookingPrice => "Booking Price",
            FormField::BottleSize => "Bottle Size",
            FormField::ActiveDays => "Active",
            FormField::ActivePeriod => "Period",
            FormField::NumberOfCopies => "Copies",
        }
    }

    /// Fields edited by cycling through fixed options instead of typing.
    pub fn is_choice(self) -> bool {
        matches!(self, FormField::BottleSize | FormField::ActivePeriod)
    }
}

/// Booking values carried by a single imported row.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BookingOverrides {
    #[serde(default)]
    pub booking_code: Option<String>,
    #[serde(default)]
    pub booking_from: Option<String>,
    #[serde(default)]
    pub booking_price: Option<f64>,
    #[serde(default)]
    pub bottle_size: Option<String>,
    #[serde(default)]
    pub validity_value: Option<u32>,
    #[serde(default)]
    pub validity_unit: Option<ValidityUnit>,
}

/// One issued or pending code, positioned on its own page.
#[derive(Clone, Debug, PartialEq)]
pub struct CodeRecord {
    /// 1-based position in the sequence.
    pub id: usize,
    pub code: String,
    /// Page label; mirrors `id`.
    pub page_number: usize,
    /// Per-row booking data from a bulk import.
    pub overrides: Option<BookingOverrides>,
}

impl CodeRecord {
    pub fn new(position: usize, code: impl Into<String>) -> Self {
        Self {
            id: position,
            code: code.into(),
            page_number: position,
            overrides: None,
        }
    }
}

/// Spreadsheet picked for a bulk import.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedFile {
    /// File name shown to the operator.
    pub name: String,
    /// Where the bytes are read from when the import runs.
    pub path: PathBuf,
}

impl SelectedFile {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }
}

/// Form state for the provisioning workflow.
///
/// `access_codes` is only ever replaced as a whole through
/// [`FormState::replace_codes`], which also recomputes `total_pages`.
#[derive(Clone, Debug, PartialEq)]
pub struct FormState {
    pub booking_code: String,
    pub booking_from: String,
    pub booking_price: String,
    pub bottle_size: String,
    pub active_days: u32,
    pub active_period: ValidityUnit,
    pub number_of_copies: u32,
    pub selected_file: Option<SelectedFile>,
    /// Display expiry of the last single-generated code.
    pub expiry_date: Option<String>,
    access_codes: Vec<CodeRecord>,
    total_pages: usize,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            booking_code: String::new(),
            booking_from: String::new(),
            booking_price: String::new(),
            bottle_size: String::new(),
            active_days: DEFAULT_ACTIVE_DAYS,
            active_period: ValidityUnit::Days,
            number_of_copies: 1,
            selected_file: None,
            expiry_date: None,
            access_codes: Vec::new(),
            total_pages: 0,
        }
    }
}

impl FormState {
    /// Apply raw operator input to one field.
    pub fn apply(&mut self, field: FormField, value: &str) {
        match field {
            FormField::BookingCode => self.booking_code = value.to_string(),
            FormField::BookingFrom => self.booking_from = value.to_string(),
            FormField::BookingPrice => self.booking_price = value.to_string(),
            FormField::BottleSize => self.bottle_size = value.trim().to_string(),
            FormField::ActiveDays => self.active_days = parse_active_days(value),
            FormField::ActivePeriod => self.active_period = ValidityUnit::parse(value),
            FormField::NumberOfCopies => self.number_of_copies = parse_copies(value),
        }
    }

    /// Current value of a field as shown in the form.
    pub fn value_of(&self, field: FormField) -> String {
        match field {
            FormField::BookingCode => self.booking_code.clone(),
            FormField::BookingFrom => self.booking_from.clone(),
            FormField::BookingPrice => self.booking_price.clone(),
            FormField::BottleSize => self.bottle_size.clone(),
            FormField::ActiveDays => self.active_days.to_string(),
            FormField::ActivePeriod => self.active_period.as_str().to_string(),
            FormField::NumberOfCopies => self.number_of_copies.to_string(),
        }
    }

    /// Next option for a choice field, or `None` for free-text fields.
    pub fn next_choice(&self, field: FormField) -> Option<String> {
        match field {
            FormField::BottleSize => {
                let next = match BOTTLE_SIZES.iter().position(|s| *s == self.bottle_size) {
                    Some(i) => BOTTLE_SIZES[(i + 1) % BOTTLE_SIZES.len()],
                    None => BOTTLE_SIZES[0],
                };
                Some(next.to_string())
            }
            FormField::ActivePeriod => Some(self.active_period.toggled().as_str().to_string()),
            _ => None,
        }
    }

    /// Price as sent to the backend (`0` when not a number).
    pub fn price_value(&self) -> f64 {
        parse_leading_float(&self.booking_price).unwrap_or(0.0)
    }

    pub fn select_file(&mut self, file: SelectedFile) {
        self.selected_file = Some(file);
    }

    pub fn clear_file(&mut self) {
        self.selected_file = None;
    }

    pub fn access_codes(&self) -> &[CodeRecord] {
        &self.access_codes
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Swap in a whole new code sequence.
    pub fn replace_codes(&mut self, codes: Vec<CodeRecord>) {
        self.access_codes = codes;
        self.total_pages = self.access_codes.len();
    }

    /// Code of the first record, i.e. the last single-generated code.
    pub fn generated_code(&self) -> Option<&str> {
        self.access_codes.first().map(|r| r.code.as_str())
    }

    /// Text encoded into the QR code on printed cards.
    pub fn qr_code_text(&self) -> Option<&str> {
        self.generated_code()
    }

    /// Booking values for a record: row overrides, then form values, then
    /// backend defaults.
    pub fn resolve(&self, record: &CodeRecord) -> ResolvedBooking {
        let o = record.overrides.clone().unwrap_or_default();
        let bottle_size = o
            .bottle_size
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.bottle_size.clone()).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| DEFAULT_BOTTLE_SIZE.to_string());
        ResolvedBooking {
            booking_code: o.booking_code.unwrap_or_else(|| self.booking_code.clone()),
            booking_from: o.booking_from.unwrap_or_else(|| self.booking_from.clone()),
            booking_price: o.booking_price.unwrap_or_else(|| self.price_value()),
            bottle_size,
            validity_value: o
                .validity_value
                .filter(|v| *v > 0)
                .unwrap_or(self.active_days),
            validity_unit: o.validity_unit.unwrap_or(self.active_period),
        }
    }
}

/// Effective booking values of one record.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedBooking {
    pub booking_code: String,
    pub booking_from: String,
    pub booking_price: f64,
    pub bottle_size: String,
    pub validity_value: u32,
    pub validity_unit: ValidityUnit,
}

/// Parse the validity length, falling back to the default.
pub fn parse_active_days(input: &str) -> u32 {
    match parse_leading_int(input) {
        Some(v) if v >= 1 => u32::try_from(v).unwrap_or(u32::MAX),
        _ => DEFAULT_ACTIVE_DAYS,
    }
}

/// Parse the copy count, clamped to `1..=MAX_COPIES`.
pub fn parse_copies(input: &str) -> u32 {
    match parse_leading_int(input) {
        Some(v) if v > 0 => v.min(i64::from(MAX_COPIES)) as u32,
        _ => DEFAULT_COPIES,
    }
}

/// Read an optional sign and the leading digits, ignoring anything after.
///
/// `"12abc"` is 12, `"abc"` is `None`.
fn parse_leading_int(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: &str = &rest[..rest.bytes().take_while(u8::is_ascii_digit).count()];
    if digits.is_empty() {
        return None;
    }
    let magnitude = digits.bytes().fold(0i64, |acc, d| {
        acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}

/// Leading-number float parse for prices (`"12.5 EUR"` is 12.5).
fn parse_leading_float(input: &str) -> Option<f64> {
    let s = input.trim();
    let end = s
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+')))
        .count();
    // Shrink until it parses, e.g. "1.2.3" -> "1.2".
    (1..=end).rev().find_map(|n| s[..n].parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copies_fall_back_to_default() {
        for input in ["0", "-5", "abc", ""] {
            assert_eq!(parse_copies(input), DEFAULT_COPIES, "input {input:?}");
        }
    }

    #[test]
    fn test_copies_clamped_to_max() {
        assert_eq!(parse_copies("250"), MAX_COPIES);
        assert_eq!(parse_copies("100"), 100);
        assert_eq!(parse_copies("4"), 4);
    }

    #[test]
    fn test_copies_leading_digits() {
        assert_eq!(parse_copies("12abc"), 12);
        assert_eq!(parse_copies("  7 copies"), 7);
    }

    #[test]
    fn test_active_days_defaults() {
        assert_eq!(parse_active_days("abc"), DEFAULT_ACTIVE_DAYS);
        assert_eq!(parse_active_days("0"), DEFAULT_ACTIVE_DAYS);
        assert_eq!(parse_active_days("30"), 30);
    }

    #[test]
    fn test_price_value() {
        let mut form = FormState::default();
        assert_eq!(form.price_value(), 0.0);
        form.apply(FormField::BookingPrice, "12.5");
        assert_eq!(form.price_value(), 12.5);
        form.apply(FormField::BookingPrice, "99 IDR");
        assert_eq!(form.price_value(), 99.0);
        form.apply(FormField::BookingPrice, "free");
        assert_eq!(form.price_value(), 0.0);
    }

    #[test]
    fn test_replace_codes_keeps_total_pages_in_sync() {
        let mut form = FormState::default();
        assert_eq!(form.total_pages(), 0);

        form.replace_codes((1..=5).map(|i| CodeRecord::new(i, "AAA-BBB-CCC")).collect());
        assert_eq!(form.total_pages(), form.access_codes().len());
        assert_eq!(form.total_pages(), 5);

        form.replace_codes(vec![CodeRecord::new(1, "X")]);
        assert_eq!(form.total_pages(), form.access_codes().len());

        form.replace_codes(Vec::new());
        assert_eq!(form.total_pages(), 0);
        assert_eq!(form.generated_code(), None);
    }

    #[test]
    fn test_choice_cycling() {
        let mut form = FormState::default();
        assert_eq!(form.next_choice(FormField::BottleSize).as_deref(), Some("30ml"));
        form.apply(FormField::BottleSize, "100ml");
        assert_eq!(form.next_choice(FormField::BottleSize).as_deref(), Some("30ml"));
        assert_eq!(form.next_choice(FormField::ActivePeriod).as_deref(), Some("hours"));
        assert_eq!(form.next_choice(FormField::BookingCode), None);
    }

    #[test]
    fn test_resolve_prefers_row_overrides() {
        let mut form = FormState::default();
        form.apply(FormField::BookingCode, "FORM");
        form.apply(FormField::BookingPrice, "10");

        let plain = CodeRecord::new(1, "AAA-AAA-AAA");
        let r = form.resolve(&plain);
        assert_eq!(r.booking_code, "FORM");
        assert_eq!(r.booking_price, 10.0);
        assert_eq!(r.bottle_size, DEFAULT_BOTTLE_SIZE);
        assert_eq!(r.validity_value, DEFAULT_ACTIVE_DAYS);

        let mut row = CodeRecord::new(2, "BBB-BBB-BBB");
        row.overrides = Some(BookingOverrides {
            booking_code: Some("ROW".into()),
            bottle_size: Some("30ml".into()),
            validity_value: Some(0),
            validity_unit: Some(ValidityUnit::Hours),
            ..Default::default()
        });
        let r = form.resolve(&row);
        assert_eq!(r.booking_code, "ROW");
        assert_eq!(r.booking_price, 10.0);
        assert_eq!(r.bottle_size, "30ml");
        assert_eq!(r.validity_value, DEFAULT_ACTIVE_DAYS);
        assert_eq!(r.validity_unit, ValidityUnit::Hours);
    }

    #[test]
    fn test_selected_file_name() {
        let file = SelectedFile::from_path(PathBuf::from("/tmp/bookings/march.xlsx"));
        assert_eq!(file.name, "march.xlsx");
    }
}
