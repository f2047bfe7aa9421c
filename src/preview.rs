//! Preview cards derived from the form, one per page.

use crate::form::FormState;

/// What a printed card will show.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewCard {
    pub page_number: usize,
    pub total_pages: usize,
    pub booking_code: String,
    pub booking_from: String,
    pub booking_price: f64,
    pub bottle_size: String,
    pub code: String,
    pub expiry: String,
}

impl PreviewCard {
    /// "Page n of m" label.
    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.page_number, self.total_pages)
    }
}

/// Build cards in record order.
pub fn cards(form: &FormState) -> Vec<PreviewCard> {
    let total = form.total_pages();
    let expiry = form.expiry_date.clone().unwrap_or_else(|| "-".into());
    form.access_codes()
        .iter()
        .map(|record| {
            let b = form.resolve(record);
            PreviewCard {
                page_number: record.page_number,
                total_pages: total,
                booking_code: b.booking_code,
                booking_from: b.booking_from,
                booking_price: b.booking_price,
                bottle_size: b.bottle_size,
                code: record.code.clone(),
                expiry: expiry.clone(),
            }
        })
        .collect()
}

/// Cursor over the preview pages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pager {
    /// 0-based index of the visible card.
    page: usize,
}

impl Pager {
    /// Visible card index, clamped to `len` cards.
    pub fn current(&self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.page.min(len - 1))
        }
    }

    pub fn next(&mut self, len: usize) {
        if let Some(cur) = self.current(len) {
            self.page = (cur + 1).min(len - 1);
        }
    }

    pub fn prev(&mut self, len: usize) {
        if let Some(cur) = self.current(len) {
            self.page = cur.saturating_sub(1);
        }
    }

    /// Back to the first page, e.g. after the codes were replaced.
    pub fn reset(&mut self) {
        self.page = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{CodeRecord, FormField};

    #[test]
    fn test_cards_follow_records_in_order() {
        let mut form = FormState::default();
        form.apply(FormField::BookingCode, "BK-9");
        form.apply(FormField::BottleSize, "50ml");
        form.expiry_date = Some("2026-10-26 10:00".into());
        form.replace_codes(vec![
            CodeRecord::new(1, "CCC-CCC-CCC"),
            CodeRecord::new(2, "AAA-AAA-AAA"),
        ]);

        let cards = cards(&form);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].code, "CCC-CCC-CCC");
        assert_eq!(cards[1].code, "AAA-AAA-AAA");
        assert_eq!(cards[1].page_label(), "Page 2 of 2");
        assert_eq!(cards[0].bottle_size, "50ml");
        assert_eq!(cards[0].booking_code, "BK-9");
        assert_eq!(cards[0].expiry, "2026-10-26 10:00");
    }

    #[test]
    fn test_cards_empty() {
        assert!(cards(&FormState::default()).is_empty());
    }

    #[test]
    fn test_pager_clamps() {
        let mut pager = Pager::default();
        assert_eq!(pager.current(0), None);
        pager.next(3);
        pager.next(3);
        pager.next(3);
        assert_eq!(pager.current(3), Some(2));
        // Fewer cards after a new import.
        assert_eq!(pager.current(2), Some(1));
        pager.prev(2);
        assert_eq!(pager.current(2), Some(0));
        pager.prev(2);
        assert_eq!(pager.current(2), Some(0));
    }
}
