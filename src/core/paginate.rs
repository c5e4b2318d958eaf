//! Pagination and filtering
//!
//! Filters run over the full collection; the page slice is taken afterwards.

use crate::error::{CoreError, CoreResult};
use crate::resource::Record;
use serde_json::Value;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// 1-based page index and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: usize,
    page_size: usize,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageWindow {
    pub fn new(page_size: usize) -> CoreResult<Self> {
        if page_size == 0 {
            return Err(CoreError::validation(
                "page_size",
                "Page size must be greater than 0",
            ));
        }
        Ok(Self { page: 1, page_size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Offset of the first row on the current page
    pub fn start(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    /// Back to page 1. Returns whether anything changed.
    pub fn reset(&mut self) -> bool {
        let changed = self.page != 1;
        self.page = 1;
        changed
    }

    pub fn next(&mut self, total_pages: usize) -> bool {
        if self.page < total_pages {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to a page, clamped into `1..=max(1, total_pages)`
    pub fn set_page(&mut self, page: usize, total_pages: usize) -> bool {
        let target = page.clamp(1, total_pages.max(1));
        let changed = target != self.page;
        self.page = target;
        changed
    }

    /// Pull the page back inside `1..=max(1, total_pages)`
    pub fn clamp(&mut self, total_pages: usize) -> bool {
        self.set_page(self.page, total_pages)
    }

    pub fn set_page_size(&mut self, page_size: usize) -> CoreResult<bool> {
        let window = Self::new(page_size)?;
        let changed = *self != window;
        *self = window;
        Ok(changed)
    }
}

/// Exact match on one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Case-insensitive substring over the search fields
    pub text: String,
    pub category: Option<CategoryFilter>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.category.is_none()
    }

    pub fn matches(&self, record: &Record, search_fields: &[String]) -> bool {
        if let Some(category) = &self.category {
            if field_text(record, &category.field).as_deref() != Some(category.value.as_str()) {
                return false;
            }
        }

        let needle = self.text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        search_fields.iter().any(|field| {
            field_text(record, field).is_some_and(|v| v.to_lowercase().contains(&needle))
        })
    }
}

fn field_text(record: &Record, field: &str) -> Option<String> {
    match record.field_value(field) {
        None | Some(Value::Null) => None,
        Some(_) => Some(record.field(field)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRow<'a> {
    /// Positional S/N within the filtered set
    pub number: usize,
    pub record: &'a Record,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView<'a> {
    pub rows: Vec<PageRow<'a>>,
    pub total_matching: usize,
    pub total_pages: usize,
    /// Effective page; `None` when there are no pages
    pub page: Option<usize>,
}

impl PageView<'_> {
    pub fn is_empty(&self) -> bool {
        self.total_pages == 0
    }
}

pub fn total_pages(total_matching: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_matching.div_ceil(page_size)
}

pub fn paginate<'a>(
    records: &'a [Record],
    filter: &RecordFilter,
    search_fields: &[String],
    window: PageWindow,
) -> PageView<'a> {
    let matching: Vec<&Record> = records
        .iter()
        .filter(|r| filter.matches(r, search_fields))
        .collect();
    let total_matching = matching.len();
    let pages = total_pages(total_matching, window.page_size());

    if pages == 0 {
        return PageView {
            rows: Vec::new(),
            total_matching,
            total_pages: 0,
            page: None,
        };
    }

    let page = window.page().min(pages);
    let start = (page - 1) * window.page_size();
    let rows = matching
        .into_iter()
        .enumerate()
        .skip(start)
        .take(window.page_size())
        .map(|(i, record)| PageRow {
            number: i + 1,
            record,
        })
        .collect();

    PageView {
        rows,
        total_matching,
        total_pages: pages,
        page: Some(page),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use serde_json::json;

    fn gutter(id: &str, ward: &str, status: &str) -> Record {
        Record::decode(
            ResourceKind::Gutters,
            json!({
                "_id": id,
                "ward": ward,
                "village": "Hunkuyi",
                "hamlet": "Tudun Wada",
                "condition": "Constructed with Block",
                "status": status,
                "dischargePoint": "yes"
            }),
        )
        .unwrap()
    }

    fn fields() -> Vec<String> {
        vec!["ward".to_string(), "status".to_string()]
    }

    fn ids(view: &PageView<'_>) -> Vec<String> {
        view.rows
            .iter()
            .map(|r| r.record.id().to_string())
            .collect()
    }

    #[test]
    fn test_page_slices_and_row_numbers() {
        let records: Vec<_> = (1..=5)
            .map(|i| gutter(&i.to_string(), "Kudan", "Maintained"))
            .collect();
        let mut window = PageWindow::new(2).unwrap();

        let view = paginate(&records, &RecordFilter::default(), &fields(), window);
        assert_eq!(view.total_pages, 3);
        assert_eq!(ids(&view), vec!["1", "2"]);

        assert!(window.next(view.total_pages));
        assert!(window.next(view.total_pages));
        assert!(!window.next(view.total_pages));
        let view = paginate(&records, &RecordFilter::default(), &fields(), window);
        assert_eq!(ids(&view), vec!["5"]);
        assert_eq!(view.rows[0].number, 5);
    }

    #[test]
    fn test_text_filter_is_case_insensitive() {
        let records = vec![
            gutter("1", "Kudan", "Maintained"),
            gutter("2", "Zaria", "High Risk"),
            gutter("3", "kudan north", "Unmaintained"),
        ];
        let filter = RecordFilter {
            text: "KUDAN".to_string(),
            category: None,
        };
        let view = paginate(&records, &filter, &fields(), PageWindow::default());
        assert_eq!(ids(&view), vec!["1", "3"]);
        assert_eq!(view.rows[1].number, 2);
    }

    #[test]
    fn test_category_filter_is_exact() {
        let records = vec![
            gutter("1", "Kudan", "Maintained"),
            gutter("2", "Kudan", "Unmaintained"),
        ];
        let filter = RecordFilter {
            text: String::new(),
            category: Some(CategoryFilter {
                field: "status".to_string(),
                value: "Maintained".to_string(),
            }),
        };
        let view = paginate(&records, &filter, &fields(), PageWindow::default());
        assert_eq!(ids(&view), vec!["1"]);
    }

    #[test]
    fn test_no_matches_is_empty_state() {
        let records = vec![gutter("1", "Kudan", "Maintained")];
        let filter = RecordFilter {
            text: "nowhere".to_string(),
            category: None,
        };
        let view = paginate(&records, &filter, &fields(), PageWindow::default());
        assert_eq!(view.total_pages, 0);
        assert_eq!(view.page, None);
        assert!(view.rows.is_empty());
        assert!(view.is_empty());
    }

    #[test]
    fn test_page_past_end_is_clamped() {
        let records: Vec<_> = (1..=3)
            .map(|i| gutter(&i.to_string(), "Kudan", "Maintained"))
            .collect();
        let mut window = PageWindow::new(1).unwrap();
        window.set_page(3, 3);

        let view = paginate(&records[..2], &RecordFilter::default(), &fields(), window);
        assert_eq!(view.page, Some(2));
        assert_eq!(ids(&view), vec!["2"]);

        assert!(window.clamp(view.total_pages));
        assert_eq!(window.page(), 2);
        assert!(window.clamp(0));
        assert_eq!(window.page(), 1);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(PageWindow::new(0).is_err());
        let mut window = PageWindow::default();
        assert!(window.set_page_size(0).is_err());
        assert_eq!(window.page_size(), DEFAULT_PAGE_SIZE);
    }
}
