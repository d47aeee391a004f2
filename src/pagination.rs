//! Result-set pagination math.

use serde::{Deserialize, Serialize};

/// Pages shown on each side of the current page in a link row.
pub const LINK_RADIUS: u64 = 2;

/// Derived pagination state for one result set. Computed fresh from the
/// service's total on every request; nothing here is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDescriptor {
    pub total_records: u64,
    pub per_page: u32,
    pub current_page: u32,
    pub total_pages: u64,
    pub has_prev: bool,
    pub has_next: bool,
}

/// Computes the page count and prev/next flags for a result set.
///
/// `current_page` is 1-based and may point past the end (a stale URL
/// after the index shrank); the flags stay consistent either way.
/// Panics on `per_page == 0` or `current_page == 0`: both are caller
/// bugs, and request handlers normalize page input before calling.
pub fn paginate(total_records: u64, current_page: u32, per_page: u32) -> PageDescriptor {
    assert!(per_page > 0, "per_page must be positive");
    assert!(current_page > 0, "current_page is 1-based");

    let total_pages = total_records.div_ceil(per_page as u64);

    PageDescriptor {
        total_records,
        per_page,
        current_page,
        total_pages,
        has_prev: current_page > 1,
        has_next: (current_page as u64) < total_pages,
    }
}

/// One slot in a pagination link row. Serialized as the page number,
/// with gaps as `null`, so a UI can map the row straight to links and
/// ellipses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageToken {
    Page(u64),
    Gap,
}

impl Serialize for PageToken {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            PageToken::Page(n) => serializer.serialize_u64(*n),
            PageToken::Gap => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for PageToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match Option::<u64>::deserialize(deserializer)? {
            Some(n) => PageToken::Page(n),
            None => PageToken::Gap,
        })
    }
}

impl PageDescriptor {
    /// Pages to render around the current one: a window of `radius` on
    /// each side, anchored to the first and last page with gap markers
    /// where the window is truncated. Empty when there are no pages.
    pub fn link_row(&self, radius: u64) -> Vec<PageToken> {
        if self.total_pages == 0 {
            return Vec::new();
        }

        let current = (self.current_page as u64).min(self.total_pages);
        let start = current.saturating_sub(radius).max(1);
        let end = (current + radius).min(self.total_pages);

        let mut row = Vec::new();
        if start > 1 {
            row.push(PageToken::Page(1));
            row.push(PageToken::Gap);
        }
        for page in start..=end {
            row.push(PageToken::Page(page));
        }
        if end < self.total_pages {
            row.push(PageToken::Gap);
            row.push(PageToken::Page(self.total_pages));
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_empty_set() {
        let page = paginate(0, 1, 20);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_prev);
        assert!(!page.has_next);
    }

    #[test]
    fn test_paginate_last_page() {
        let page = paginate(100, 5, 20);
        assert_eq!(page.total_pages, 5);
        assert!(page.has_prev);
        assert!(!page.has_next);
    }

    #[test]
    fn test_paginate_partial_last_page() {
        let page = paginate(101, 1, 20);
        assert_eq!(page.total_pages, 6);
        assert!(!page.has_prev);
        assert!(page.has_next);
    }

    #[test]
    fn test_paginate_exact_division() {
        assert_eq!(paginate(40, 2, 20).total_pages, 2);
        assert_eq!(paginate(41, 2, 20).total_pages, 3);
        assert_eq!(paginate(1, 1, 20).total_pages, 1);
    }

    #[test]
    fn test_paginate_past_the_end() {
        let page = paginate(10, 9, 5);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_prev);
        assert!(!page.has_next);
    }

    #[test]
    #[should_panic(expected = "per_page must be positive")]
    fn test_paginate_rejects_zero_per_page() {
        paginate(10, 1, 0);
    }

    #[test]
    #[should_panic(expected = "current_page is 1-based")]
    fn test_paginate_rejects_page_zero() {
        paginate(10, 0, 20);
    }

    #[test]
    fn test_link_row_small_set_has_no_gaps() {
        let row = paginate(60, 2, 20).link_row(LINK_RADIUS);
        assert_eq!(
            row,
            vec![PageToken::Page(1), PageToken::Page(2), PageToken::Page(3)]
        );
    }

    #[test]
    fn test_link_row_middle_window() {
        let row = paginate(200, 5, 20).link_row(LINK_RADIUS);
        assert_eq!(
            row,
            vec![
                PageToken::Page(1),
                PageToken::Gap,
                PageToken::Page(3),
                PageToken::Page(4),
                PageToken::Page(5),
                PageToken::Page(6),
                PageToken::Page(7),
                PageToken::Gap,
                PageToken::Page(10),
            ]
        );
    }

    #[test]
    fn test_link_row_near_start() {
        let row = paginate(200, 1, 20).link_row(LINK_RADIUS);
        assert_eq!(
            row,
            vec![
                PageToken::Page(1),
                PageToken::Page(2),
                PageToken::Page(3),
                PageToken::Gap,
                PageToken::Page(10),
            ]
        );
    }

    #[test]
    fn test_link_row_near_end() {
        let row = paginate(200, 10, 20).link_row(LINK_RADIUS);
        assert_eq!(
            row,
            vec![
                PageToken::Page(1),
                PageToken::Gap,
                PageToken::Page(8),
                PageToken::Page(9),
                PageToken::Page(10),
            ]
        );
    }

    #[test]
    fn test_link_row_empty_set() {
        assert!(paginate(0, 1, 20).link_row(LINK_RADIUS).is_empty());
    }

    #[test]
    fn test_link_row_serializes_gaps_as_null() {
        let row = paginate(200, 5, 20).link_row(LINK_RADIUS);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, "[1,null,3,4,5,6,7,null,10]");
    }
}
