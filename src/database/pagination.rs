use serde::{Deserialize, Serialize};

use crate::constants::MAX_PAGE_SIZE;

/// Keeps a requested window at `1..=MAX_PAGE_SIZE` rows from a non-negative offset.
pub fn clamp_window(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
}

/// One limit/offset page of a listing. `count` is the total number of rows
/// matching the query, taken from a `COUNT(*) OVER()` window column.
#[derive(Serialize, Deserialize, Debug)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub count: i64,
    pub next_offset: Option<i64>,
    pub previous_offset: Option<i64>,
}

impl<T> Page<T> {
    pub fn from_rows(rows: Vec<T>, count: i64, limit: i64, offset: i64) -> Self {
        if rows.len() <= 0 {
            return Self::no_rows(count);
        }

        let limit = limit.max(1);
        let next_offset = (offset + limit < count).then_some(offset + limit);
        let previous_offset = (offset > 0).then(|| (offset - limit).max(0));

        Self {
            rows,
            count,
            next_offset,
            previous_offset,
        }
    }

    pub fn no_rows(count: i64) -> Self {
        Self {
            rows: vec![],
            count,
            next_offset: None,
            previous_offset: None,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            rows: self.rows.into_iter().map(f).collect(),
            count: self.count,
            next_offset: self.next_offset,
            previous_offset: self.previous_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page() {
        let page = Page::from_rows(vec![1, 2, 3], 7, 3, 0);

        assert_eq!(page.count, 7);
        assert_eq!(page.next_offset, Some(3));
        assert_eq!(page.previous_offset, None);
    }

    #[test]
    fn test_last_page() {
        let page = Page::from_rows(vec![7], 7, 3, 6);

        assert_eq!(page.next_offset, None);
        assert_eq!(page.previous_offset, Some(3));
    }

    #[test]
    fn test_unaligned_offset_does_not_go_negative() {
        let page = Page::from_rows(vec![2, 3], 3, 3, 1);

        assert_eq!(page.previous_offset, Some(0));
        assert_eq!(page.next_offset, None);
    }

    #[test]
    fn test_clamp_window() {
        assert_eq!(clamp_window(-5, -1), (1, 0));
        assert_eq!(clamp_window(0, 12), (1, 12));
        assert_eq!(clamp_window(1_000, 0), (MAX_PAGE_SIZE, 0));
        assert_eq!(clamp_window(6, 6), (6, 6));
    }

    #[test]
    fn test_empty_page() {
        let page: Page<i32> = Page::from_rows(vec![], 0, 6, 0);

        assert!(page.rows.is_empty());
        assert_eq!(page.next_offset, None);
    }
}
