//! Result windowing.
//!
//! Pages are 1-based. A page number of zero or less is treated as page 1.

/// Half-open `[start, end)` window of page `page` over `total` hits.
pub fn page_window(total: usize, page: i64, page_size: usize) -> (usize, usize) {
    let page = page.max(1) as u64;
    let offset = (page - 1).saturating_mul(page_size as u64);
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(total);
    let end = start.saturating_add(page_size).min(total);
    (start, end)
}

/// Slice of `hits` for the requested page, and the total hit count.
pub fn paginate<H>(hits: &[H], page: i64, page_size: usize) -> (&[H], usize) {
    let (start, end) = page_window(hits.len(), page, page_size);
    (&hits[start..end], hits.len())
}

/// Number of pages needed for `total` records; zero when `page_size` is zero.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits() -> Vec<u32> {
        (0..20).collect()
    }

    #[test]
    fn test_second_page() {
        let hits = hits();
        let (slice, total) = paginate(&hits, 2, 5);
        assert_eq!(slice, &[5, 6, 7, 8, 9]);
        assert_eq!(total, 20);
    }

    #[test]
    fn test_non_positive_page_is_first_page() {
        let hits = hits();
        let first = paginate(&hits, 1, 5).0;
        assert_eq!(paginate(&hits, 0, 5).0, first);
        assert_eq!(paginate(&hits, -3, 5).0, first);
    }

    #[test]
    fn test_last_page_is_clamped() {
        let hits = hits();
        assert_eq!(paginate(&hits, 3, 8).0, &[16, 17, 18, 19]);
        assert!(paginate(&hits, 9, 8).0.is_empty());
    }

    #[test]
    fn test_zero_page_size() {
        let hits = hits();
        let (slice, total) = paginate(&hits, 1, 0);
        assert!(slice.is_empty());
        assert_eq!(total, 20);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let hits = hits();
        assert!(paginate(&hits, i64::MAX, usize::MAX).0.is_empty());
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 5), 0);
        assert_eq!(page_count(1, 5), 1);
        assert_eq!(page_count(10, 5), 2);
        assert_eq!(page_count(11, 5), 3);
        assert_eq!(page_count(11, 0), 0);
    }
}
