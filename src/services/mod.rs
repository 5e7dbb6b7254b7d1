// Tray identity and capacity
pub mod trays;

// Per-slot occupancy records
pub mod slots;

// Place/clear/batch semantics over trays and slots
pub mod locations;

// Read-only projections
pub mod reports;

/// Normalizes 1-based paging input; a zero page or page size is bumped to 1.
/// The page is capped so the row offset `(page - 1) * per_page` fits in an
/// `i64`, which is what the store's OFFSET accepts.
pub(crate) fn page_bounds(page: u64, per_page: u64) -> (u64, u64) {
    let per_page = per_page.clamp(1, i64::MAX as u64);
    let last_page = (i64::MAX as u64) / per_page;
    (page.clamp(1, last_page), per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_bumps_zero_values() {
        assert_eq!(page_bounds(0, 0), (1, 1));
        assert_eq!(page_bounds(3, 20), (3, 20));
    }

    #[test]
    fn page_bounds_keeps_offset_within_i64() {
        for (page, per_page) in [
            (u64::MAX, 100),
            (i64::MAX as u64, 100),
            (u64::MAX, 1),
            (2, u64::MAX),
        ] {
            let (page, per_page) = page_bounds(page, per_page);
            let offset = (page - 1).checked_mul(per_page).expect("offset overflowed");
            assert!(offset <= i64::MAX as u64);
        }
    }
}
