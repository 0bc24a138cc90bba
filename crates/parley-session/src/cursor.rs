//! Client-side bookkeeping of how much history is loaded.

use serde::Serialize;

/// Offset into the room's history (newest first) and whether an older page
/// may still exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationCursor {
    loaded_count: usize,
    has_more_older: bool,
}

impl PaginationCursor {
    /// Fresh cursor for a room that has not been fetched yet.
    pub fn new() -> Self {
        Self {
            loaded_count: 0,
            has_more_older: true,
        }
    }

    /// Record a successful history fetch.
    pub fn advance(&mut self, page_len: usize, has_more_older: bool) {
        self.loaded_count += page_len;
        self.has_more_older = has_more_older;
    }

    /// A message persisted after the cursor was initialised shifts every
    /// older message one position further from the newest.
    pub fn note_live_message(&mut self) {
        self.loaded_count += 1;
    }

    pub fn note_removed(&mut self) {
        self.loaded_count = self.loaded_count.saturating_sub(1);
    }

    /// `skipAmount` for the next older page.
    pub fn skip_amount(&self) -> usize {
        self.loaded_count
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded_count
    }

    pub fn has_more_older(&self) -> bool {
        self.has_more_older
    }
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_pages_then_short_page() {
        let mut cursor = PaginationCursor::new();
        cursor.advance(30, true);
        cursor.advance(30, true);
        assert!(cursor.has_more_older());
        assert_eq!(cursor.skip_amount(), 60);

        cursor.advance(12, false);
        assert!(!cursor.has_more_older());
        assert_eq!(cursor.loaded_count(), 72);
    }

    #[test]
    fn test_live_traffic_shifts_offset() {
        let mut cursor = PaginationCursor::new();
        cursor.advance(20, true);
        cursor.note_live_message();
        cursor.note_live_message();
        cursor.note_removed();
        assert_eq!(cursor.skip_amount(), 21);
    }
}
