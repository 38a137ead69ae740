//! Offset/limit cursor over a list endpoint.

/// Position within a paginated collection.
///
/// Only advances; once exhausted it is never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub offset: u64,
    pub limit: u64,
    /// Collection size reported by the most recent page, unknown before the first.
    pub total_count: Option<u64>,
    finished: bool,
}

impl PageCursor {
    pub fn new(limit: u64) -> Self {
        Self {
            offset: 0,
            limit,
            total_count: None,
            finished: false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.finished || self.total_count.is_some_and(|total| self.offset >= total)
    }

    /// Record a fetched page of `returned` records out of `count`.
    ///
    /// An empty page ends the sequence regardless of the reported count.
    pub fn advance(&mut self, returned: u64, count: u64) {
        self.total_count = Some(count);
        if returned == 0 {
            self.finished = true;
        }
        self.offset += returned;
    }
}
