//! Pagination subsystem.
//!
//! # Data Flow
//! ```text
//! iterate_all(endpoint, params)
//!     → PageCursor at offset 0, fixed limit
//!     → on pull: GET endpoint?offset&limit → {"count", "results"}
//!     → yield each record, advance offset by records returned
//!     → stop when offset >= count or a page is empty
//! ```

pub mod cursor;
pub mod iterator;

pub use cursor::PageCursor;
pub use iterator::{PageIterator, PageResult};
