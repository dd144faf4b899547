//! Cursor-driven paged fetching
//!
//! ```text
//! repeat:
//!   check cancellation
//!   budget.before_call()
//!   response = retry(transport.call(build(first_call, cursor)) + classify)
//!   budget.record(adapter.extract_remaining_budget(response))
//!   emit page
//! until no cursor, an empty page, or max pages
//! ```

mod fetcher;
mod types;

pub use fetcher::PagedFetcher;
pub use types::{Cancellation, Page};
