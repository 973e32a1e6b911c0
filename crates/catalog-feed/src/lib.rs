//! Incremental data acquisition for the catalog read API.
//!
//! This library turns "more data wanted" and "filters changed" signals into
//! paginated requests, merges pages into deduplicated lists, and discards
//! results that arrive for inputs the consumer has already moved past.

pub mod debounce;
pub mod epoch;
pub mod error;
pub mod filtered;
pub mod http;
pub mod paged;
pub mod source;

pub use debounce::Debouncer;
pub use epoch::{Epoch, EpochCounter, Tagged};
pub use error::FetchError;
pub use filtered::FilterQueryController;
pub use http::{json_item_key, ApiClient, HttpPageSource, HttpQuerySource};
pub use paged::{FetchOutcome, PagedFetchController, SequenceSnapshot, SkipReason};
pub use source::{from_fn, BoundQuery, FnSource, PageSource, QuerySource};
