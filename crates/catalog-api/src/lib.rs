//! Catalog read API.
//!
//! An axum server in front of the AniList GraphQL API: paged listings, quick
//! search and media comparison under `/api`, guarded by a per-client
//! fixed-window rate limiter.

pub mod anilist;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod rate_limiter;
pub mod server;

pub use anilist::AniListClient;
pub use cache::ResponseCache;
pub use catalog::{Catalog, ListQuery, MediaQuery};
pub use error::UpstreamError;
pub use rate_limiter::{RateDecision, RequestRateLimiter};
pub use server::{create_router, start_server, AppState};
