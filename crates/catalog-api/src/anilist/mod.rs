//! AniList GraphQL client implementation.
//!
//! This module provides a cached, retry-enabled client for the AniList API
//! that backs the read routes.

pub mod client;
pub mod queries;
pub mod types;

pub use client::AniListClient;
pub use types::{CharacterSummary, MediaSummary, StudioSummary};
