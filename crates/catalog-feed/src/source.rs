//! Page source abstractions.
//!
//! The controllers only need "give me page N"; whether that talks to the
//! read API, a GraphQL endpoint or an in-memory fixture is up to the source.

use crate::error::FetchError;
use shared::Page;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

/// A paginated sequence addressed by 1-based page number
pub trait PageSource: Send + Sync {
    type Item: Send;

    fn fetch_page(
        &self,
        page: u32,
    ) -> impl Future<Output = Result<Page<Self::Item>, FetchError>> + Send;
}

/// A family of paginated sequences, one per query value
pub trait QuerySource: Send + Sync {
    type Query: Clone + PartialEq + Debug + Send + Sync;
    type Item: Send;

    fn fetch(
        &self,
        query: &Self::Query,
        page: u32,
    ) -> impl Future<Output = Result<Page<Self::Item>, FetchError>> + Send;
}

/// A query source pinned to one query value
pub struct BoundQuery<Q: QuerySource> {
    source: Arc<Q>,
    query: Q::Query,
}

impl<Q: QuerySource> BoundQuery<Q> {
    pub fn new(source: Arc<Q>, query: Q::Query) -> Self {
        Self { source, query }
    }

    pub fn query(&self) -> &Q::Query {
        &self.query
    }
}

impl<Q: QuerySource> PageSource for BoundQuery<Q> {
    type Item = Q::Item;

    fn fetch_page(
        &self,
        page: u32,
    ) -> impl Future<Output = Result<Page<Self::Item>, FetchError>> + Send {
        self.source.fetch(&self.query, page)
    }
}

/// Adapter turning a closure into a [`PageSource`]
pub struct FnSource<F>(F);

pub fn from_fn<F>(f: F) -> FnSource<F> {
    FnSource(f)
}

impl<F, Fut, T> PageSource for FnSource<F>
where
    F: Fn(u32) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Page<T>, FetchError>> + Send,
    T: Send,
{
    type Item = T;

    fn fetch_page(
        &self,
        page: u32,
    ) -> impl Future<Output = Result<Page<Self::Item>, FetchError>> + Send {
        (self.0)(page)
    }
}
