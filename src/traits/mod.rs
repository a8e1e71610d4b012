//! The narrow interface the workflow uses to talk to a table service.
//!
//! Entities cross this boundary in their JSON wire shape (see
//! [`Entity::to_vec`](crate::entity::Entity::to_vec)), so any backend that can store
//! and return that shape can drive the workflow.

use crate::{
    context::CallContext,
    errors::{GetError, ListError, UpsertError},
    filter::Filter,
};
use async_trait::async_trait;

/// A connected service from which table handles are obtained.
pub trait TableService: Send + Sync {
    type Client: TableClient;

    /// Handle to the named table. Existence is not checked until the first call.
    fn table_client(&self, table_name: &str) -> Self::Client;
}

#[async_trait]
pub trait TableClient: Send + Sync {
    fn table_name(&self) -> &str;

    /// Insert the entity, or fully replace the one stored under the same key.
    async fn upsert_entity(&self, ctx: &CallContext, entity: &[u8]) -> Result<(), UpsertError>;

    /// Fetch a single entity by key. A missing entity is [`GetError::NotFound`].
    async fn get_entity(
        &self,
        ctx: &CallContext,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Vec<u8>, GetError>;

    /// Start a scan. No request is made until the first [`EntityPager::next_page`].
    fn list_entities(&self, options: ListOptions) -> Box<dyn EntityPager + '_>;
}

/// A finite, single-pass sequence of result pages.
///
/// To read the results again, start a new scan.
#[async_trait]
pub trait EntityPager: Send {
    /// Whether another page may be fetched.
    fn more(&self) -> bool;

    async fn next_page(&mut self, ctx: &CallContext) -> Result<Page, ListError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub filter: Option<Filter>,
    /// Property names to return. Keys are always returned.
    pub select: Option<Vec<String>>,
    /// Upper bound on entities per page.
    pub top: Option<i32>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn select<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn top(mut self, top: i32) -> Self {
        self.top = Some(top);
        self
    }
}

/// One batch of scan results. A page may be empty while more pages remain.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub entities: Vec<Vec<u8>>,
}
