//! In-process table service.
//!
//! Behaves like the hosted service as far as the [`TableClient`] contract goes: upserts
//! fully replace, scans are lazy and paged, and a table that was never created fails
//! on first use with a `TableNotFound` error.

use crate::{
    context::CallContext,
    entity::Entity,
    errors::{GetError, ListError, UpsertError},
    traits::{EntityPager, ListOptions, Page, TableClient, TableService},
};
use async_trait::async_trait;
use log::debug;
use std::{
    collections::{BTreeMap, HashMap},
    ops::Bound,
    sync::{Arc, PoisonError, RwLock},
};

/// Largest page a scan returns when no page size is requested.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

type RowId = (String, String);
type Rows = BTreeMap<RowId, Entity>;

#[derive(Debug, Clone, Default)]
pub struct MemoryTableService {
    tables: Arc<RwLock<HashMap<String, Arc<RwLock<Rows>>>>>,
}

impl MemoryTableService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table_name: impl Into<String>) -> Self {
        self.create_table(table_name);
        self
    }

    /// Create an empty table. Creating an existing table leaves its contents alone.
    pub fn create_table(&self, table_name: impl Into<String>) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table_name.into())
            .or_default();
    }

    /// Number of entities stored in the table, or `None` if it does not exist.
    pub fn entity_count(&self, table_name: &str) -> Option<usize> {
        self.rows(table_name)
            .map(|rows| rows.read().unwrap_or_else(PoisonError::into_inner).len())
    }

    fn rows(&self, table_name: &str) -> Option<Arc<RwLock<Rows>>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table_name)
            .cloned()
    }
}

impl TableService for MemoryTableService {
    type Client = MemoryTableClient;

    fn table_client(&self, table_name: &str) -> MemoryTableClient {
        MemoryTableClient {
            service: self.clone(),
            table_name: table_name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryTableClient {
    service: MemoryTableService,
    table_name: String,
}

impl MemoryTableClient {
    fn rows(&self) -> Option<Arc<RwLock<Rows>>> {
        self.service.rows(&self.table_name)
    }
}

#[async_trait]
impl TableClient for MemoryTableClient {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn upsert_entity(&self, ctx: &CallContext, entity: &[u8]) -> Result<(), UpsertError> {
        let entity = Entity::from_slice(entity)?;

        ctx.run(async {
            let rows = self
                .rows()
                .ok_or_else(|| UpsertError::TableNotFound(self.table_name.clone()))?;

            let id = (entity.partition_key().to_string(), entity.row_key().to_string());
            debug!("PUT {} PartitionKey={} RowKey={}", self.table_name, id.0, id.1);

            rows.write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id, entity);

            Ok::<_, UpsertError>(())
        })
        .await?
    }

    async fn get_entity(
        &self,
        ctx: &CallContext,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Vec<u8>, GetError> {
        ctx.run(async {
            let rows = self
                .rows()
                .ok_or_else(|| GetError::TableNotFound(self.table_name.clone()))?;

            let id = (partition_key.to_string(), row_key.to_string());
            let rows = rows.read().unwrap_or_else(PoisonError::into_inner);
            let entity = rows.get(&id).ok_or_else(|| GetError::NotFound {
                partition_key: partition_key.to_string(),
                row_key: row_key.to_string(),
            })?;

            Ok::<_, GetError>(entity.to_vec()?)
        })
        .await?
    }

    fn list_entities(&self, options: ListOptions) -> Box<dyn EntityPager + '_> {
        Box::new(MemoryPager {
            client: self,
            options,
            after: None,
            done: false,
        })
    }
}

struct MemoryPager<'t> {
    client: &'t MemoryTableClient,
    options: ListOptions,
    after: Option<RowId>,
    done: bool,
}

impl MemoryPager<'_> {
    fn page_size(&self) -> usize {
        self.options
            .top
            .and_then(|top| usize::try_from(top).ok())
            .filter(|&top| top > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    fn scan(&mut self) -> Result<Page, ListError> {
        let rows = self
            .client
            .rows()
            .ok_or_else(|| ListError::TableNotFound(self.client.table_name.clone()))?;
        let rows = rows.read().unwrap_or_else(PoisonError::into_inner);

        let start = match self.after.take() {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        let page_size = self.page_size();

        let mut entities = Vec::new();
        let mut last = None;

        for (id, entity) in rows.range((start, Bound::Unbounded)) {
            if entities.len() == page_size {
                break;
            }
            last = Some(id);

            if self.options.filter.as_ref().map_or(true, |f| f.matches(entity)) {
                let entity = match &self.options.select {
                    Some(select) => entity.clone().project(select.as_slice()),
                    None => entity.clone(),
                };
                entities.push(entity.to_vec()?);
            }
        }

        let remaining = last.map_or(false, |id| {
            rows.range((Bound::Excluded(id.clone()), Bound::Unbounded))
                .next()
                .is_some()
        });

        if remaining {
            self.after = last.cloned();
        } else {
            self.done = true;
        }

        Ok(Page { entities })
    }
}

#[async_trait]
impl EntityPager for MemoryPager<'_> {
    fn more(&self) -> bool {
        !self.done
    }

    async fn next_page(&mut self, ctx: &CallContext) -> Result<Page, ListError> {
        if self.done {
            return Err(ListError::Exhausted);
        }

        ctx.run(async { self.scan() }).await?
    }
}
