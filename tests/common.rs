#![allow(dead_code)]

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    types::{AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType},
    Client,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tablestore::{
    errors::{GetError, ListError, UpsertError},
    memory::MemoryTableClient,
    CallContext, Config, EntityPager, ListOptions, MemoryTableService, Page, TableClient,
    TableService,
};

pub const TABLE_NAME: &str = "products";

pub fn config() -> Config {
    Config::builder()
        .endpoint("http://localhost:8000")
        .table_name(TABLE_NAME)
        .build()
        .expect("Failed to build config")
}

pub fn config_with_page_size(page_size: i32) -> Config {
    Config::builder()
        .endpoint("http://localhost:8000")
        .table_name(TABLE_NAME)
        .page_size(page_size)
        .build()
        .expect("Failed to build config")
}

/// Which call the [`FailingService`] should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    /// The nth upsert, counting from zero.
    Upsert(usize),
    Get,
    List,
}

/// Memory table service that fails one chosen call with a service error.
#[derive(Debug, Clone)]
pub struct FailingService {
    inner: MemoryTableService,
    fail_at: FailAt,
    upserts: Arc<AtomicUsize>,
}

impl FailingService {
    pub fn new(inner: MemoryTableService, fail_at: FailAt) -> Self {
        Self {
            inner,
            fail_at,
            upserts: Default::default(),
        }
    }
}

impl TableService for FailingService {
    type Client = FailingTable;

    fn table_client(&self, table_name: &str) -> FailingTable {
        FailingTable {
            inner: self.inner.table_client(table_name),
            fail_at: self.fail_at,
            upserts: self.upserts.clone(),
        }
    }
}

pub struct FailingTable {
    inner: MemoryTableClient,
    fail_at: FailAt,
    upserts: Arc<AtomicUsize>,
}

#[async_trait]
impl TableClient for FailingTable {
    fn table_name(&self) -> &str {
        self.inner.table_name()
    }

    async fn upsert_entity(&self, ctx: &CallContext, entity: &[u8]) -> Result<(), UpsertError> {
        let n = self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == FailAt::Upsert(n) {
            return Err(UpsertError::Aws("injected upsert failure".into()));
        }
        self.inner.upsert_entity(ctx, entity).await
    }

    async fn get_entity(
        &self,
        ctx: &CallContext,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Vec<u8>, GetError> {
        if self.fail_at == FailAt::Get {
            return Err(GetError::Aws("injected get failure".into()));
        }
        self.inner.get_entity(ctx, partition_key, row_key).await
    }

    fn list_entities(&self, options: ListOptions) -> Box<dyn EntityPager + '_> {
        if self.fail_at == FailAt::List {
            return Box::new(FailingPager);
        }
        self.inner.list_entities(options)
    }
}

struct FailingPager;

#[async_trait]
impl EntityPager for FailingPager {
    fn more(&self) -> bool {
        true
    }

    async fn next_page(&mut self, _ctx: &CallContext) -> Result<Page, ListError> {
        Err(ListError::Aws("injected scan failure".into()))
    }
}

pub async fn create_table(client: &Client, table_name: &str) {
    let _ = client.delete_table().table_name(table_name).send().await;

    client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("PartitionKey")
                .attribute_type(ScalarAttributeType::S)
                .build()
                .expect("Failed to build attribute definition"),
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("RowKey")
                .attribute_type(ScalarAttributeType::S)
                .build()
                .expect("Failed to build attribute definition"),
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("PartitionKey")
                .key_type(KeyType::Hash)
                .build()
                .expect("Failed to build key schema element"),
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("RowKey")
                .key_type(KeyType::Range)
                .build()
                .expect("Failed to build key schema element"),
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await
        .expect("Failed to create table");
}

#[macro_export]
macro_rules! assert_err {
    ($cond:expr,) => {
        $crate::assert_err!($cond);
    };
    ($cond:expr) => {
        match $cond {
            Ok(t) => {
                panic!("assertion failed, expected Err(..), got Ok({:?})", t);
            },
            Err(e) => e,
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        match $cond {
            Ok(t) => {
                panic!("assertion failed, expected Err(..), got Ok({:?}): {}", t, format_args!($($arg)+));
            },
            Err(e) => e,
        }
    };
}
