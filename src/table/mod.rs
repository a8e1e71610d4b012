//! DynamoDB-backed table service.
//!
//! Entities are stored one item per `(PartitionKey, RowKey)` in a table whose hash key
//! is `PartitionKey` and range key is `RowKey`. See [`item`] for the attribute layout.

pub(crate) mod item;
mod pager;

use self::pager::DynamoPager;
use crate::{
    config::Config,
    context::CallContext,
    entity::{Entity, PARTITION_KEY, ROW_KEY},
    errors::{GetError, InitError, ProvisionError, UpsertError},
    traits::{EntityPager, ListOptions, TableClient, TableService},
};
use async_trait::async_trait;
use aws_config::{
    meta::region::{ProvideRegion, RegionProviderChain},
    BehaviorVersion,
};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_dynamodb::{
    config::Region,
    error::DisplayErrorContext,
    operation::{
        create_table::CreateTableError, get_item::GetItemError, put_item::PutItemError,
    },
    types::{
        AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
        TableStatus,
    },
    Client,
};
use log::{debug, info};
use std::time::Duration;

/// Region used when neither the config nor the environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

const ACTIVE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const ACTIVE_POLL_ATTEMPTS: usize = 60;

#[derive(Debug, Clone)]
pub struct DynamoTableService {
    db: Client,
}

impl DynamoTableService {
    pub fn new(db: Client) -> Self {
        Self { db }
    }

    /// Load the ambient AWS configuration against `config.endpoint()` and resolve
    /// credentials once, so a missing or broken credential chain fails here rather than
    /// on the first table operation.
    pub async fn connect(config: &Config, ctx: &CallContext) -> Result<Self, InitError> {
        info!("Connecting to {}...", config.endpoint());

        let region = region_provider(config.region(), RegionProviderChain::default_provider());

        let sdk_config = ctx
            .run(
                aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .endpoint_url(config.endpoint())
                    .load(),
            )
            .await?;

        let credentials = sdk_config
            .credentials_provider()
            .ok_or(InitError::MissingCredentials)?;

        ctx.run(credentials.provide_credentials())
            .await?
            .map_err(|e| InitError::Credentials(DisplayErrorContext(e).to_string()))?;

        info!("Ready!");

        Ok(Self::new(Client::new(&sdk_config)))
    }

    /// Create `table_name` with the entity key schema. An existing table is left as is.
    pub async fn provision_table(
        &self,
        ctx: &CallContext,
        table_name: &str,
    ) -> Result<(), ProvisionError> {
        info!("Provisioning table {table_name}...");

        let request = self
            .db
            .create_table()
            .table_name(table_name)
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(PARTITION_KEY)
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(ROW_KEY)
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(PARTITION_KEY)
                    .key_type(KeyType::Hash)
                    .build()?,
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(ROW_KEY)
                    .key_type(KeyType::Range)
                    .build()?,
            )
            .billing_mode(BillingMode::PayPerRequest);

        match ctx.run(request.send()).await? {
            Ok(_) => {}
            Err(e)
                if matches!(
                    e.as_service_error(),
                    Some(CreateTableError::ResourceInUseException(_))
                ) =>
            {
                info!("Table {table_name} already exists");
            }
            Err(e) => return Err(ProvisionError::Aws(DisplayErrorContext(e).to_string())),
        }

        self.wait_until_active(ctx, table_name).await
    }

    async fn wait_until_active(
        &self,
        ctx: &CallContext,
        table_name: &str,
    ) -> Result<(), ProvisionError> {
        for _ in 0..ACTIVE_POLL_ATTEMPTS {
            let output = ctx
                .run(self.db.describe_table().table_name(table_name).send())
                .await?
                .map_err(|e| ProvisionError::Aws(DisplayErrorContext(e).to_string()))?;

            let status = output.table().and_then(|t| t.table_status());
            if status == Some(&TableStatus::Active) {
                info!("Table {table_name} is active");
                return Ok(());
            }

            debug!("Table {table_name} status: {status:?}");
            ctx.run(tokio::time::sleep(ACTIVE_POLL_INTERVAL)).await?;
        }

        Err(ProvisionError::Aws(format!(
            "Table {table_name} did not become active"
        )))
    }
}

/// The configured region, else whatever `ambient` resolves, else [`DEFAULT_REGION`].
fn region_provider(
    configured: Option<&str>,
    ambient: impl ProvideRegion + 'static,
) -> RegionProviderChain {
    RegionProviderChain::first_try(configured.map(|r| Region::new(r.to_string())))
        .or_else(ambient)
        .or_else(Region::new(DEFAULT_REGION))
}

impl TableService for DynamoTableService {
    type Client = DynamoTableClient;

    fn table_client(&self, table_name: &str) -> DynamoTableClient {
        DynamoTableClient {
            db: self.db.clone(),
            table_name: table_name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DynamoTableClient {
    db: Client,
    table_name: String,
}

#[async_trait]
impl TableClient for DynamoTableClient {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn upsert_entity(&self, ctx: &CallContext, entity: &[u8]) -> Result<(), UpsertError> {
        let entity = Entity::from_slice(entity)?;
        let item = item::to_item(&entity)?;

        debug!(
            "PUT {} PartitionKey={} RowKey={}",
            self.table_name,
            entity.partition_key(),
            entity.row_key()
        );

        ctx.run(
            self.db
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .send(),
        )
        .await?
        .map_err(|e| match e.as_service_error() {
            Some(PutItemError::ResourceNotFoundException(_)) => {
                UpsertError::TableNotFound(self.table_name.clone())
            }
            _ => UpsertError::Aws(DisplayErrorContext(&e).to_string()),
        })?;

        Ok(())
    }

    async fn get_entity(
        &self,
        ctx: &CallContext,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Vec<u8>, GetError> {
        debug!("GET {} PartitionKey={partition_key} RowKey={row_key}", self.table_name);

        let output = ctx
            .run(
                self.db
                    .get_item()
                    .table_name(&self.table_name)
                    .set_key(Some(item::key(partition_key, row_key)))
                    .consistent_read(true)
                    .send(),
            )
            .await?
            .map_err(|e| match e.as_service_error() {
                Some(GetItemError::ResourceNotFoundException(_)) => {
                    GetError::TableNotFound(self.table_name.clone())
                }
                _ => GetError::Aws(DisplayErrorContext(&e).to_string()),
            })?;

        let item = output.item.ok_or_else(|| GetError::NotFound {
            partition_key: partition_key.to_string(),
            row_key: row_key.to_string(),
        })?;

        Ok(item::from_item(item)?.to_vec()?)
    }

    fn list_entities(&self, options: ListOptions) -> Box<dyn EntityPager + '_> {
        Box::new(DynamoPager::new(self, options))
    }
}
