//! The demonstration sequence: upsert two surfboards, read one back by key and scan
//! their partition, reporting each step as a status line.
//!
//! Every failure ends the run. Nothing is retried and completed steps are not undone.

pub mod fixtures;

use crate::{
    config::Config,
    context::CallContext,
    entity::Entity,
    errors::Error,
    filter::Filter,
    table::DynamoTableService,
    traits::{ListOptions, TableClient, TableService},
};
use log::{debug, info};

pub struct Workflow<S> {
    service: S,
    config: Config,
    ctx: CallContext,
}

impl Workflow<DynamoTableService> {
    /// Connect to the DynamoDB endpoint named by `config`.
    pub async fn connect(config: Config, ctx: CallContext) -> Result<Self, Error> {
        let service = DynamoTableService::connect(&config, &ctx).await?;
        Ok(Self::new(service, config).with_context(ctx))
    }
}

impl<S: TableService> Workflow<S> {
    pub fn new(service: S, config: Config) -> Self {
        Self {
            service,
            config,
            ctx: CallContext::background(),
        }
    }

    /// Context applied to every remote call the workflow makes.
    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every step in order, passing one status line per step to `report`.
    pub async fn run(&self, mut report: impl FnMut(&str)) -> Result<(), Error> {
        info!("ENDPOINT: {}", self.config.endpoint());
        info!("TABLE: {}", self.config.table_name());

        report("Current Status:\tStarting...");

        let table = self.service.table_client(self.config.table_name());
        report(&format!("Get table:\t{}", table.table_name()));

        self.upsert_fixtures(&table, &mut report).await?;
        self.read_fixture(&table, &mut report).await?;
        self.scan_partition(&table, &mut report).await?;

        info!("Done");
        Ok(())
    }

    async fn upsert_fixtures(
        &self,
        table: &S::Client,
        report: &mut impl FnMut(&str),
    ) -> Result<(), Error> {
        for entity in fixtures::surfboards() {
            let json = entity.to_json()?;
            table.upsert_entity(&self.ctx, json.as_bytes()).await?;

            info!("Upserted {} {}", entity.partition_key(), entity.row_key());
            report(&format!("Upserted entity:\t{json}"));
        }

        Ok(())
    }

    async fn read_fixture(
        &self,
        table: &S::Client,
        report: &mut impl FnMut(&str),
    ) -> Result<(), Error> {
        let bytes = table
            .get_entity(&self.ctx, fixtures::PARTITION_KEY, fixtures::YAMBA_ROW_KEY)
            .await?;
        let entity = Entity::from_slice(&bytes)?;

        report(&format!("Read item row key:\t{}", entity.row_key()));
        Ok(())
    }

    async fn scan_partition(
        &self,
        table: &S::Client,
        report: &mut impl FnMut(&str),
    ) -> Result<(), Error> {
        let filter = Filter::partition_key_eq(fixtures::PARTITION_KEY);
        info!("Listing entities where {filter}");

        let mut options = ListOptions::new().filter(filter);
        options.top = self.config.page_size();

        let mut pager = table.list_entities(options);
        let mut pages = 0;

        while pager.more() {
            let page = pager.next_page(&self.ctx).await?;
            pages += 1;
            debug!("Page {pages}: {} entities", page.entities.len());

            for bytes in page.entities {
                let entity = Entity::from_slice(&bytes)?;
                let name = entity
                    .get("Name")
                    .map(ToString::to_string)
                    .unwrap_or_default();

                report(&format!("Found item:\t{name}\t{}", entity.row_key()));
            }
        }

        Ok(())
    }
}
