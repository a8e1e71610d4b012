//! Quickstart client for partitioned key-value tables.
//!
//! Entities are addressed by `(PartitionKey, RowKey)` and carry an open set of typed
//! scalar properties. The [`workflow`] upserts two entities, reads one back and scans
//! their partition through the [`traits::TableClient`] interface, which is implemented
//! for DynamoDB ([`table`]) and in process ([`memory`]).

pub mod config;
pub mod context;
pub mod entity;
pub mod errors;
pub mod filter;
pub mod memory;
pub mod table;
pub mod traits;
pub mod workflow;

// Re-exports
pub use config::Config;
pub use context::CallContext;
pub use entity::{Entity, Property};
pub use errors::{Error, ErrorKind};
pub use filter::Filter;
pub use memory::MemoryTableService;
pub use table::DynamoTableService;
pub use traits::{EntityPager, ListOptions, Page, TableClient, TableService};
pub use workflow::Workflow;
