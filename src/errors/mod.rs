use thiserror::Error;

pub use crate::{
    config::ConfigError,
    context::CallError,
    entity::{EntityError, ReadConversionError, WriteConversionError},
    filter::FilterError,
};

pub use aws_sdk_dynamodb::error::BuildError;

/// Error returned by [`DynamoTableService::connect`](crate::table::DynamoTableService::connect)
/// when the ambient credential chain cannot produce credentials.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("No credentials provider could be resolved from the environment")]
    MissingCredentials,
    #[error("CredentialsError: {0}")]
    Credentials(String),
    #[error("CallError: {0}")]
    Call(#[from] CallError),
}

/// Error returned by [`TableClient::upsert_entity`](crate::traits::TableClient::upsert_entity)
#[derive(Error, Debug)]
pub enum UpsertError {
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("AwsError: {0}")]
    Aws(String),
    #[error("Decode Error: {0}")]
    Decode(#[from] EntityError),
    #[error("Write Conversion Error: {0}")]
    WriteConversion(#[from] WriteConversionError),
    #[error("CallError: {0}")]
    Call(#[from] CallError),
}

/// Error returned by [`TableClient::get_entity`](crate::traits::TableClient::get_entity)
#[derive(Error, Debug)]
pub enum GetError {
    #[error("Entity not found: PartitionKey={partition_key} RowKey={row_key}")]
    NotFound {
        partition_key: String,
        row_key: String,
    },
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("AwsError: {0}")]
    Aws(String),
    #[error("Read Conversion Error: {0}")]
    ReadConversion(#[from] ReadConversionError),
    #[error("Encode Error: {0}")]
    Encode(#[from] EntityError),
    #[error("CallError: {0}")]
    Call(#[from] CallError),
}

/// Error returned by [`EntityPager::next_page`](crate::traits::EntityPager::next_page)
#[derive(Error, Debug)]
pub enum ListError {
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("AwsError: {0}")]
    Aws(String),
    #[error("Read Conversion Error: {0}")]
    ReadConversion(#[from] ReadConversionError),
    #[error("Write Conversion Error: {0}")]
    WriteConversion(#[from] WriteConversionError),
    #[error("Encode Error: {0}")]
    Encode(#[from] EntityError),
    #[error("No more pages")]
    Exhausted,
    #[error("CallError: {0}")]
    Call(#[from] CallError),
}

/// Error returned by [`DynamoTableService::provision_table`](crate::table::DynamoTableService::provision_table)
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("AwsError: {0}")]
    Aws(String),
    #[error("AwsBuildError: {0}")]
    AwsBuildError(#[from] BuildError),
    #[error("CallError: {0}")]
    Call(#[from] CallError),
}

/// Coarse classification of everything the workflow can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigurationMissing,
    AuthenticationFailure,
    RemoteOperationFailure,
}

/// Error abstracting all errors returned by the workflow.
///
/// Every variant is terminal for the workflow: nothing is retried and steps that
/// already completed are not undone. Use [`Error::kind`] to classify it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("ConfigError: {0}")]
    Config(#[from] ConfigError),
    #[error("InitError: {0}")]
    Init(#[from] InitError),
    #[error("ProvisionError: {0}")]
    Provision(#[from] ProvisionError),
    #[error("UpsertError: {0}")]
    Upsert(#[from] UpsertError),
    #[error("GetError: {0}")]
    Get(#[from] GetError),
    #[error("ListError: {0}")]
    List(#[from] ListError),
    #[error("EntityError: {0}")]
    Entity(#[from] EntityError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::ConfigurationMissing,
            Self::Init(_) => ErrorKind::AuthenticationFailure,
            Self::Provision(_)
            | Self::Upsert(_)
            | Self::Get(_)
            | Self::List(_)
            | Self::Entity(_) => ErrorKind::RemoteOperationFailure,
        }
    }
}
