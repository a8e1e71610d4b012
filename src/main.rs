use clap::Parser;
use std::time::Duration;
use tablestore::{config::ConfigBuilder, CallContext, Config, Workflow};

/// Upsert two surfboards into a table, read one back and list their partition.
///
/// Settings not given on the command line are read from the environment
/// (CONFIGURATION__TABLES__ENDPOINT, CONFIGURATION__TABLES__TABLENAME,
/// CONFIGURATION__TABLES__REGION, CONFIGURATION__TABLES__PAGESIZE).
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Base URL of the table service
    #[arg(long)]
    endpoint: Option<String>,

    /// Table to write to
    #[arg(long)]
    table_name: Option<String>,

    /// Signing region
    #[arg(long)]
    region: Option<String>,

    /// Maximum entities per scan page
    #[arg(long)]
    page_size: Option<i32>,

    /// Give up on the run after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Create the table first if it does not exist
    #[arg(long)]
    provision: bool,
}

impl Args {
    fn config(&self) -> Result<Config, tablestore::errors::ConfigError> {
        self.builder().with_env().build()
    }

    /// Builder holding only the settings given as flags.
    fn builder(&self) -> ConfigBuilder {
        let mut builder = Config::builder();

        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint(endpoint);
        }
        if let Some(table_name) = &self.table_name {
            builder = builder.table_name(table_name);
        }
        if let Some(region) = &self.region {
            builder = builder.region(region);
        }
        if let Some(page_size) = self.page_size {
            builder = builder.page_size(page_size);
        }

        builder
    }

    fn context(&self) -> CallContext {
        match self.timeout_secs {
            Some(secs) => CallContext::background().with_timeout(Duration::from_secs(secs)),
            None => CallContext::background(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .without_time()
        .init();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = args.config()?;
    let ctx = args.context();

    let workflow = Workflow::connect(config, ctx.clone()).await?;

    if args.provision {
        workflow
            .service()
            .provision_table(&ctx, workflow.config().table_name())
            .await?;
    }

    workflow.run(|line| println!("{line}")).await?;

    Ok(())
}
