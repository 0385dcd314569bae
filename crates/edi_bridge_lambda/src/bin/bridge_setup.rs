use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, Subcommand};
use edi_bridge_core::config::{
    parse_enabled_transaction_sets, process_env_lookup, ResourceKind, ServiceEndpoints,
    API_KEY_VAR, ENABLED_TRANSACTION_SETS_VAR, OUTPUT_BUCKET_VAR,
};
use edi_bridge_lambda::adapters::guides::HttpGuidesClient;
use edi_bridge_lambda::adapters::mapping::HttpMappingClient;
use edi_bridge_lambda::error::BridgeError;
use edi_bridge_lambda::setup::{
    create_guides, create_mappings, enable_bucket_notifications, format_resource_summary,
};
use edi_bridge_lambda::telemetry::{init_logging, LogFormat};

#[derive(Parser)]
#[command(
    name = "bridge_setup",
    about = "Provision guides, mappings and bucket notifications for the EDI bridge"
)]
struct Cli {
    /// Directory holding one sub-directory per transaction set
    #[arg(long, env = "BRIDGE_RESOURCES_DIR", default_value = "resources")]
    resources_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and publish a guide for every enabled transaction set
    CreateGuides {
        /// Only transaction sets whose name contains this value
        filter: Option<String>,
    },
    /// Create a mapping for every enabled transaction set
    CreateMappings {
        /// Only transaction sets whose name contains this value
        filter: Option<String>,
    },
    /// Trigger the inbound function when objects land in the SFTP bucket.
    ///
    /// Other notifications already on the bucket are kept.
    EnableBucketNotifications {
        /// ARN of the deployed inbound function
        #[arg(long)]
        function_arn: String,
        #[arg(long, env = OUTPUT_BUCKET_VAR)]
        bucket: String,
    },
}

fn required_env(name: &str) -> Result<String, BridgeError> {
    process_env_lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| BridgeError::Setup(format!("{name} must be configured")))
}

fn enabled_transaction_sets() -> Result<Vec<String>, BridgeError> {
    Ok(parse_enabled_transaction_sets(&required_env(
        ENABLED_TRANSACTION_SETS_VAR,
    )?))
}

async fn run(cli: Cli) -> Result<(), BridgeError> {
    let endpoints = ServiceEndpoints::from_lookup(&process_env_lookup);

    match cli.command {
        Commands::CreateGuides { filter } => {
            let client = HttpGuidesClient::new(&endpoints.guides, &required_env(API_KEY_VAR)?)?;
            let created = create_guides(
                &cli.resources_dir,
                &enabled_transaction_sets()?,
                filter.as_deref(),
                &client,
            )
            .await?;
            println!("{}", format_resource_summary(ResourceKind::Guide, &created));
        }
        Commands::CreateMappings { filter } => {
            let client =
                HttpMappingClient::new(&endpoints.mappings, &required_env(API_KEY_VAR)?)?;
            let created = create_mappings(
                &cli.resources_dir,
                &enabled_transaction_sets()?,
                filter.as_deref(),
                &client,
            )
            .await?;
            println!("{}", format_resource_summary(ResourceKind::Mapping, &created));
        }
        Commands::EnableBucketNotifications {
            function_arn,
            bucket,
        } => {
            let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            enable_bucket_notifications(
                &aws_sdk_s3::Client::new(&aws_config),
                &aws_sdk_lambda::Client::new(&aws_config),
                &bucket,
                &function_arn,
            )
            .await?;
            println!("Done. Notifications enabled on {bucket}.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging(LogFormat::from_env());

    if let Err(error) = run(Cli::parse()).await {
        eprintln!("error: {error}");
        exit(1);
    }
}
