//! One-off provisioning: guides, mappings and the inbound bucket trigger.
//!
//! Resources live under `{root}/{TRANSACTION_SET}/guide.json` and
//! `{root}/{TRANSACTION_SET}/mapping.json`. Created ids are merged into the
//! sibling `.resource_ids` file as `{TXN}_GUIDE_ID` / `{TXN}_MAPPING_ID`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use aws_sdk_s3::types::{
    Event, EventBridgeConfiguration, LambdaFunctionConfiguration, NotificationConfiguration,
    QueueConfiguration, TopicConfiguration,
};
use edi_bridge_core::config::{resource_env_var, ResourceKind};
use edi_bridge_core::resource_ids::{parse_resource_ids, render_resource_ids, RESOURCE_IDS_FILE_NAME};
use serde_json::Value;
use tracing::info;

use crate::adapters::guides::GuidesClient;
use crate::adapters::mapping::MappingCatalog;
use crate::error::BridgeError;

const COMPONENT: &str = "setup";

pub const GUIDE_FILE_NAME: &str = "guide.json";
pub const MAPPING_FILE_NAME: &str = "mapping.json";
pub const OBJECT_CREATED_EVENT: &str = "s3:ObjectCreated:*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDetails {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    pub transaction_set: String,
    pub path: PathBuf,
}

fn resource_label(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Guide => "guide",
        ResourceKind::Mapping => "mapping",
    }
}

/// Enabled transaction sets that have `file_name` on disk and whose name
/// contains `filter`. An empty result is an error.
pub fn resource_files(
    root: &Path,
    transaction_sets: &[String],
    file_name: &str,
    filter: Option<&str>,
) -> Result<Vec<ResourceFile>, BridgeError> {
    let files: Vec<ResourceFile> = transaction_sets
        .iter()
        .filter(|transaction_set| filter.map_or(true, |needle| transaction_set.contains(needle)))
        .map(|transaction_set| ResourceFile {
            transaction_set: transaction_set.clone(),
            path: root.join(transaction_set).join(file_name),
        })
        .filter(|file| file.path.is_file())
        .collect();

    if files.is_empty() {
        return Err(BridgeError::Setup(format!(
            "No matching assets found. (path filter: {})",
            filter.unwrap_or("none")
        )));
    }
    Ok(files)
}

/// The guides API returns `<prefix>_<id>`; downstream calls take the id part.
pub fn guide_id_suffix(created_id: &str) -> &str {
    created_id
        .split_once('_')
        .map_or(created_id, |(_, suffix)| suffix)
}

pub async fn create_guides(
    root: &Path,
    transaction_sets: &[String],
    filter: Option<&str>,
    client: &dyn GuidesClient,
) -> Result<Vec<ResourceDetails>, BridgeError> {
    let mut created = Vec::new();
    for file in resource_files(root, transaction_sets, GUIDE_FILE_NAME, filter)? {
        info!(
            component = COMPONENT,
            event = "creating_guide",
            transaction_set = %file.transaction_set,
        );
        let definition = read_definition(&file.path)?;
        let guide_id = client.create_guide(&definition).await?;
        client.publish_guide(&guide_id).await?;

        let id = guide_id_suffix(&guide_id).to_string();
        record_resource_id(root, &file.transaction_set, ResourceKind::Guide, &id)?;
        created.push(ResourceDetails {
            name: file.transaction_set,
            id,
        });
    }
    Ok(created)
}

pub async fn create_mappings(
    root: &Path,
    transaction_sets: &[String],
    filter: Option<&str>,
    client: &dyn MappingCatalog,
) -> Result<Vec<ResourceDetails>, BridgeError> {
    let mut created = Vec::new();
    for file in resource_files(root, transaction_sets, MAPPING_FILE_NAME, filter)? {
        info!(
            component = COMPONENT,
            event = "creating_mapping",
            transaction_set = %file.transaction_set,
        );
        let definition = read_definition(&file.path)?;
        let id = client.create_mapping(&definition).await?;

        record_resource_id(root, &file.transaction_set, ResourceKind::Mapping, &id)?;
        created.push(ResourceDetails {
            name: file.transaction_set,
            id,
        });
    }
    Ok(created)
}

fn read_definition(path: &Path) -> Result<Value, BridgeError> {
    let raw = fs::read_to_string(path)
        .map_err(|error| BridgeError::Setup(format!("failed to read {}: {error}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|error| BridgeError::Setup(format!("invalid JSON in {}: {error}", path.display())))
}

/// Merges one entry into `{root}/{transaction_set}/.resource_ids`, keeping
/// every other entry already in the file.
pub fn record_resource_id(
    root: &Path,
    transaction_set: &str,
    kind: ResourceKind,
    id: &str,
) -> Result<PathBuf, BridgeError> {
    let path = root.join(transaction_set).join(RESOURCE_IDS_FILE_NAME);
    let mut entries = match fs::read_to_string(&path) {
        Ok(contents) => parse_resource_ids(&contents),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
        Err(error) => {
            return Err(BridgeError::Setup(format!(
                "failed to read {}: {error}",
                path.display()
            )))
        }
    };
    entries.insert(resource_env_var(transaction_set, kind), id.to_string());

    fs::write(&path, render_resource_ids(&entries))
        .map_err(|error| BridgeError::Setup(format!("failed to write {}: {error}", path.display())))?;
    Ok(path)
}

pub fn format_resource_summary(kind: ResourceKind, resources: &[ResourceDetails]) -> String {
    let label = resource_label(kind);
    let mut summary = match resources.len() {
        0 => format!("Done. No {label}s created."),
        1 => format!("Done. Created 1 {label}:"),
        count => format!("Done. Created {count} {label}s:"),
    };
    for resource in resources {
        summary.push_str(&format!("\n{} (id={})", resource.name, resource.id));
    }
    summary
}

/// Every notification already on `bucket` except an earlier subscription of
/// the same function, plus `subscription`.
pub fn merge_notification_configuration(
    lambdas: &[LambdaFunctionConfiguration],
    queues: &[QueueConfiguration],
    topics: &[TopicConfiguration],
    event_bridge: Option<&EventBridgeConfiguration>,
    subscription: LambdaFunctionConfiguration,
) -> NotificationConfiguration {
    let mut merged: Vec<LambdaFunctionConfiguration> = lambdas
        .iter()
        .filter(|existing| existing.lambda_function_arn() != subscription.lambda_function_arn())
        .cloned()
        .collect();
    merged.push(subscription);

    NotificationConfiguration::builder()
        .set_lambda_function_configurations(Some(merged))
        .set_queue_configurations(Some(queues.to_vec()))
        .set_topic_configurations(Some(topics.to_vec()))
        .set_event_bridge_configuration(event_bridge.cloned())
        .build()
}

/// Lets S3 invoke `function_arn` and subscribes it to object creation in
/// `bucket`. An existing invoke permission is left in place.
///
/// The bucket's notification configuration is replaced as a whole by S3, so
/// the current one is read first and other subscriptions are carried over.
pub async fn enable_bucket_notifications(
    s3: &aws_sdk_s3::Client,
    lambda: &aws_sdk_lambda::Client,
    bucket: &str,
    function_arn: &str,
) -> Result<(), BridgeError> {
    let granted = lambda
        .add_permission()
        .function_name(function_arn)
        .statement_id(format!("{bucket}-object-created"))
        .action("lambda:InvokeFunction")
        .principal("s3.amazonaws.com")
        .source_arn(format!("arn:aws:s3:::{bucket}"))
        .send()
        .await;
    match granted {
        Ok(_) => {}
        Err(error)
            if error
                .as_service_error()
                .is_some_and(|service| service.is_resource_conflict_exception()) =>
        {
            info!(
                component = COMPONENT,
                event = "invoke_permission_exists",
                function_arn = function_arn,
            );
        }
        Err(error) => {
            return Err(BridgeError::Setup(format!(
                "failed to grant S3 invoke permission: {}",
                aws_sdk_lambda::error::DisplayErrorContext(&error)
            )))
        }
    }

    let lambda_configuration = LambdaFunctionConfiguration::builder()
        .lambda_function_arn(function_arn)
        .events(Event::from(OBJECT_CREATED_EVENT))
        .build()
        .map_err(|error| BridgeError::Setup(format!("invalid notification: {error}")))?;

    let current = s3
        .get_bucket_notification_configuration()
        .bucket(bucket)
        .send()
        .await
        .map_err(|error| {
            BridgeError::Setup(format!(
                "failed to read notifications on {bucket}: {}",
                aws_sdk_s3::error::DisplayErrorContext(&error)
            ))
        })?;
    let configuration = merge_notification_configuration(
        current.lambda_function_configurations(),
        current.queue_configurations(),
        current.topic_configurations(),
        current.event_bridge_configuration(),
        lambda_configuration,
    );

    s3.put_bucket_notification_configuration()
        .bucket(bucket)
        .notification_configuration(configuration)
        .send()
        .await
        .map_err(|error| {
            BridgeError::Setup(format!(
                "failed to enable notifications on {bucket}: {}",
                aws_sdk_s3::error::DisplayErrorContext(&error)
            ))
        })?;

    info!(
        component = COMPONENT,
        event = "bucket_notifications_enabled",
        bucket = bucket,
        function_arn = function_arn,
    );
    Ok(())
}
