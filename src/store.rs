//! Persistence of build records and tile index lists.
//!
//! Production data live in two DynamoDB tables: one keyed by `compositeKey`
//! holding the compressed builds, and one keyed by `indexKey` holding a
//! JSON-encoded tile list per schema version. The [`BuildStore`] trait exists
//! so that the pipeline can be exercised without AWS.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::{error::DisplayErrorContext, types::AttributeValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::event::{BuildEvent, Version};

/// Suffix on the key of the second half of a split build.
pub const SPLIT_KEY_SUFFIX: &str = "_2";

/// One stored build, or one half of a split build.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    pub composite_key: String,
    pub block_number: u64,
    pub compressed_payload: String,
    pub tile_index: u16,
    pub version: String,
    pub hex_string: String,
}

impl BuildRecord {
    /// The record for `event` with the given payload; `second_half` selects the
    /// suffixed key used for the overflow part of a split build.
    pub fn for_event(event: &BuildEvent, compressed_payload: String, second_half: bool) -> Self {
        let mut composite_key = build_key(event.tile_index, event.version);

        if second_half {
            composite_key.push_str(SPLIT_KEY_SUFFIX);
        }

        BuildRecord {
            composite_key,
            block_number: event.block_number,
            compressed_payload,
            tile_index: event.tile_index,
            version: event.version.as_str().to_owned(),
            hex_string: event.hex_string.clone(),
        }
    }
}

/// `1017v1.2`-style record key.
pub fn build_key(tile_index: u16, version: Version) -> String {
    format!("{tile_index}v{version}")
}

/// Key of the index list item for a schema version.
pub fn index_key(version: Version) -> String {
    format!("tiles_v{version}")
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexItem {
    index_key: String,
    tile_indices: String,
}

#[async_trait]
pub trait BuildStore {
    /// Create or overwrite a build record.
    async fn put_build(&self, record: &BuildRecord) -> Result<()>;

    /// Get the raw JSON text of a version's tile index list, if one exists.
    async fn get_index(&self, version: Version) -> Result<Option<String>>;

    /// Replace a version's tile index list, but only if it still reads
    /// `expected`. Returns false if someone else changed it first.
    async fn replace_index(
        &self,
        version: Version,
        expected: &str,
        updated: &str,
    ) -> Result<bool>;
}

pub struct DynamoStore {
    client: aws_sdk_dynamodb::Client,
    builds_table: String,
    index_table: String,
}

impl DynamoStore {
    pub fn new(
        client: aws_sdk_dynamodb::Client,
        builds_table: String,
        index_table: String,
    ) -> Self {
        DynamoStore {
            client,
            builds_table,
            index_table,
        }
    }
}

#[async_trait]
impl BuildStore for DynamoStore {
    async fn put_build(&self, record: &BuildRecord) -> Result<()> {
        let item: HashMap<String, AttributeValue> = serde_dynamo::to_item(record)?;

        self.client
            .put_item()
            .table_name(&self.builds_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        Ok(())
    }

    async fn get_index(&self, version: Version) -> Result<Option<String>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.index_table)
            .key("indexKey", AttributeValue::S(index_key(version)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        let Some(item) = result.item else {
            return Ok(None);
        };

        let item: IndexItem = serde_dynamo::from_item(item)?;
        Ok(Some(item.tile_indices))
    }

    async fn replace_index(&self, version: Version, expected: &str, updated: &str) -> Result<bool> {
        let item: HashMap<String, AttributeValue> = serde_dynamo::to_item(IndexItem {
            index_key: index_key(version),
            tile_indices: updated.to_owned(),
        })?;

        let result = self
            .client
            .put_item()
            .table_name(&self.index_table)
            .set_item(Some(item))
            .condition_expression("#t = :expected")
            .expression_attribute_names("#t", "tileIndices")
            .expression_attribute_values(":expected", AttributeValue::S(expected.to_owned()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();

                if service_error.is_conditional_check_failed_exception() {
                    Ok(false)
                } else {
                    Err(anyhow!("{}", DisplayErrorContext(&service_error)))
                }
            }
        }
    }
}
