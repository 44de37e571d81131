//! The build relay itself.
//!
//! Validate, fetch geometry, compress, write the record(s), update the index.
//! Each step waits for the one before it and the first failure ends the run.

use lambda_runtime::tracing::{info, warn};
use serde_json::Value;

use crate::{
    codec::{compress_geometry, split_payload},
    config::Config,
    error::BuildError,
    event::BuildEvent,
    geometry::GeometrySource,
    index::merge_tile_index,
    store::{BuildRecord, BuildStore},
};

/// What a successful run did.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildSummary {
    /// Keys of the records written, in write order.
    pub record_keys: Vec<String>,

    /// False if the tile was already listed in the version's index.
    pub newly_indexed: bool,
}

pub async fn run_build<G, S>(
    payload: Option<&Value>,
    geometry: &G,
    store: &S,
    config: &Config,
) -> Result<BuildSummary, BuildError>
where
    G: GeometrySource + ?Sized,
    S: BuildStore + ?Sized,
{
    let event = BuildEvent::from_payload(payload)?;
    info!(
        tile = event.tile_index,
        version = %event.version,
        block = event.block_number,
        "accepted build event"
    );

    let doc = geometry
        .fetch(&event.hex_string)
        .await
        .map_err(BuildError::Geometry)?;

    let compressed = compress_geometry(&doc)?;
    let compressed_len = compressed.len();
    let (head, tail) = split_payload(compressed, config.split_threshold);
    info!(
        compressed_len,
        split = tail.is_some(),
        "compressed geometry"
    );

    let mut record_keys = Vec::with_capacity(2);

    let parts = std::iter::once((head, false)).chain(tail.map(|t| (t, true)));

    for (part, second_half) in parts {
        let record = BuildRecord::for_event(&event, part, second_half);
        store.put_build(&record).await.map_err(BuildError::Store)?;
        info!(key = %record.composite_key, "wrote build record");
        record_keys.push(record.composite_key);
    }

    let newly_indexed = add_to_index(&event, store, config.index_update_attempts).await?;

    Ok(BuildSummary {
        record_keys,
        newly_indexed,
    })
}

/// Merge the event's tile into its version's index list with a conditional
/// write, re-reading and retrying if another writer got there first.
async fn add_to_index<S>(event: &BuildEvent, store: &S, attempts: usize) -> Result<bool, BuildError>
where
    S: BuildStore + ?Sized,
{
    let version = event.version;

    for attempt in 1..=attempts {
        let current = store
            .get_index(version)
            .await
            .map_err(BuildError::Store)?
            .ok_or(BuildError::IndexMissing { version })?;

        let merged = merge_tile_index(&current, event.tile_index)
            .map_err(|source| BuildError::IndexCorrupt { version, source })?;

        if !merged.changed() {
            info!(tile = event.tile_index, %version, "tile already indexed");
            return Ok(false);
        }

        if store
            .replace_index(version, &current, &merged.json)
            .await
            .map_err(BuildError::Store)?
        {
            info!(
                tile = event.tile_index,
                %version,
                collapsed = merged.collapsed,
                "updated tile index"
            );
            return Ok(merged.added);
        }

        warn!(%version, attempt, "tile index changed while updating it; retrying");
    }

    Err(BuildError::IndexContention { version, attempts })
}
