//! Deployment settings, taken from the Lambda environment.

use anyhow::{anyhow, bail, Result};

use crate::codec::DEFAULT_SPLIT_THRESHOLD;

pub const DEFAULT_ENVIRONMENT: &str = "dev";

pub const DEFAULT_INDEX_UPDATE_ATTEMPTS: usize = 5;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Table holding the compressed build records.
    pub builds_table: String,

    /// Table holding one tile index list per schema version.
    pub index_table: String,

    /// Name or ARN of the hex-to-geometry function.
    pub geometry_function: String,

    /// Compressed payloads longer than this many characters are split across
    /// two records.
    pub split_threshold: usize,

    /// How many times to try the conditional index write before giving up.
    pub index_update_attempts: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = lookup("DEPLOY_ENV").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_owned());

        let builds_table =
            lookup("BUILDS_TABLE").unwrap_or_else(|| format!("mapbuild-{env}-builds"));
        let index_table =
            lookup("BUILD_INDEX_TABLE").unwrap_or_else(|| format!("mapbuild-{env}-build-index"));
        let geometry_function = lookup("GEOMETRY_FUNCTION")
            .unwrap_or_else(|| format!("mapbuild-{env}-hex-to-geometry"));

        let split_threshold =
            positive_setting(&lookup, "SPLIT_THRESHOLD", DEFAULT_SPLIT_THRESHOLD)?;
        let index_update_attempts = positive_setting(
            &lookup,
            "INDEX_UPDATE_ATTEMPTS",
            DEFAULT_INDEX_UPDATE_ATTEMPTS,
        )?;

        Ok(Config {
            builds_table,
            index_table,
            geometry_function,
            split_threshold,
            index_update_attempts,
        })
    }
}

fn positive_setting<F>(lookup: &F, name: &str, default: usize) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(name) {
        None => return Ok(default),
        Some(text) => text
            .trim()
            .parse::<usize>()
            .map_err(|e| anyhow!("invalid {name} setting `{text}`: {e}"))?,
    };

    if value == 0 {
        bail!("{name} must be greater than zero");
    }

    Ok(value)
}
