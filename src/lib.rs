//! The AWS/Lambda-powered tile build relay
//!
//! This library crate implements the Lambda that records map tile builds. An
//! upstream detector notices a build on chain and hands us the tile, block
//! number, schema version, and the tile's hex string. We ask the
//! hex-to-geometry Lambda to render that hex string, compress what it gives
//! back, and store it in DynamoDB, then add the tile to the per-version list of
//! built tiles.
//!
//! The common codebase is compiled into a few executables: the default binary
//! is the plain Lambda bootstrap; `tile-build-lambda-proxyevent` speaks API
//! Gateway's "proxy event" protocol; and `tile-build-lambda-oneshot` runs a
//! single build from the command line, for testing against real resources.
//!
//! Every step is one remote call that waits for the previous one. Nothing is
//! retried except the conditional write of the tile index, and nothing is
//! rolled back.

use lambda_runtime::{
    tracing::{self, error},
    Error,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod index;
pub mod pipeline;
pub mod store;

pub use config::Config;
pub use error::BuildError;
pub use pipeline::{run_build, BuildSummary};

pub struct Services {
    geometry: geometry::LambdaGeometry,
    store: store::DynamoStore,
    config: Config,
}

impl Services {
    /// Create a state object for the build relay.
    pub async fn init() -> Result<Self, Error> {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.as_str())),
            )
            .with_target(false) // don't print the module name
            .without_time() // don't print time (CloudWatch has it)
            .init();

        let config = Config::from_env()?;
        tracing::info!(
            builds_table = %config.builds_table,
            index_table = %config.index_table,
            geometry_function = %config.geometry_function,
            split_threshold = config.split_threshold,
            "configured"
        );

        let aws = aws_config::load_from_env().await;

        let geometry = geometry::LambdaGeometry::new(
            aws_sdk_lambda::Client::new(&aws),
            config.geometry_function.clone(),
        );
        let store = store::DynamoStore::new(
            aws_sdk_dynamodb::Client::new(&aws),
            config.builds_table.clone(),
            config.index_table.clone(),
        );

        Ok(Services {
            geometry,
            store,
            config,
        })
    }

    /// Handle one build event. Success is reported as JSON `null`.
    pub async fn handle(&self, payload: Option<Value>) -> Result<Value, Error> {
        match run_build(payload.as_ref(), &self.geometry, &self.store, &self.config).await {
            Ok(summary) => {
                tracing::info!(records = ?summary.record_keys, "build recorded");
                Ok(Value::Null)
            }

            Err(e) => {
                error!("build failed: {e}");
                Err(e.into())
            }
        }
    }
}
