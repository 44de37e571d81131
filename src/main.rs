//! Lambda bootstrap for the tile build relay.
//!
//! The upstream detector calls us through an API Gateway mapping template, so
//! what arrives here is plain JSON: `{"params": {"querystring": {...}}}`.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;

use tile_build_lambda::Services;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let svcs = Services::init().await?;
    let ref_svcs = &svcs;

    run(service_fn(|event: LambdaEvent<Value>| async move {
        let (payload, context) = event.into_parts();
        lambda_runtime::tracing::debug!(request_id = %context.request_id, "invoked");
        ref_svcs.handle(Some(payload)).await
    }))
    .await?;
    Ok(())
}
