//! Requesting geometry from the hex-to-geometry service.
//!
//! That service is its own Lambda. It expects to be called the way API Gateway
//! would call it through a mapping template, so we wrap the hex string in the
//! same `params.querystring` envelope that we ourselves receive.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use aws_sdk_lambda::{error::DisplayErrorContext, primitives::Blob, types::InvocationType};
use serde_json::{json, Value};

#[async_trait]
pub trait GeometrySource {
    /// Turn a hex string into a geometry document.
    async fn fetch(&self, hex_string: &str) -> Result<Value>;
}

/// The request envelope sent to the geometry service. Only `hexString` is
/// forwarded.
pub fn request_envelope(hex_string: &str) -> Value {
    json!({
        "body-json": {},
        "params": {
            "path": {},
            "querystring": { "hexString": hex_string },
        },
    })
}

pub struct LambdaGeometry {
    client: aws_sdk_lambda::Client,
    function_name: String,
}

impl LambdaGeometry {
    pub fn new(client: aws_sdk_lambda::Client, function_name: String) -> Self {
        LambdaGeometry {
            client,
            function_name,
        }
    }
}

#[async_trait]
impl GeometrySource for LambdaGeometry {
    async fn fetch(&self, hex_string: &str) -> Result<Value> {
        let payload = serde_json::to_vec(&request_envelope(hex_string))?;

        let resp = self
            .client
            .invoke()
            .function_name(&self.function_name)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        let body: &[u8] = resp.payload().map(|b| b.as_ref()).unwrap_or_default();

        // Errors raised inside the function still come back as a 200 with the
        // error serialized in the payload.
        if let Some(kind) = resp.function_error() {
            bail!(
                "geometry function `{}` failed ({kind}): {}",
                self.function_name,
                String::from_utf8_lossy(body)
            );
        }

        if body.is_empty() {
            bail!(
                "geometry function `{}` returned no payload",
                self.function_name
            );
        }

        serde_json::from_slice(body).map_err(|e| {
            anyhow!(
                "geometry function `{}` returned invalid JSON: {e}",
                self.function_name
            )
        })
    }
}
