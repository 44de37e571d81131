//! "Proxy event" version of the tile build relay.
//!
//! This executable defines a server that expects to be interacted with
//! according to AWS API Gateway's "proxy event" protocol. The build parameters
//! come from the request's query string; we repackage them into the same
//! envelope that the mapping-template deployment receives.

use lambda_http::{run, service_fn, Error, Request, RequestExt};
use serde_json::{json, Map, Value};

use tile_build_lambda::Services;

const QUERY_FIELDS: [&str; 4] = ["tileIndex", "blockNumber", "hexString", "version"];

#[tokio::main]
async fn main() -> Result<(), Error> {
    let svcs = Services::init().await?;
    let ref_svcs = &svcs;

    run(service_fn(|req: Request| async move {
        let params = req.query_string_parameters();

        let mut querystring = Map::new();

        for field in QUERY_FIELDS {
            if let Some(value) = params.first(field) {
                querystring.insert(field.to_owned(), Value::from(value));
            }
        }

        let payload = json!({ "params": { "path": {}, "querystring": querystring } });
        ref_svcs.handle(Some(payload)).await
    }))
    .await?;
    Ok(())
}
