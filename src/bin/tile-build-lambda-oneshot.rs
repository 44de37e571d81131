//! "Oneshot" version of the tile build relay.
//!
//! This executable runs one build, from an event given as JSON text on the
//! command line, against whatever AWS resources the environment points at.

use lambda_runtime::Error;
use serde_json::Value;
use std::env;

use tile_build_lambda::Services;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let mut args = env::args();
    args.next(); // skip argv[0]

    let json_text = args.next().ok_or_else(|| -> Error {
        "first argument should be the event JSON, e.g. \
         {\"params\":{\"querystring\":{\"tileIndex\":\"12\",...}}}"
            .into()
    })?;
    let payload: Value = serde_json::from_str(&json_text)?;

    let svcs = Services::init().await?;
    let result = svcs.handle(Some(payload)).await?;

    serde_json::to_writer(std::io::stdout().lock(), &result)?;
    Ok(())
}
