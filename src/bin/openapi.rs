//! Print the OpenAPI spec for the service as JSON.

use anyhow::Result;

fn main() -> Result<()> {
    let spec = sesamo::api::openapi::openapi();
    println!("{}", spec.to_pretty_json()?);
    Ok(())
}
