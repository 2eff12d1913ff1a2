use anyhow::Context;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "portal-data";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    service_portal_lib::run(data_dir.clone())
        .await
        .with_context(|| format!("service portal failed in {}", data_dir.display()))
}
