use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    redis_exporter::cli::start().await
}
