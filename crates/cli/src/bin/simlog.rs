use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    simlog_cli::main_entry().await
}
