use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    repowiki_cli::main_entry().await
}
