//! macd-scanner - MACD and risk statistics for Solana tokens

use anyhow::Result;

use macd_scanner::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
