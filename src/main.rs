//! powercast - Electricity Price Forecasting CLI

use anyhow::Result;

use powercast::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (POWERCAST_DATA_DIR may be set there)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
