/*
 * Responsibility
 * - tokio runtime start
 * - app::run() call only (no logic here)
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    market_api::app::run().await
}
