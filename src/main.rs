use anyhow::Result;
use bookings::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
