#[tokio::main]
async fn main() -> Result<(), eyre::Report> {
    astroledger::run().await
}
