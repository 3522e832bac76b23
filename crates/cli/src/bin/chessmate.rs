#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chessmate_cli::run().await
}
