#[tokio::main]
async fn main() -> anyhow::Result<()> {
    quota_gate::app::run().await
}
