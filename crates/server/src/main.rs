#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hslookup_server::start().await
}
