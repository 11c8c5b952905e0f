#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = wordcheck::run().await {
        eprintln!("wordcheck fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
