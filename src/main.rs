#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = coursiva_rust::run().await {
        eprintln!("coursiva-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
