#[tokio::main]
async fn main() -> keyreply::error::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("keyreply=info,serenity=warn"),
    )
    .init();
    log::info!("Starting keyreply Discord bot");

    match keyreply::run().await {
        Ok(()) => {
            log::info!("Bot shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Bot encountered an error: {e}");
            Err(e)
        }
    }
}
