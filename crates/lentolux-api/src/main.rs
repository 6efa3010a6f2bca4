use lentolux_api::setup;
use lentolux_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (database, services, routes)
    let (state, router) = setup::initialize_app(config.clone()).await?;

    // Start the server
    setup::server::start_server(&config, router).await?;

    // Release claims of queued jobs and let running ones finish
    state.social.queue.shutdown().await;
    Ok(())
}
