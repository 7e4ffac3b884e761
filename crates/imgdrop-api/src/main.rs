use imgdrop_api::setup;
use imgdrop_core::Config;

// Use mimalloc as the global allocator, matching the container images we ship.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Database, storage, routes and the Telegram polling loop
    let app = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, app.router, app.poller).await?;

    Ok(())
}
