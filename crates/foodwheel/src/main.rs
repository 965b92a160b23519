use foodwheel::app::App;
use foodwheel::config;
use foodwheel::sys::runtime;
use nearby::{OverpassClient, Ranker};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = config::load_or_default();
    let client = OverpassClient::new(&config.search.endpoint, config.search.request_timeout())?;

    let (tx, rx) = async_channel::bounded(32);

    // Start Background Services
    runtime::start_background_services(tx.clone(), &config);

    let app = App::new(config, Ranker::new(client), tx, StdRng::from_entropy())?;
    app.run(rx).await;
    Ok(())
}
