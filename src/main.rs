use anyhow::Result;
use tokio::signal;
use tracing::{error, info};

use feedwatch::environment::Config;
use feedwatch::logging::configure_logging;
use feedwatch::rss::rss_loop;
use feedwatch::TARGET_WEB_REQUEST;

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let config = Config::from_env()?;
    info!(
        target: TARGET_WEB_REQUEST,
        "Starting feedwatch with {} feeds, {} concurrent fetches",
        config.feed_urls.len(),
        config.max_concurrent_fetches
    );

    tokio::select! {
        result = rss_loop(config) => {
            if let Err(ref err) = result {
                error!(target: TARGET_WEB_REQUEST, "Feed loop stopped: {}", err);
            }
            result
        }
        _ = signal::ctrl_c() => {
            info!(target: TARGET_WEB_REQUEST, "Received ctrl-c, shutting down");
            Ok(())
        }
    }
}
