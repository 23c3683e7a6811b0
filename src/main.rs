use anyhow::Result;
use tracing::{error, info};

use cvewatch::config::Config;
use cvewatch::db::Database;
use cvewatch::discord::DiscordNotifier;
use cvewatch::logging::configure_logging;
use cvewatch::pipeline;
use cvewatch::rss::{create_http_client, FeedClient};
use cvewatch::{WatchError, TARGET_DB};

/// One full run: fetch the feed, alert on new advisories, record them. Meant
/// to be scheduled externally (cron, systemd timer).
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logging is not configured yet; anyhow reports a config error on exit.
    let config = Config::from_env()?;

    let _guard = configure_logging(&config.log_dir);
    info!("Starting cvewatch with {:?}", config);

    if let Err(err) = run(&config).await {
        error!("Run aborted during {} stage: {}", err.stage(), err);
        return Err(err.into());
    }

    Ok(())
}

async fn run(config: &Config) -> Result<(), WatchError> {
    let db = Database::new(&config.database_path).await?;

    let client = create_http_client(config.http_timeout)
        .map_err(|err| WatchError::config(format!("failed to build HTTP client: {}", err)))?;
    let feed = FeedClient::new(client.clone(), config.feed_url.as_str());
    let notifier = DiscordNotifier::new(client, config.webhook_url.as_str());

    let result = pipeline::run(&feed, &db, &notifier, config.max_entries).await;

    if result.is_ok() {
        match db.count_advisories().await {
            Ok(count) => info!(target: TARGET_DB, "Store holds {} advisories", count),
            Err(err) => error!(target: TARGET_DB, "Failed to count advisories: {}", err),
        }
    }
    db.close().await;

    result.map(|_| ())
}
