use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use scrapper::web::WebServer;
use scrapper::{
    start_fanout, Config, Database, Ingestor, OutboxNotifier, Result, RssFetcher, Scheduler,
    ScrapperError,
};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = scrapper::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        scrapper::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("Fatal: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    config.validate()?;
    info!("Scrapper - scheduled feed ingestion");

    let db = Database::open(&config.database.path).await?;
    let fetcher = RssFetcher::new(&config.fetch).map_err(|e| ScrapperError::Rss(e.to_string()))?;

    let mut ingestor = Ingestor::new(db.clone(), db.clone(), fetcher)
        .with_store_timeout(Duration::from_secs(config.store.timeout_secs))
        .with_fetch_timeout(Duration::from_secs(config.fetch.total_timeout_secs));

    let fanout = if config.notify.enabled {
        let notifier = OutboxNotifier::new(db.clone(), &config.notify);
        let (queue, handle) = start_fanout(
            db.clone(),
            notifier,
            Duration::from_secs(config.notify.send_timeout_secs),
        );
        ingestor = ingestor.with_fanout(queue);
        Some(handle)
    } else {
        info!("Notifications disabled");
        None
    };
    let ingestor = Arc::new(ingestor);

    let scheduler = if config.scheduler.enabled {
        Some(Scheduler::new(Arc::clone(&ingestor), &config.scheduler).start())
    } else {
        info!("Scheduler disabled");
        None
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let web = if config.web.enabled {
        let server = WebServer::new(&config.web, Arc::clone(&ingestor))?;
        let mut shutdown_rx = shutdown_tx.subscribe();
        Some(tokio::spawn(server.run_until(async move {
            let _ = shutdown_rx.recv().await;
        })))
    } else {
        None
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutting down");

    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
    }

    let _ = shutdown_tx.send(());
    if let Some(web) = web {
        match web.await {
            Ok(Err(e)) => warn!("Trigger API stopped with error: {e}"),
            Err(e) => warn!("Trigger API task failed: {e}"),
            Ok(Ok(())) => {}
        }
    }

    if let Some(fanout) = fanout {
        fanout.stop().await;
    }

    db.close().await;
    info!("Shutdown complete");
    Ok(())
}
