pub mod avatar;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod render;
pub mod store;
pub mod view;
pub mod viewport;
pub mod websocket;

use cli::Args;
use config::ViewerConfig;
use log::info;
use render::TerminalRenderer;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::{ mpsc, watch };
use view::ChatView;
use websocket::{ LiveChannel, WsConnector };

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = ViewerConfig::from_args(&args)?;

    info!("--- Viewer Configuration ---");
    info!("History Endpoint: {}", config.fetch_url);
    info!("Live Endpoint: {}", config.ws_url);
    info!("Retry Interval: {:?}", config.retry.interval);
    info!("Max Attempts: {}", config.retry.max_attempts);
    info!("Scroll Threshold: {}", config.scroll_threshold);
    info!("Bump On Message: {}", config.bump_on_message);
    if let Some(id) = &config.select {
        info!("Selected Conversation: {}", id);
    }
    info!("----------------------------");

    let (updates_tx, updates_rx) = mpsc::unbounded_channel();

    // Both producers write into the same queue; the view applies them in arrival order.
    let connector = Arc::new(WsConnector::new(config.ws_url.clone()));
    let channel = LiveChannel::spawn(connector, config.retry, updates_tx.clone());
    let source = history::create_history_source(&config)?;
    let history_task = tokio::spawn(history::load_history(source, updates_tx));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let mut renderer = TerminalRenderer::stdout(&config.avatar_base_url);
    let mut view = ChatView::from_config(&config);
    if let Some(id) = &config.select {
        view.select(id, &mut renderer);
    }
    view.run(updates_rx, &mut renderer, shutdown_rx).await;

    history_task.abort();
    channel.close().await;
    info!("Viewer stopped");
    Ok(())
}
