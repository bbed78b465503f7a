use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::models::chat::HistorySnapshot;
use crate::store::StoreUpdate;
use async_trait::async_trait;
use log::{ error, info };
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_chat_record(&self) -> Result<HistorySnapshot, ViewerError>;
}

/// Fetches every known conversation with one `POST` to the server's chat record endpoint.
pub struct HttpHistorySource {
    client: reqwest::Client,
    url: Url,
}

impl HttpHistorySource {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, ViewerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl HistorySource for HttpHistorySource {
    async fn fetch_chat_record(&self) -> Result<HistorySnapshot, ViewerError> {
        let resp = self.client
            .post(self.url.clone())
            .json(&serde_json::json!({}))
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ViewerError::HttpStatus(status));
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

pub fn create_history_source(
    config: &ViewerConfig
) -> Result<Arc<dyn HistorySource>, ViewerError> {
    info!("Chat history will be fetched from: {}", config.fetch_url);
    let source = HttpHistorySource::new(config.fetch_url.clone(), config.fetch_timeout)?;
    Ok(Arc::new(source))
}

/// Fetches the history once and queues it as a single update.
///
/// A failed fetch is logged and leaves the store as it is; it is not retried.
pub async fn load_history(
    source: Arc<dyn HistorySource>,
    updates: mpsc::UnboundedSender<StoreUpdate>
) {
    match source.fetch_chat_record().await {
        Ok(snapshot) => {
            info!("Fetched chat history for {} conversations", snapshot.len());
            if updates.send(StoreUpdate::History(snapshot)).is_err() {
                error!("Update consumer is gone; chat history discarded");
            }
        }
        Err(e) => {
            error!("Failed to fetch chat history: {}", e);
        }
    }
}
