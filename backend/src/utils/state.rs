use std::sync::Arc;

use reqwest::Client;

use crate::utils::{config::Config, profile_store::ProfileStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http_client: Client,
    pub profiles: Arc<dyn ProfileStore>,
}

impl AppState {
    pub fn new(config: Config, profiles: Arc<dyn ProfileStore>) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder()
            .connect_timeout(config.http_timeout)
            .user_agent("AgriVision/1.0")
            .build()?;
        Ok(Self {
            config,
            http_client,
            profiles,
        })
    }
}
