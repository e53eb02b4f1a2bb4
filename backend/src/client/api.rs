use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::client::{
    chat::{ChatStream, ChatTransport},
    error::ClientError,
    news_feed::NewsSource,
};
use crate::models::{
    chat::{ChatRequest, WireMessage},
    news::{NewsQuery, NewsResponse},
    user::{ProfileUpdate, UserProfile},
    weather::WeatherData,
};

const FAILED_TO_FETCH_NEWS: &str = "Failed to fetch news";

/// Typed client for the AgriVision HTTP API.
#[derive(Clone)]
pub struct HttpApi {
    base_url: String,
    token: Option<String>,
    timeout: Option<Duration>,
    client: Client,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent("AgriVision/1.0")
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout: None,
            client,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Applies to every call except the chat stream, which may run long.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn fetch_news(&self, query: &NewsQuery) -> Result<NewsResponse, ClientError> {
        let res = self
            .request(self.client.get(self.url("/api/news/agriculture")))
            .query(&query.to_params())
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body: Value = res.json().await.unwrap_or(Value::Null);
            let message = body["details"].as_str().unwrap_or(FAILED_TO_FETCH_NEWS);
            warn!("news request failed with {}: {}", status, message);
            return Err(ClientError::Api {
                status,
                message: message.to_string(),
                code: body["code"].as_str().map(str::to_string),
            });
        }
        Self::json(res).await
    }

    pub async fn fetch_weather(&self, location: &str) -> Result<WeatherData, ClientError> {
        let res = self
            .request(self.client.get(self.url("/api/weather")))
            .query(&[("location", location)])
            .send()
            .await?;
        Self::json(Self::check(res).await?).await
    }

    pub async fn fetch_profile(&self) -> Result<UserProfile, ClientError> {
        let res = self
            .authorized(self.client.get(self.url("/api/user/profile")))
            .send()
            .await?;
        Self::json(Self::check(res).await?).await
    }

    pub async fn update_location(&self, location: &str) -> Result<UserProfile, ClientError> {
        let res = self
            .authorized(self.client.patch(self.url("/api/user/profile")))
            .json(&json!({ "location": location }))
            .send()
            .await?;
        Self::json(Self::check(res).await?).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ClientError> {
        let res = self
            .authorized(self.client.put(self.url("/api/user/profile")))
            .json(update)
            .send()
            .await?;
        Self::json(Self::check(res).await?).await
    }

    /// Posts the transcript to `/api/chat` and returns the raw reply body as a
    /// byte stream. Only a 2xx reply is streamed.
    pub async fn open_chat(&self, messages: Vec<WireMessage>) -> Result<ChatStream, ClientError> {
        let res = self
            .client
            .post(self.url("/api/chat"))
            .json(&ChatRequest { messages })
            .send()
            .await?;
        let res = Self::check(res).await?;
        Ok(res
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::from))
            .boxed())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = self.request(builder);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Turns a non-2xx reply into [`ClientError::Api`] using the `{error, code}`
    /// body the server sends.
    async fn check(res: Response) -> Result<Response, ClientError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body: Value = res.json().await.unwrap_or(Value::Null);
        let message = body["error"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
        debug!(%status, "api error: {}", message);
        Err(ClientError::Api {
            status,
            message,
            code: body["code"].as_str().map(str::to_string),
        })
    }

    async fn json<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
        let bytes = res.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl NewsSource for HttpApi {
    async fn fetch(&self, query: &NewsQuery) -> Result<NewsResponse, ClientError> {
        self.fetch_news(query).await
    }
}

#[async_trait]
impl ChatTransport for HttpApi {
    async fn open(&self, messages: Vec<WireMessage>) -> Result<ChatStream, ClientError> {
        self.open_chat(messages).await
    }
}
