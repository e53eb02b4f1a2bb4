use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::{
    sync::{watch, Notify},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::client::error::ClientError;
use crate::models::news::{NewsArticle, NewsQuery, NewsResponse};

#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch(&self, query: &NewsQuery) -> Result<NewsResponse, ClientError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsFeedState {
    pub articles: Vec<NewsArticle>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for NewsFeedState {
    fn default() -> Self {
        Self {
            articles: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

/// Background news poller.
///
/// Fetches once on spawn, then again every `poll_interval` (a zero interval
/// disables polling). Changing the query fetches immediately and restarts the
/// interval. A failed fetch keeps the previous articles. The polling task is
/// aborted when the feed is dropped.
pub struct NewsFeed {
    query: watch::Sender<NewsQuery>,
    refetch: Arc<Notify>,
    state: watch::Receiver<NewsFeedState>,
    task: JoinHandle<()>,
}

impl NewsFeed {
    pub fn spawn(source: Arc<dyn NewsSource>, query: NewsQuery) -> Self {
        let (query_tx, query_rx) = watch::channel(query);
        let (state_tx, state_rx) = watch::channel(NewsFeedState::default());
        let refetch = Arc::new(Notify::new());

        let task = tokio::spawn(poll(source, query_rx, refetch.clone(), state_tx));

        Self {
            query: query_tx,
            refetch,
            state: state_rx,
            task,
        }
    }

    pub fn query(&self) -> NewsQuery {
        self.query.borrow().clone()
    }

    /// Replaces the query. An identical query is ignored.
    pub fn set_query(&self, query: NewsQuery) {
        self.query.send_if_modified(|current| {
            if *current == query {
                return false;
            }
            *current = query;
            true
        });
    }

    pub fn refetch(&self) {
        self.refetch.notify_one();
    }

    pub fn subscribe(&self) -> watch::Receiver<NewsFeedState> {
        self.state.clone()
    }

    pub fn state(&self) -> NewsFeedState {
        self.state.borrow().clone()
    }

    /// Stops polling. Same as dropping the feed.
    pub fn shutdown(self) {}
}

impl Drop for NewsFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll(
    source: Arc<dyn NewsSource>,
    mut query_rx: watch::Receiver<NewsQuery>,
    refetch: Arc<Notify>,
    state: watch::Sender<NewsFeedState>,
) {
    loop {
        let query = query_rx.borrow_and_update().clone();
        state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        match source.fetch(&query).await {
            Ok(response) => {
                debug!(region = %query.region, count = response.articles.len(), "news fetched");
                state.send_modify(|s| {
                    s.articles = response.articles;
                    s.loading = false;
                });
            }
            Err(e) => {
                warn!(region = %query.region, "error fetching news: {}", e);
                state.send_modify(|s| {
                    s.error = Some(e.to_string());
                    s.loading = false;
                });
            }
        }

        tokio::select! {
            changed = query_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = refetch.notified() => {}
            _ = tick(query.poll_interval) => {}
        }
    }
}

async fn tick(interval: Duration) {
    if interval.is_zero() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(interval).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::news::ArticleSource;
    use http::StatusCode;
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };
    use tokio::time::{sleep, Instant};

    const FIVE_SECONDS: Duration = Duration::from_millis(5000);

    #[derive(Default)]
    struct FakeSource {
        regions: Mutex<Vec<String>>,
        failing: AtomicBool,
    }

    impl FakeSource {
        fn calls(&self) -> usize {
            self.regions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NewsSource for FakeSource {
        async fn fetch(&self, query: &NewsQuery) -> Result<NewsResponse, ClientError> {
            self.regions.lock().unwrap().push(query.region.clone());
            if self.failing.load(Ordering::SeqCst) {
                return Err(ClientError::Api {
                    status: StatusCode::TOO_MANY_REQUESTS,
                    message: "quota exceeded".into(),
                    code: None,
                });
            }
            Ok(NewsResponse {
                articles: vec![NewsArticle {
                    title: format!("Mandi prices in {}", query.region),
                    description: String::new(),
                    url: "https://example.com/mandi".into(),
                    image: String::new(),
                    published_at: "2024-06-10T08:00:00Z".into(),
                    source: ArticleSource {
                        name: "Example".into(),
                        url: String::new(),
                    },
                }],
                total_articles: 1,
            })
        }
    }

    async fn settled(feed: &NewsFeed) -> NewsFeedState {
        let mut rx = feed.subscribe();
        let state = rx.wait_for(|s| !s.loading).await.unwrap().clone();
        state
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_once_without_polling() {
        let source = Arc::new(FakeSource::default());
        let feed = NewsFeed::spawn(source.clone(), NewsQuery::default());

        let state = settled(&feed).await;
        assert_eq!(state.articles.len(), 1);
        assert_eq!(state.error, None);

        sleep(Duration::from_secs(600)).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_interval() {
        let source = Arc::new(FakeSource::default());
        let feed = NewsFeed::spawn(
            source.clone(),
            NewsQuery::default().with_poll_interval(FIVE_SECONDS),
        );
        settled(&feed).await;

        sleep(Duration::from_millis(4999)).await;
        assert_eq!(source.calls(), 1);
        sleep(Duration::from_millis(2)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn query_change_refetches_and_restarts_interval() {
        let source = Arc::new(FakeSource::default());
        let query = NewsQuery::default().with_poll_interval(FIVE_SECONDS);
        let feed = NewsFeed::spawn(source.clone(), query.clone());
        settled(&feed).await;

        sleep(Duration::from_millis(1000)).await;
        let changed_at = Instant::now();
        feed.set_query(query.with_region("ranchi"));

        let mut rx = feed.subscribe();
        let state = rx
            .wait_for(|s| !s.loading && s.articles[0].title.ends_with("ranchi"))
            .await
            .unwrap()
            .clone();
        assert_eq!(state.articles.len(), 1);
        assert_eq!(Instant::now(), changed_at);
        assert_eq!(source.calls(), 2);

        // old timer (due at 5000ms) is gone, the new one is due at 6000ms
        sleep(Duration::from_millis(4999)).await;
        assert_eq!(source.calls(), 2);
        sleep(Duration::from_millis(2)).await;
        assert_eq!(*source.regions.lock().unwrap(), ["jharkhand", "ranchi", "ranchi"]);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_query_is_ignored() {
        let source = Arc::new(FakeSource::default());
        let feed = NewsFeed::spawn(source.clone(), NewsQuery::default());
        settled(&feed).await;

        feed.set_query(NewsQuery::default());
        sleep(Duration::from_millis(10)).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refetch_keeps_articles() {
        let source = Arc::new(FakeSource::default());
        let feed = NewsFeed::spawn(source.clone(), NewsQuery::default());
        let before = settled(&feed).await;

        source.failing.store(true, Ordering::SeqCst);
        feed.refetch();

        let mut rx = feed.subscribe();
        let after = rx
            .wait_for(|s| !s.loading && s.error.is_some())
            .await
            .unwrap()
            .clone();
        assert_eq!(after.error.as_deref(), Some("quota exceeded"));
        assert_eq!(after.articles, before.articles);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_feed_stops_polling() {
        let source = Arc::new(FakeSource::default());
        let feed = NewsFeed::spawn(
            source.clone(),
            NewsQuery::default().with_poll_interval(FIVE_SECONDS),
        );
        settled(&feed).await;
        feed.shutdown();

        sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), 1);
    }
}
