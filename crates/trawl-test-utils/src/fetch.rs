use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use trawl_crawl::{FetchError, FetchedPage, PageFetcher};

/// Holds the first fetch until the test releases it.
#[derive(Debug, Default)]
pub struct FetchPause {
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl FetchPause {
    /// Wait until a fetch is parked on the pause.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the parked fetch continue.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Page fetcher answering from a fixed URL map. Unknown URLs are 404s.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, Result<FetchedPage, FetchError>>,
    delays: HashMap<String, Duration>,
    calls: Arc<Mutex<Vec<String>>>,
    pause: Option<Arc<FetchPause>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a page with a title, body text and raw hrefs.
    pub fn with_page(mut self, url: &str, title: &str, text: &str, links: &[&str]) -> Self {
        self.pages.insert(
            url.to_string(),
            Ok(FetchedPage {
                text: text.to_string(),
                title: title.to_string(),
                links: links.iter().map(|link| link.to_string()).collect(),
            }),
        );
        self
    }

    pub fn with_failure(mut self, url: &str, error: FetchError) -> Self {
        self.pages.insert(url.to_string(), Err(error));
        self
    }

    /// Sleep before answering for this URL.
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// Park the first fetch until `FetchPause::release` is called.
    pub fn with_pause(mut self) -> (Self, Arc<FetchPause>) {
        let pause = Arc::new(FetchPause::default());
        pause.armed.store(true, Ordering::SeqCst);
        self.pause = Some(pause.clone());
        (self, pause)
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.lock().push(url.to_string());
        if let Some(pause) = &self.pause
            && pause.armed.swap(false, Ordering::SeqCst)
        {
            pause.entered.notify_one();
            pause.release.notified().await;
        }
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchError::Status(404)))
    }
}
