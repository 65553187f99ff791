use crate::error::ScrapeError;
use headless_chrome::{Browser, Tab};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

/// Opens and closes page handles. Lets the pool be driven by a real browser
/// in production and by a fake in tests.
pub trait PageOpener: Send + Sync {
    type Page: Send;

    fn open(&self) -> Result<Self::Page, ScrapeError>;
    fn close(&self, page: &Self::Page);
}

/// Page opener backed by a shared headless Chrome process.
pub struct ChromePages {
    browser: Arc<Browser>,
}

impl ChromePages {
    pub fn new(browser: Arc<Browser>) -> Self {
        Self { browser }
    }
}

impl PageOpener for ChromePages {
    type Page = Arc<Tab>;

    fn open(&self) -> Result<Arc<Tab>, ScrapeError> {
        self.browser
            .new_tab()
            .map_err(|e| ScrapeError::Browser(e.to_string()))
    }

    fn close(&self, page: &Arc<Tab>) {
        if let Err(e) = page.close(false) {
            log::debug!("page close failed: {}", e);
        }
    }
}

/// Bounded set of reusable page handles shared by concurrent episode tasks.
///
/// Pre-filled to capacity at construction. A handle is held by exactly one
/// task between `acquire` and `release`; `acquire` waits when every handle is
/// checked out. The pool never grows beyond its capacity.
pub struct PagePool<O: PageOpener> {
    opener: O,
    tx: mpsc::Sender<O::Page>,
    rx: Mutex<mpsc::Receiver<O::Page>>,
    capacity: usize,
}

impl<O: PageOpener> PagePool<O> {
    pub fn new(opener: O, capacity: usize) -> Result<Self, ScrapeError> {
        let (tx, rx) = mpsc::channel(capacity);
        for _ in 0..capacity {
            let page = opener.open()?;
            tx.try_send(page)
                .map_err(|_| ScrapeError::Browser("page pool overfilled".to_string()))?;
        }
        Ok(Self {
            opener,
            tx,
            rx: Mutex::new(rx),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Take exclusive ownership of a page, waiting until one is available.
    pub async fn acquire(&self) -> O::Page {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .expect("page pool channel closed while pool alive")
    }

    /// Return a page for reuse by other tasks.
    pub async fn release(&self, page: O::Page) {
        if self.tx.send(page).await.is_err() {
            log::debug!("page pool dropped before release");
        }
    }

    /// Close a broken page and hand back a freshly opened one. The caller
    /// keeps exclusive ownership of the replacement.
    pub async fn replace(&self, page: O::Page) -> Result<O::Page, ScrapeError> {
        self.opener.close(&page);
        drop(page);
        self.opener.open()
    }
}
