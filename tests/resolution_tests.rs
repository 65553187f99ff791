use drama_scraper::error::ScrapeError;
use drama_scraper::page_pool::{PageOpener, PagePool};
use drama_scraper::resolver::{backoff_delay, run_with_retries, AttemptOutcome, SniffCapture};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Pool driver that hands out numbered fake pages and counts lifecycle calls.
struct FakePages {
    opened: AtomicUsize,
    closed: AtomicUsize,
    open_limit: usize,
}

impl FakePages {
    fn new() -> Self {
        Self::with_open_limit(usize::MAX)
    }

    fn with_open_limit(open_limit: usize) -> Self {
        Self {
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            open_limit,
        }
    }
}

impl PageOpener for FakePages {
    type Page = usize;

    fn open(&self) -> Result<usize, ScrapeError> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        if n >= self.open_limit {
            return Err(ScrapeError::Browser("tab limit reached".to_string()));
        }
        Ok(n)
    }

    fn close(&self, _page: &usize) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn capture(url: &str) -> SniffCapture {
    SniffCapture {
        video_url: url.to_string(),
        subtitle_path: None,
    }
}

#[tokio::test]
async fn test_concurrency_never_exceeds_pool_capacity() {
    init_logging();
    const CAPACITY: usize = 4;
    const TASKS: usize = 16;

    let pool = Arc::new(PagePool::new(FakePages::new(), CAPACITY).unwrap());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..TASKS {
        let pool = pool.clone();
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        handles.push(tokio::spawn(async move {
            let page = pool.acquire().await;

            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);

            pool.release(page).await;
        }));
    }
    for handle in handles {
        handle.await.expect("episode task panicked");
    }

    let peak = peak.load(Ordering::SeqCst);
    assert!(
        peak <= CAPACITY,
        "peak concurrency {} exceeded pool capacity {}",
        peak,
        CAPACITY
    );
    assert!(peak > 1, "tasks should actually overlap");
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_follow_backoff_schedule() {
    init_logging();
    let pool = PagePool::new(FakePages::new(), 1).unwrap();
    let attempts = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let result = run_with_retries(&pool, 2, |_page, _n| {
        let attempts = attempts.clone();
        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            AttemptOutcome::TimedOut
        }
    })
    .await;

    assert!(result.is_none(), "all attempts timed out");
    assert_eq!(attempts.load(Ordering::SeqCst), 3, "1 initial + 2 retries");
    // backoff 2s after the first failure, 5s after the second; no sleep
    // after the final attempt
    assert_eq!(start.elapsed(), Duration::from_secs(7));

    // each failed attempt closed its page and opened a replacement
    assert_eq!(pool.opener().closed.load(Ordering::SeqCst), 2);
    assert_eq!(pool.opener().opened.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_success_stops_retrying() {
    let pool = PagePool::new(FakePages::new(), 1).unwrap();
    let attempts = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let result = run_with_retries(&pool, 2, |_page, n| {
        let attempts = attempts.clone();
        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                AttemptOutcome::Success(capture("https://cdn.example/a.m3u8"))
            } else {
                AttemptOutcome::Error("player stalled".to_string())
            }
        }
    })
    .await;

    let got = result.expect("second attempt should succeed");
    assert_eq!(got.video_url, "https://cdn.example/a.m3u8");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    // only the first backoff was slept
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test]
async fn test_immediate_success_uses_single_attempt() {
    let pool = PagePool::new(FakePages::new(), 2).unwrap();

    let result = run_with_retries(&pool, 2, |page, _n| {
        let url = format!("https://cdn.example/page-{}.m3u8", page);
        async move { AttemptOutcome::Success(capture(&url)) }
    })
    .await;

    assert!(result.is_some());
    // no page was ever replaced
    assert_eq!(pool.opener().closed.load(Ordering::SeqCst), 0);
    assert_eq!(pool.opener().opened.load(Ordering::SeqCst), 2);

    // the page went back into the pool: both handles are still acquirable
    let a = pool.acquire().await;
    let b = pool.acquire().await;
    pool.release(a).await;
    pool.release(b).await;
}

#[tokio::test(start_paused = true)]
async fn test_replacement_failure_abandons_episode() {
    // one page can be opened for the initial fill, none after that
    let pool = PagePool::new(FakePages::with_open_limit(1), 1).unwrap();
    let attempts = Arc::new(AtomicUsize::new(0));

    let result = run_with_retries(&pool, 2, |_page, _n| {
        let attempts = attempts.clone();
        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            AttemptOutcome::TimedOut
        }
    })
    .await;

    assert!(result.is_none());
    // the first replacement failed, so no further attempts ran
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_backoff_grows_linearly() {
    assert_eq!(backoff_delay(0), Duration::from_secs(2));
    assert_eq!(backoff_delay(1), Duration::from_secs(5));
    assert_eq!(backoff_delay(2), Duration::from_secs(8));
}
