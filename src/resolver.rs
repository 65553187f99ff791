//! Resolution orchestrator.
//!
//! Drives the full pipeline: session bootstrap, metadata decode, concurrent
//! browser-driven source discovery over the page pool, retry with backoff and
//! page replacement, URL classification and proxy rewriting. Episodes within
//! a series resolve independently; a failed episode is skipped, never failing
//! its siblings. The browser lives for one top-level call and is torn down
//! after every episode task has joined.

use crate::config::ScraperConfig;
use crate::decode::{decode_deep_detail, decode_detail, decode_search, decode_subtitles};
use crate::error::ScrapeError;
use crate::helpers::{episode_number_matches, slugify};
use crate::models::{EpisodeDeep, SeriesDeepDetail, SeriesDetail, SeriesSummary, Subtitle};
use crate::page_pool::{ChromePages, PageOpener, PagePool};
use crate::rewrite::{classify, rewrite, rewrite_subtitle, MediaKind};
use crate::session::{SessionClient, SessionContext, ORIGIN};
use crate::sniffer::{remote_string, AUTOPLAY_NUDGE_JS, AWAIT_VIDEO_JS, SNIFFER_JS, SUBTITLE_SLOT_JS};
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{error, info, warn};
use std::ffi::OsStr;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// First video and subtitle URLs read from a page's sniffer slots.
#[derive(Debug, Clone, PartialEq)]
pub struct SniffCapture {
    pub video_url: String,
    pub subtitle_path: Option<String>,
}

/// Outcome of a single resolution attempt, driving the retry state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(SniffCapture),
    TimedOut,
    Error(String),
}

/// Media resolved for one episode, ready for persistence.
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub source: String,
    pub subtitles: Vec<Subtitle>,
}

/// Backoff before retry N: 2s, then 5s, then 8s.
pub fn backoff_delay(attempt: usize) -> Duration {
    Duration::from_secs(2 + attempt as u64 * 3)
}

/// Run up to `1 + max_retries` attempts against a pooled page.
///
/// The page is acquired once; a failed attempt closes it, opens a fresh
/// replacement and sleeps the backoff before the next attempt. Attempts for
/// one episode are strictly sequential. The page is released (whatever its
/// state) before returning.
pub async fn run_with_retries<O, F, Fut>(
    pool: &PagePool<O>,
    max_retries: usize,
    mut attempt: F,
) -> Option<SniffCapture>
where
    O: PageOpener,
    O::Page: Clone,
    F: FnMut(O::Page, usize) -> Fut,
    Fut: Future<Output = AttemptOutcome>,
{
    let mut page = pool.acquire().await;
    let mut capture = None;

    for n in 0..=max_retries {
        match attempt(page.clone(), n).await {
            AttemptOutcome::Success(c) => {
                capture = Some(c);
                break;
            }
            AttemptOutcome::TimedOut => warn!("attempt {} timed out", n + 1),
            AttemptOutcome::Error(e) => warn!("attempt {} failed: {}", n + 1, e),
        }

        if n == max_retries {
            break;
        }

        page = match pool.replace(page).await {
            Ok(fresh) => fresh,
            Err(e) => {
                error!("page replacement failed: {}", e);
                return None;
            }
        };
        tokio::time::sleep(backoff_delay(n)).await;
    }

    pool.release(page).await;
    capture
}

/// Entry point for catalog search and media resolution.
pub struct Scraper {
    config: ScraperConfig,
    session: SessionClient,
}

impl Scraper {
    pub fn new(config: ScraperConfig) -> Result<Self, ScrapeError> {
        let session = SessionClient::new(config.session_timeout())?;
        Ok(Self { config, session })
    }

    /// Search the catalog. Bootstraps a fresh session for the call.
    pub async fn search(&self, keyword: &str) -> Result<Vec<SeriesSummary>, ScrapeError> {
        let ctx = self.session.bootstrap().await?;
        let url = format!(
            "{}api/DramaList/Search?q={}&type=0",
            ORIGIN,
            urlencoding::encode(keyword)
        );
        let bytes = self.session.get_bytes(&url, &ctx).await?;
        Ok(decode_search(&bytes)?)
    }

    /// Fetch shallow series detail: metadata and episode list only.
    pub async fn view_detail(&self, key: &str) -> Result<SeriesDetail, ScrapeError> {
        let ctx = self.session.bootstrap().await?;
        let bytes = self
            .session
            .get_bytes(&detail_api_url(key), &ctx)
            .await?;
        Ok(decode_detail(&bytes)?)
    }

    /// Full pipeline: fetch deep detail, then resolve every episode's media
    /// source concurrently over a shared page pool. Returns once every
    /// episode task has finished; unresolved episodes keep an empty source.
    pub async fn resolve_deep_detail(&self, key: &str) -> Result<SeriesDeepDetail, ScrapeError> {
        let ctx = self.session.bootstrap().await?;
        let bytes = self
            .session
            .get_bytes(&detail_api_url(key), &ctx)
            .await?;
        let mut detail = decode_deep_detail(&bytes)?;

        let browser = Arc::new(launch_browser(&self.config)?);
        let pool = Arc::new(PagePool::new(
            ChromePages::new(browser.clone()),
            self.config.pool_capacity,
        )?);

        let proxy_base = self.config.proxy_base();
        let slug = slugify(&detail.title);
        let attempt_timeout = self.config.attempt_timeout();
        let max_retries = self.config.max_retries;

        let mut tasks = JoinSet::new();
        for (i, ep) in detail.episodes.iter().enumerate() {
            let pool = pool.clone();
            let session = self.session.clone();
            let ctx = ctx.clone();
            let proxy_base = proxy_base.clone();
            let slug = slug.clone();
            let ep_url = episode_page_url(&slug, ep.number, detail.id, ep.id);
            let number = ep.number;

            tasks.spawn(async move {
                let media = resolve_episode_media(
                    &pool,
                    &session,
                    &ctx,
                    &proxy_base,
                    &slug,
                    &ep_url,
                    number,
                    attempt_timeout,
                    max_retries,
                )
                .await;
                (i, media)
            });
        }

        // barrier: no partial reads while resolution is in flight
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((i, Some(media))) => {
                    detail.episodes[i].source = media.source;
                    detail.episodes[i].subtitles = media.subtitles;
                }
                Ok((i, None)) => {
                    warn!(
                        "episode {} left unresolved after retries",
                        detail.episodes[i].number
                    );
                }
                Err(e) => error!("episode task panicked: {}", e),
            }
        }

        // browser (and its pages) torn down here, success or not
        Ok(detail)
    }

    /// Single-episode variant of the pipeline: one page, sequential waits,
    /// no pool, no page replacement.
    pub async fn resolve_episode(
        &self,
        key: i32,
        ep_num: i32,
    ) -> Result<EpisodeDeep, ScrapeError> {
        let ctx = self.session.bootstrap().await?;
        let bytes = self
            .session
            .get_bytes(&detail_api_url(&key.to_string()), &ctx)
            .await?;
        let detail = decode_deep_detail(&bytes)?;

        let target = detail
            .episodes
            .iter()
            .find(|ep| episode_number_matches(ep.number, ep_num))
            .ok_or(ScrapeError::EpisodeNotFound {
                series: key,
                episode: ep_num,
            })?;

        let browser = launch_browser(&self.config)?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        let slug = slugify(&detail.title);
        let ep_url = episode_page_url(&slug, target.number, detail.id, target.id);

        prepare_page(&tab, &ep_url)
            .await
            .map_err(ScrapeError::Browser)?;

        let mut capture = None;
        for attempt in 0..=self.config.max_retries {
            match await_capture(&tab, self.config.attempt_timeout()).await {
                AttemptOutcome::Success(c) => {
                    capture = Some(c);
                    break;
                }
                AttemptOutcome::TimedOut => {
                    warn!("timeout waiting for episode {}, attempt {}", ep_num, attempt + 1)
                }
                AttemptOutcome::Error(e) => warn!("attempt {} failed: {}", attempt + 1, e),
            }
        }
        let capture = capture.ok_or(ScrapeError::NoVideoFound(target.number))?;

        let proxy_base = self.config.proxy_base();
        let kind = classify(&capture.video_url);
        let source = match kind {
            MediaKind::Progressive => rewrite(&proxy_base, &ep_url, kind),
            _ => rewrite(&proxy_base, &capture.video_url, kind),
        };

        let subtitles = match &capture.subtitle_path {
            Some(path) => {
                fetch_subtitles(&self.session, &ctx, &proxy_base, &slug, path).await
            }
            None => Vec::new(),
        };

        Ok(EpisodeDeep {
            id: target.id,
            series_id: key,
            number: target.number,
            sub: target.sub,
            source,
            subtitles,
        })
    }
}

fn detail_api_url(key: &str) -> String {
    format!("{}api/DramaList/Drama/{}", ORIGIN, key)
}

/// Episode page URL; the episode number is truncated to its whole part.
pub fn episode_page_url(slug: &str, number: f64, series_id: i32, episode_id: i32) -> String {
    format!(
        "{}Drama/{}/Episode-{}?id={}&ep={}&page=0&pageSize=100",
        ORIGIN, slug, number as i64, series_id, episode_id
    )
}

fn launch_browser(config: &ScraperConfig) -> Result<Browser, ScrapeError> {
    let options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false)
        .path(config.chrome_path.clone().map(PathBuf::from))
        .args(vec![
            OsStr::new("--disable-gpu"),
            OsStr::new("--disable-sync"),
            OsStr::new("--disable-background-networking"),
            OsStr::new("--disable-default-apps"),
        ])
        .build()
        .map_err(|e| ScrapeError::Browser(e.to_string()))?;

    Browser::new(options).map_err(|e| ScrapeError::Browser(e.to_string()))
}

/// Navigate, wait for load, inject the sniffer and nudge autoplay.
async fn prepare_page(tab: &Arc<Tab>, ep_url: &str) -> Result<(), String> {
    let tab = tab.clone();
    let url = ep_url.to_string();
    let prepared = tokio::task::spawn_blocking(move || -> Result<(), String> {
        tab.navigate_to(&url)
            .map_err(|e| e.to_string())?
            .wait_until_navigated()
            .map_err(|e| e.to_string())?;
        tab.evaluate(SNIFFER_JS, false).map_err(|e| e.to_string())?;
        tab.evaluate(AUTOPLAY_NUDGE_JS, false)
            .map_err(|e| e.to_string())?;
        Ok(())
    })
    .await;

    match prepared {
        Ok(res) => res,
        Err(e) => Err(e.to_string()),
    }
}

/// Race the page's awaitable video slot against the attempt timeout. When
/// the timeout wins, the in-page wait keeps running but its result is
/// discarded. The subtitle slot is read after the race is won, so a video
/// captured near the deadline is never discarded over the follow-up read.
async fn await_capture(tab: &Arc<Tab>, timeout: Duration) -> AttemptOutcome {
    let video_tab = tab.clone();
    let sub_tab = tab.clone();

    run_capture(
        timeout,
        async move {
            let evaluated = tokio::task::spawn_blocking(move || {
                video_tab
                    .evaluate(AWAIT_VIDEO_JS, true)
                    .map_err(|e| e.to_string())
                    .and_then(|video| {
                        remote_string(video.value).ok_or_else(|| "empty video slot".to_string())
                    })
            })
            .await;
            match evaluated {
                Ok(res) => res,
                Err(join_err) => Err(join_err.to_string()),
            }
        },
        move || async move {
            let evaluated = tokio::task::spawn_blocking(move || {
                sub_tab
                    .evaluate(SUBTITLE_SLOT_JS, false)
                    .ok()
                    .and_then(|obj| remote_string(obj.value))
            })
            .await;
            evaluated.ok().flatten()
        },
    )
    .await
}

/// Timeout-scoped attempt core: only the video wait runs under the limit;
/// the subtitle read happens once the video is already in hand.
async fn run_capture<FutV, FS, FutS>(
    limit: Duration,
    wait_video: FutV,
    read_subtitle: FS,
) -> AttemptOutcome
where
    FutV: Future<Output = Result<String, String>>,
    FS: FnOnce() -> FutS,
    FutS: Future<Output = Option<String>>,
{
    let video_url = match tokio::time::timeout(limit, wait_video).await {
        Err(_) => return AttemptOutcome::TimedOut,
        Ok(Err(e)) => return AttemptOutcome::Error(e),
        Ok(Ok(url)) => url,
    };

    let subtitle_path = read_subtitle().await;
    AttemptOutcome::Success(SniffCapture {
        video_url,
        subtitle_path,
    })
}

/// Resolve one episode over the shared pool: retries, classification,
/// rewriting and the soft subtitle leg.
#[allow(clippy::too_many_arguments)]
async fn resolve_episode_media<O: PageOpener<Page = Arc<Tab>>>(
    pool: &PagePool<O>,
    session: &SessionClient,
    ctx: &SessionContext,
    proxy_base: &str,
    slug: &str,
    ep_url: &str,
    number: f64,
    attempt_timeout: Duration,
    max_retries: usize,
) -> Option<ResolvedMedia> {
    info!("processing episode {}", number);

    let capture = run_with_retries(pool, max_retries, |tab, _attempt| {
        let url = ep_url.to_string();
        async move {
            if let Err(e) = prepare_page(&tab, &url).await {
                return AttemptOutcome::Error(e);
            }
            await_capture(&tab, attempt_timeout).await
        }
    })
    .await?;

    info!("found video for episode {}: {}", number, capture.video_url);

    let kind = classify(&capture.video_url);
    let source = rewrite(proxy_base, &capture.video_url, kind);

    let subtitles = match &capture.subtitle_path {
        Some(path) => fetch_subtitles(session, ctx, proxy_base, slug, path).await,
        None => Vec::new(),
    };

    Some(ResolvedMedia { source, subtitles })
}

/// Fetch and decode the subtitle manifest the sniffer surfaced. Failures are
/// soft: the episode proceeds without subtitles.
async fn fetch_subtitles(
    session: &SessionClient,
    ctx: &SessionContext,
    proxy_base: &str,
    slug: &str,
    path: &str,
) -> Vec<Subtitle> {
    let full_url = if path.starts_with("http") {
        path.to_string()
    } else {
        format!("{}{}", ORIGIN.trim_end_matches('/'), path)
    };
    let referer = format!("{}Drama/{}", ORIGIN, slug);

    let bytes = match session
        .get_bytes_with_referer(&full_url, ctx, &referer)
        .await
    {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("subtitle fetch failed: {}", e);
            return Vec::new();
        }
    };

    match decode_subtitles(&bytes) {
        Ok(mut subs) => {
            for sub in &mut subs {
                sub.src = rewrite_subtitle(proxy_base, &sub.src);
            }
            info!("parsed {} subtitles", subs.len());
            subs
        }
        Err(e) => {
            warn!("subtitle decode failed: {}", e);
            Vec::new()
        }
    }
}
