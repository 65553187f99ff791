/// Errors produced by the resolution pipeline.
///
/// Session and metadata failures abort the whole call; per-episode failures
/// (timeouts, missing video) never abort sibling episodes.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("origin or API unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("episode {episode} not found in series {series}")]
    EpisodeNotFound { series: i32, episode: i32 },

    #[error("no video found for episode {0}")]
    NoVideoFound(f64),

    #[error("database error: {0}")]
    Persistence(#[from] tokio_postgres::Error),

    #[error("database unavailable: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
}
