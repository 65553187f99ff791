use crate::error::ScrapeError;
use crate::models::{EpisodeDeep, SeriesDeepDetail, Subtitle};
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime, Transaction};
use log::{error, info};
use tokio_postgres::{Error as PgError, NoTls};

use crate::config::DbConfig;

const UPSERT_SUBTITLE_SQL: &str = "INSERT INTO tbl_subtitles (episode_id, src, label, lang, is_default)
     VALUES ($1, $2, $3, $4, $5)
     ON CONFLICT (episode_id, lang) DO UPDATE SET
        src = EXCLUDED.src,
        label = EXCLUDED.label,
        is_default = EXCLUDED.is_default";

/// Creates and returns a PostgreSQL connection pool
pub fn create_pool(db: &DbConfig) -> Pool {
    info!("Creating PostgreSQL connection pool...");

    let mut cfg = Config::new();
    cfg.host = Some(db.host.clone());
    cfg.port = Some(db.port);
    cfg.dbname = Some(db.dbname.clone());
    cfg.user = Some(db.user.clone());
    cfg.password = Some(db.password.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let pool = cfg
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .expect("Failed to create connection pool");

    info!("PostgreSQL connection pool created successfully");
    pool
}

/// Resolved sources get status 1; anything else (raw player pages, empty
/// sources) gets status 2 and is retried by a later run.
pub fn episode_status(source: &str) -> i32 {
    if source.contains(".m3u8") || source.contains(".mp4") {
        1
    } else {
        2
    }
}

/// Upsert a fully resolved series with its episodes and subtitles in one
/// transaction. Any failure rolls the whole series back; an unreachable
/// database surfaces as `ScrapeError::Pool`.
pub async fn upsert_series(pool: &Pool, series: &SeriesDeepDetail) -> Result<(), ScrapeError> {
    let mut client = pool.get().await.map_err(|e| {
        error!("Failed to get connection from pool: {}", e);
        e
    })?;
    let tx = client.transaction().await.map_err(ScrapeError::Persistence)?;

    info!("Upserting series {} and related data...", series.id);

    if let Err(e) = tx
        .execute(
            "INSERT INTO tbl_series
                (id, title, description, release_date, trailer, country, status, type,
                 next_ep_date_id, episodes_count, label, favorite_id, thumbnail)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                release_date = EXCLUDED.release_date,
                trailer = EXCLUDED.trailer,
                country = EXCLUDED.country,
                status = EXCLUDED.status,
                type = EXCLUDED.type,
                next_ep_date_id = EXCLUDED.next_ep_date_id,
                episodes_count = EXCLUDED.episodes_count,
                label = EXCLUDED.label,
                favorite_id = EXCLUDED.favorite_id,
                thumbnail = EXCLUDED.thumbnail",
            &[
                &series.id,
                &series.title,
                &series.description,
                &series.release_date,
                &series.trailer,
                &series.country,
                &series.status,
                &series.kind,
                &series.next_ep_date_id,
                &series.episodes_count,
                &series.label,
                &series.favorite_id,
                &series.thumbnail,
            ],
        )
        .await
    {
        error!("Failed to upsert series {}: {}", series.id, e);
        return Err(e.into());
    }

    for ep in &series.episodes {
        upsert_episode(&tx, series.id, ep).await?;
    }

    tx.commit().await.map_err(ScrapeError::Persistence)?;
    info!("Upserted series {} successfully", series.id);
    Ok(())
}

/// Upsert one episode and its subtitles inside the series transaction.
pub async fn upsert_episode(
    tx: &Transaction<'_>,
    series_id: i32,
    ep: &EpisodeDeep,
) -> Result<(), PgError> {
    let status_id = episode_status(&ep.source);

    if let Err(e) = tx
        .execute(
            "INSERT INTO tbl_episodes (id, series_id, number, sub, src, status_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                series_id = EXCLUDED.series_id,
                number = EXCLUDED.number,
                sub = EXCLUDED.sub,
                src = EXCLUDED.src,
                status_id = EXCLUDED.status_id",
            &[
                &ep.id,
                &series_id,
                &ep.number,
                &ep.sub,
                &ep.source,
                &status_id,
            ],
        )
        .await
    {
        error!("Failed to upsert episode {}: {}", ep.id, e);
        return Err(e);
    }

    for sub in &ep.subtitles {
        upsert_subtitle(tx, ep.id, sub).await?;
    }
    Ok(())
}

/// Upsert one subtitle track. Keyed by (episode_id, lang): the last track
/// seen for a language wins.
pub async fn upsert_subtitle(
    tx: &Transaction<'_>,
    episode_id: i32,
    sub: &Subtitle,
) -> Result<(), PgError> {
    if let Err(e) = tx
        .execute(
            UPSERT_SUBTITLE_SQL,
            &[&episode_id, &sub.src, &sub.label, &sub.lang, &sub.is_default],
        )
        .await
    {
        error!("Failed to upsert subtitle for episode {}: {}", episode_id, e);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_fixture() -> SeriesDeepDetail {
        SeriesDeepDetail {
            id: 11698,
            title: "My Lovely Liar".to_string(),
            description: String::new(),
            release_date: None,
            trailer: String::new(),
            country: "South Korea".to_string(),
            status: "Completed".to_string(),
            kind: "TVSeries".to_string(),
            next_ep_date_id: 0,
            episodes: Vec::new(),
            episodes_count: 0,
            label: None,
            favorite_id: 0,
            thumbnail: String::new(),
        }
    }

    #[tokio::test]
    async fn test_upsert_surfaces_unreachable_database() {
        // nothing listens on port 1; the pool error must come back as an
        // Err, never a panic
        let db = DbConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..DbConfig::default()
        };
        let pool = create_pool(&db);

        let result = upsert_series(&pool, &series_fixture()).await;
        assert!(matches!(result, Err(ScrapeError::Pool(_))));
    }

    #[test]
    fn test_subtitle_upsert_keyed_per_language() {
        // last write wins per (episode, lang)
        assert!(UPSERT_SUBTITLE_SQL.contains("ON CONFLICT (episode_id, lang) DO UPDATE"));
        assert!(UPSERT_SUBTITLE_SQL.contains("src = EXCLUDED.src"));
        assert!(UPSERT_SUBTITLE_SQL.contains("is_default = EXCLUDED.is_default"));
    }

    #[test]
    fn test_episode_status_resolved() {
        assert_eq!(episode_status("http://localhost:8585/m3u8/cdn/x.m3u8"), 1);
        assert_eq!(episode_status("http://localhost:8585/mp4?url=a.mp4"), 1);
    }

    #[test]
    fn test_episode_status_unresolved() {
        assert_eq!(episode_status(""), 2);
        assert_eq!(episode_status("https://player.example/embed/9"), 2);
    }
}
