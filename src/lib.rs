// Library interface for drama_scraper
// Resolves playable media sources for episodic drama catalog entries

pub mod config;
pub mod decode;
pub mod error;
pub mod helpers;
pub mod models;
pub mod page_pool;
pub mod pg_db;
pub mod resolver;
pub mod rewrite;
pub mod session;
pub mod sniffer;
