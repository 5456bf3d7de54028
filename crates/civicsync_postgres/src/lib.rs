//! civicsync_postgres: PostgreSQL adapter for the civicsync_core ports.
//!
//! Everything lives in the `civicsync` schema. Queries are runtime-checked,
//! so building this crate never needs a live database.

pub mod sqlx_types;
pub mod store;

use sqlx::PgPool;

pub use store::{PgIssueStore, PgUserStore};

const SCHEMA_SQL: &str = include_str!("../migrations/001_civicsync.sql");

/// All Postgres store implementations sharing one pool.
pub struct PgStores {
    pub issues: PgIssueStore,
    pub users: PgUserStore,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            issues: PgIssueStore::new(pool.clone()),
            users: PgUserStore::new(pool),
        }
    }
}

/// Apply the schema. Every statement is `IF NOT EXISTS`, so this is safe to
/// run on every start.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    tracing::info!("civicsync schema is up to date");
    Ok(())
}
