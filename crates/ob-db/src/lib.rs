//! Postgres persistence for the Ouroboros control plane.
//!
//! One [`Db`] handle wraps the connection pool; each entity gets its own
//! module of query methods. Queries use runtime-checked `sqlx::query_as`
//! binds so the crate builds without a live database. Schema migrations are
//! managed outside this crate; `schema.sql` documents the expected tables.
//!
//! Every request handler works through its own pooled connection and commits
//! per unit of work; the cleanup worker additionally takes explicit
//! transactions with `FOR UPDATE SKIP LOCKED` row fetches.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

pub mod agents;
pub mod attacks;
pub mod campaigns;
pub mod hash_lists;
pub mod projects;
pub mod resources;
pub mod tasks;
pub mod users;

pub type DbResult<T> = Result<T, sqlx::Error>;

/// Shared database handle. Cheap to clone.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connect to Postgres with a small default pool.
    pub async fn connect(database_url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Build a handle whose connections are only established on first use.
    /// Lets the HTTP layer be constructed (and its auth/error paths tested)
    /// without a reachable database.
    pub fn connect_lazy(database_url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Open an explicit transaction (used by reorder and the cleanup worker).
    pub async fn begin(&self) -> DbResult<Transaction<'static, Postgres>> {
        self.pool.begin().await
    }
}
