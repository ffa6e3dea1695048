//! Connections for the catalogue table.
//!
//! SQLite opens a fresh connection for every batch. PostgreSQL checks one out
//! of a small deadpool. Either way a connection lives only as long as the
//! batch that asked for it.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::AsyncConnection;

#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::deadpool::Pool as DeadPool;
#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
#[cfg(feature = "postgres")]
use diesel_async::AsyncPgConnection;

use super::util::{is_postgres_url, to_diesel_error};

pub type DbError = diesel::result::Error;

pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

#[cfg(feature = "postgres")]
pub type PgConn = deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// A SQLite database file, opened on demand.
#[derive(Clone, Debug)]
pub struct SqliteFile {
    path: String,
}

impl SqliteFile {
    /// Accepts a bare path or a `sqlite:` / `sqlite://` URL.
    fn from_url(url: &str) -> Self {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        Self {
            path: path.to_string(),
        }
    }

    pub async fn get(&self) -> Result<SqliteConn, DbError> {
        SqliteConn::establish(&self.path)
            .await
            .map_err(to_diesel_error)
    }
}

#[cfg(feature = "postgres")]
#[derive(Clone)]
pub struct PgPool {
    pool: DeadPool<AsyncPgConnection>,
}

#[cfg(feature = "postgres")]
impl PgPool {
    /// Pages are persisted one at a time, so the pool never needs more.
    const MAX_SIZE: usize = 2;

    fn connect(url: &str) -> Result<Self, DbError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(url);
        let pool = DeadPool::builder(manager)
            .max_size(Self::MAX_SIZE)
            .build()
            .map_err(to_diesel_error)?;
        Ok(Self { pool })
    }

    pub async fn get(&self) -> Result<PgConn, DbError> {
        self.pool.get().await.map_err(to_diesel_error)
    }
}

/// Backend holding the catalogue table, chosen from the database URL.
#[derive(Clone)]
pub enum DbPool {
    Sqlite(SqliteFile),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

impl DbPool {
    /// `postgres://` and `postgresql://` URLs select PostgreSQL; anything else
    /// is taken as a SQLite location.
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        if is_postgres_url(url) {
            return Self::postgres(url);
        }
        Ok(Self::Sqlite(SqliteFile::from_url(url)))
    }

    #[cfg(feature = "postgres")]
    fn postgres(url: &str) -> Result<Self, DbError> {
        Ok(Self::Postgres(PgPool::connect(url)?))
    }

    #[cfg(not(feature = "postgres"))]
    fn postgres(url: &str) -> Result<Self, DbError> {
        Err(to_diesel_error(format!(
            "{} needs a build with the `postgres` feature",
            super::util::redact_database_url(url)
        )))
    }

    pub fn sqlite_from_path(path: &Path) -> Self {
        Self::Sqlite(SqliteFile::from_url(&path.display().to_string()))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => "postgres",
        }
    }
}

/// Run `$body` with `$conn` bound to a connection from whichever backend
/// `$pool` holds. The body is written once and compiled for each backend.
#[macro_export]
macro_rules! with_conn {
    ($pool:expr, $conn:ident => $body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(pool) => {
                let mut $conn = pool.get().await?;
                $body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(pool) => {
                let mut $conn = pool.get().await?;
                $body
            }
        }
    }};
}

/// Like [`with_conn!`], with a separate body per backend for SQL that
/// differs between them (DDL).
#[macro_export]
macro_rules! with_conn_split {
    ($pool:expr, sqlite: $sqlite_conn:ident => $sqlite_body:expr, postgres: $pg_conn:ident => $pg_body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(pool) => {
                let mut $sqlite_conn = pool.get().await?;
                $sqlite_body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(pool) => {
                let mut $pg_conn = pool.get().await?;
                $pg_body
            }
        }
    }};
}
