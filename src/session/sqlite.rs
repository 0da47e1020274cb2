use super::locks::{KeyedLocks, SessionLock};
use super::record::SessionRecord;
use super::store::{SessionStore, StoreFuture};
use super::types::{Session, SessionKey};
use crate::error::{StoreError, StoreResult};
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

/// Default record lifetime, refreshed on every save.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_NAMESPACE: &str = "session";

const SESSION_SCHEMA_META_TABLE: &str = "
CREATE TABLE IF NOT EXISTS session_schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";
const SESSION_SCHEMA_VERSION_KEY: &str = "session_records_schema_version";
const SESSION_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct SqliteStoreOptions {
    pub ttl: Duration,
    pub namespace: String,
}

impl Default for SqliteStoreOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            namespace: DEFAULT_NAMESPACE.into(),
        }
    }
}

/// Durable TTL-backed session store on SQLite.
///
/// Each session is one JSON record under `"{namespace}:{conversation}:{participant}"`
/// with an absolute `expires_at` (unix millis). Expired rows read as absent and
/// are removed by [`SqliteSessionStore::purge_expired`]. Writes are
/// compare-and-swap on the record revision.
pub struct SqliteSessionStore {
    pool: SqlitePool,
    options: SqliteStoreOptions,
    locks: KeyedLocks,
}

async fn ensure_session_schema_version(pool: &SqlitePool) -> StoreResult<()> {
    sqlx::query(SESSION_SCHEMA_META_TABLE).execute(pool).await?;

    let stored_version: Option<(String,)> =
        sqlx::query_as("SELECT value FROM session_schema_meta WHERE key = $1")
            .bind(SESSION_SCHEMA_VERSION_KEY)
            .fetch_optional(pool)
            .await?;

    if let Some((value,)) = stored_version {
        let parsed = value.parse::<u32>().map_err(|_| {
            StoreError::Schema(format!("invalid session schema version value: {value}"))
        })?;
        if parsed != SESSION_SCHEMA_VERSION {
            return Err(StoreError::Schema(format!(
                "incompatible session schema version: stored={parsed}, expected={SESSION_SCHEMA_VERSION}. \
remove the session database and restart."
            )));
        }
        return Ok(());
    }

    let legacy_table_count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*)
         FROM sqlite_master
         WHERE type = 'table'
           AND name = 'session_records'",
    )
    .fetch_one(pool)
    .await?;

    if legacy_table_count.0 > 0 {
        return Err(StoreError::Schema(
            "session database has records but no schema version metadata. \
remove the session database and restart."
                .into(),
        ));
    }

    sqlx::query("INSERT INTO session_schema_meta (key, value) VALUES ($1, $2)")
        .bind(SESSION_SCHEMA_VERSION_KEY)
        .bind(SESSION_SCHEMA_VERSION.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn revision_to_i64(revision: u64) -> i64 {
    i64::try_from(revision).unwrap_or(i64::MAX)
}

impl SqliteSessionStore {
    /// Wrap an existing pool and run migrations.
    pub async fn new(pool: SqlitePool, options: SqliteStoreOptions) -> StoreResult<Self> {
        ensure_session_schema_version(&pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS session_records (
                 record_key TEXT PRIMARY KEY,
                 payload    TEXT NOT NULL,
                 revision   INTEGER NOT NULL,
                 expires_at INTEGER NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_session_records_expiry
                 ON session_records(expires_at)",
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            options,
            locks: KeyedLocks::new(),
        })
    }

    /// Open (creating if missing) a database file.
    pub async fn open(path: &Path, options: SqliteStoreOptions) -> StoreResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                StoreError::Unavailable(format!(
                    "create session directory {}: {error}",
                    parent.display()
                ))
            })?;
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;

        Self::new(pool, options).await
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn ttl(&self) -> Duration {
        self.options.ttl
    }

    /// Namespaced storage key for a session.
    pub fn record_key(&self, key: SessionKey) -> String {
        format!(
            "{}:{}:{}",
            self.options.namespace, key.conversation_id, key.participant_id
        )
    }

    /// Delete every expired record; returns the number removed.
    pub async fn purge_expired(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM session_records WHERE expires_at <= $1")
            .bind(now_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn expires_at(&self, now: i64) -> i64 {
        let ttl = i64::try_from(self.options.ttl.as_millis()).unwrap_or(i64::MAX);
        now.saturating_add(ttl)
    }

    async fn load(&self, key: SessionKey) -> StoreResult<Session> {
        let row = sqlx::query(
            "SELECT payload, revision
             FROM session_records
             WHERE record_key = $1 AND expires_at > $2",
        )
        .bind(self.record_key(key))
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(Session::new(key));
        };

        let payload: String = row.try_get("payload")?;
        let revision: i64 = row.try_get("revision")?;
        let record = SessionRecord::decode(&payload)?;
        if record.key() != key {
            return Err(StoreError::Schema(format!(
                "record under {} belongs to {}",
                self.record_key(key),
                record.key()
            )));
        }
        record.into_session(u64::try_from(revision).unwrap_or_default())
    }

    async fn replace(&self, session: &mut Session) -> StoreResult<()> {
        let mut next = session.clone();
        next.touch();
        next.revision = session.revision.saturating_add(1);

        let payload = SessionRecord::from_session(&next).encode()?;
        let now = now_millis();

        // Overwrite only the revision we loaded, or a row that already expired.
        let result = sqlx::query(
            "INSERT INTO session_records (record_key, payload, revision, expires_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT(record_key) DO UPDATE
                 SET payload = excluded.payload,
                     revision = excluded.revision,
                     expires_at = excluded.expires_at
                 WHERE session_records.revision = $5
                    OR session_records.expires_at <= $6",
        )
        .bind(self.record_key(next.key))
        .bind(&payload)
        .bind(revision_to_i64(next.revision))
        .bind(self.expires_at(now))
        .bind(revision_to_i64(session.revision))
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                key: session.key,
                expected: session.revision,
            });
        }

        *session = next;
        Ok(())
    }
}

impl SessionStore for SqliteSessionStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn lock(&self, key: SessionKey) -> StoreFuture<'_, SessionLock> {
        Box::pin(self.locks.lock(key))
    }

    fn get_or_create(&self, key: SessionKey) -> StoreFuture<'_, StoreResult<Session>> {
        Box::pin(self.load(key))
    }

    fn save<'a>(&'a self, session: &'a mut Session) -> StoreFuture<'a, StoreResult<()>> {
        Box::pin(self.replace(session))
    }

    fn delete(&self, key: SessionKey) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query("DELETE FROM session_records WHERE record_key = $1")
                .bind(self.record_key(key))
                .execute(&self.pool)
                .await?;
            Ok(())
        })
    }

    fn is_active(&self, key: SessionKey) -> StoreFuture<'_, StoreResult<bool>> {
        Box::pin(async move {
            let active: Option<(Option<i64>,)> = sqlx::query_as(
                "SELECT json_extract(payload, '$.isActive')
                 FROM session_records
                 WHERE record_key = $1 AND expires_at > $2",
            )
            .bind(self.record_key(key))
            .bind(now_millis())
            .fetch_optional(&self.pool)
            .await?;

            Ok(matches!(active, Some((Some(flag),)) if flag != 0))
        })
    }

    fn ping(&self) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }
}
