//! SQLite dialect implementation

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::OpenFlags;
use tracing::debug;

use crate::error::{CredentialsError, Result};
use crate::traits::{AsyncConnection, Dialect, SyncConnection};
use crate::types::{ConnectArgs, DatabaseUrl};

const CONNECT_ARGS: &[&str] = &["timeout", "read_only"];

/// SQLite through rusqlite. The URL's database is a file path; an absent,
/// empty or `:memory:` database opens an in-memory database.
///
/// The URL query accepts `mode` (`ro`, `rw`, `rwc`, `memory`), `cache`
/// (`shared`, `private`) and `timeout` in seconds. Any other key is an
/// [`CredentialsError::InvalidUrl`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

#[async_trait]
impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn supports_sync(&self) -> bool {
        true
    }

    fn supports_async(&self) -> bool {
        true
    }

    fn connect_blocking(
        &self,
        url: &DatabaseUrl,
        connect_args: &ConnectArgs,
    ) -> Result<Box<dyn SyncConnection>> {
        let connection = open(url, connect_args)?;
        Ok(Box::new(SqliteConnection { connection }))
    }

    async fn connect(
        &self,
        url: &DatabaseUrl,
        connect_args: &ConnectArgs,
    ) -> Result<Box<dyn AsyncConnection>> {
        let url = url.clone();
        let connect_args = connect_args.clone();

        // SQLite is synchronous, so we run it in a blocking task
        let connection = tokio::task::spawn_blocking(move || open(&url, &connect_args))
            .await
            .map_err(|e| CredentialsError::ConnectionFailed(e.to_string()))??;

        Ok(Box::new(SqliteAsyncConnection {
            connection: Arc::new(Mutex::new(connection)),
        }))
    }
}

/// URL query options, applied through an SQLite `file:` URI.
#[derive(Debug, Default, PartialEq)]
struct QueryOptions<'a> {
    mode: Option<&'a str>,
    cache: Option<&'a str>,
    timeout: Option<f64>,
}

impl<'a> QueryOptions<'a> {
    fn from_url(url: &'a DatabaseUrl) -> Result<Self> {
        let invalid = |key: &str, value: &str| {
            CredentialsError::InvalidUrl(format!(
                "{}: unsupported query parameter `{}={}`",
                url, key, value
            ))
        };

        let mut options = Self::default();
        for (key, value) in url.query() {
            match (key.as_str(), value.as_str()) {
                ("mode", mode @ ("ro" | "rw" | "rwc" | "memory")) => options.mode = Some(mode),
                ("cache", cache @ ("shared" | "private")) => options.cache = Some(cache),
                ("timeout", seconds) => {
                    options.timeout = Some(seconds.parse().map_err(|_| invalid(key, value))?)
                }
                _ => return Err(invalid(key, value)),
            }
        }
        Ok(options)
    }

    fn needs_uri(&self) -> bool {
        self.mode.is_some() || self.cache.is_some()
    }

    fn uri(&self, path: &str) -> String {
        let path = path
            .replace('%', "%25")
            .replace('?', "%3f")
            .replace('#', "%23");
        let params: Vec<String> = [("mode", self.mode), ("cache", self.cache)]
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| format!("{}={}", key, value)))
            .collect();
        format!("file:{}?{}", path, params.join("&"))
    }
}

fn open(url: &DatabaseUrl, connect_args: &ConnectArgs) -> Result<rusqlite::Connection> {
    connect_args.ensure_only(CONNECT_ARGS)?;
    let options = QueryOptions::from_url(url)?;

    let flags = if connect_args.get_bool("read_only")?.unwrap_or(false) {
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
    } else {
        OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI
    };

    let path = url.database().filter(|path| !path.is_empty());
    let connection = if options.needs_uri() {
        let uri = options.uri(path.unwrap_or(":memory:"));
        debug!(uri = %uri, "Opening SQLite database URI");
        rusqlite::Connection::open_with_flags(uri, flags)
    } else {
        match path {
            None | Some(":memory:") => {
                debug!("Opening in-memory SQLite database");
                rusqlite::Connection::open_in_memory_with_flags(flags)
            }
            Some(path) => {
                debug!(path, "Opening SQLite database file");
                rusqlite::Connection::open_with_flags(path, flags)
            }
        }
    }
    .map_err(|e| CredentialsError::ConnectionFailed(e.to_string()))?;

    // connect args win over the URL query
    let timeout = connect_args.get_f64("timeout")?.or(options.timeout);
    if let Some(seconds) = timeout {
        let timeout = Duration::try_from_secs_f64(seconds).map_err(|e| {
            CredentialsError::InvalidConnectArg {
                key: "timeout".to_string(),
                reason: e.to_string(),
            }
        })?;
        connection
            .busy_timeout(timeout)
            .map_err(|e| CredentialsError::ConnectionFailed(e.to_string()))?;
    }

    Ok(connection)
}

fn sqlite_version(connection: &rusqlite::Connection) -> Result<String> {
    let version: String = connection
        .query_row("SELECT sqlite_version()", [], |row| row.get(0))
        .map_err(|e| CredentialsError::ConnectionFailed(e.to_string()))?;
    Ok(format!("SQLite {}", version))
}

/// Blocking SQLite connection.
pub struct SqliteConnection {
    connection: rusqlite::Connection,
}

impl SyncConnection for SqliteConnection {
    fn dialect_name(&self) -> &str {
        "sqlite"
    }

    fn server_version(&mut self) -> Result<String> {
        sqlite_version(&self.connection)
    }
}

/// SQLite connection whose calls run on the blocking thread pool.
pub struct SqliteAsyncConnection {
    connection: Arc<Mutex<rusqlite::Connection>>,
}

#[async_trait]
impl AsyncConnection for SqliteAsyncConnection {
    fn dialect_name(&self) -> &str {
        "sqlite"
    }

    async fn server_version(&self) -> Result<String> {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let connection = connection.lock().unwrap_or_else(PoisonError::into_inner);
            sqlite_version(&connection)
        })
        .await
        .map_err(|e| CredentialsError::ConnectionFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_when_database_is_absent() {
        let url = DatabaseUrl::parse("sqlite://").unwrap();
        let mut connection = SqliteDialect
            .connect_blocking(&url, &ConnectArgs::new())
            .unwrap();
        assert!(connection.server_version().unwrap().starts_with("SQLite "));
    }

    #[test]
    fn test_unknown_connect_arg_is_rejected() {
        let url = DatabaseUrl::parse("sqlite://").unwrap();
        let args = ConnectArgs::new().with("check_same_thread", false);
        assert!(matches!(
            SqliteDialect.connect_blocking(&url, &args),
            Err(CredentialsError::InvalidConnectArg { .. })
        ));
    }

    #[test]
    fn test_negative_timeout_is_rejected() {
        let url = DatabaseUrl::parse("sqlite://").unwrap();
        let args = ConnectArgs::new().with("timeout", -1.0);
        assert!(matches!(
            SqliteDialect.connect_blocking(&url, &args),
            Err(CredentialsError::InvalidConnectArg { .. })
        ));
    }

    #[test]
    fn test_unknown_query_key_is_rejected() {
        let url = DatabaseUrl::parse("sqlite:///app.db?journal=wal").unwrap();
        assert!(matches!(
            SqliteDialect.connect_blocking(&url, &ConnectArgs::new()),
            Err(CredentialsError::InvalidUrl(msg)) if msg.contains("journal=wal")
        ));
    }

    #[test]
    fn test_invalid_query_values_are_rejected() {
        for query in ["mode=readonly", "cache=none", "timeout=soon"] {
            let url = DatabaseUrl::parse(&format!("sqlite://?{}", query)).unwrap();
            assert!(
                matches!(open(&url, &ConnectArgs::new()), Err(CredentialsError::InvalidUrl(_))),
                "{} was accepted",
                query
            );
        }
    }

    #[test]
    fn test_query_options_build_a_uri() {
        let url = DatabaseUrl::parse("sqlite://?cache=shared&mode=memory&timeout=2.5").unwrap();
        let options = QueryOptions::from_url(&url).unwrap();
        assert_eq!(options.timeout, Some(2.5));
        assert_eq!(options.uri("/tmp/a?b#c%d.db"), "file:/tmp/a%3fb%23c%25d.db?mode=memory&cache=shared");

        let url = DatabaseUrl::parse("sqlite:///app.db?timeout=1").unwrap();
        assert!(!QueryOptions::from_url(&url).unwrap().needs_uri());
    }

    #[test]
    fn test_mode_ro_does_not_create_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let url = DatabaseUrl::create("sqlite")
            .with_database(path.to_str().unwrap())
            .with_query_param("mode", "ro");
        assert!(matches!(
            open(&url, &ConnectArgs::new()),
            Err(CredentialsError::ConnectionFailed(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_mode_rwc_creates_and_mode_ro_refuses_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        let database = path.to_str().unwrap();

        let url = DatabaseUrl::create("sqlite")
            .with_database(database)
            .with_query_param("mode", "rwc");
        let connection = open(&url, &ConnectArgs::new()).unwrap();
        connection.execute("CREATE TABLE t (x INTEGER)", []).unwrap();
        drop(connection);
        assert!(path.exists());

        let url = DatabaseUrl::create("sqlite")
            .with_database(database)
            .with_query_param("mode", "ro");
        let connection = open(&url, &ConnectArgs::new()).unwrap();
        assert!(connection.execute("INSERT INTO t VALUES (1)", []).is_err());
    }

    #[test]
    fn test_shared_cache_memory_database_is_shared() {
        let url = DatabaseUrl::parse("sqlite://?cache=shared").unwrap();
        let first = open(&url, &ConnectArgs::new()).unwrap();
        first.execute("CREATE TABLE shared_t (x INTEGER)", []).unwrap();

        let second = open(&url, &ConnectArgs::new()).unwrap();
        let count: i64 = second
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE name = 'shared_t'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_async_connect_runs_on_blocking_pool() {
        let url = DatabaseUrl::parse("sqlite+aiosqlite://").unwrap();
        let connection = SqliteDialect
            .connect(&url, &ConnectArgs::new().with("timeout", 0.5))
            .await
            .unwrap();
        assert_eq!(connection.dialect_name(), "sqlite");
        assert!(connection.server_version().await.unwrap().starts_with("SQLite "));
    }
}
