use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CredentialsError, Result};
use crate::traits::{AsyncConnection, Dialect, SyncConnection};
use crate::types::{ConnectArgs, DatabaseUrl};

/// How an engine hands out connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolPolicy {
    /// No pool: every checkout opens a fresh connection and dropping it closes it.
    #[default]
    NullPool,
}

/// Engine that opens connections by blocking the calling thread.
#[derive(Clone)]
pub struct SyncEngine {
    url: DatabaseUrl,
    connect_args: ConnectArgs,
    pool_policy: PoolPolicy,
    dialect: Arc<dyn Dialect>,
}

impl SyncEngine {
    pub fn url(&self) -> &DatabaseUrl {
        &self.url
    }

    pub fn connect_args(&self) -> &ConnectArgs {
        &self.connect_args
    }

    pub fn pool_policy(&self) -> PoolPolicy {
        self.pool_policy
    }

    pub fn dialect_name(&self) -> &'static str {
        self.dialect.name()
    }

    /// Open a new connection.
    ///
    /// Must not be called from inside an async runtime worker.
    pub fn connect(&self) -> Result<Box<dyn SyncConnection>> {
        debug!(url = %self.url, "Opening sync connection");
        self.dialect.connect_blocking(&self.url, &self.connect_args)
    }
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyncEngine({})", self.url)
    }
}

/// Engine that opens connections on the ambient async runtime.
#[derive(Clone)]
pub struct AsyncEngine {
    url: DatabaseUrl,
    connect_args: ConnectArgs,
    pool_policy: PoolPolicy,
    dialect: Arc<dyn Dialect>,
}

impl AsyncEngine {
    pub fn url(&self) -> &DatabaseUrl {
        &self.url
    }

    pub fn connect_args(&self) -> &ConnectArgs {
        &self.connect_args
    }

    pub fn pool_policy(&self) -> PoolPolicy {
        self.pool_policy
    }

    pub fn dialect_name(&self) -> &'static str {
        self.dialect.name()
    }

    /// Open a new connection.
    pub async fn connect(&self) -> Result<Box<dyn AsyncConnection>> {
        debug!(url = %self.url, "Opening async connection");
        self.dialect.connect(&self.url, &self.connect_args).await
    }
}

impl fmt::Debug for AsyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AsyncEngine({})", self.url)
    }
}

/// Either kind of engine, as returned by
/// [`DatabaseCredentials::get_engine`](crate::DatabaseCredentials::get_engine).
#[derive(Debug, Clone)]
pub enum Engine {
    Sync(SyncEngine),
    Async(AsyncEngine),
}

impl Engine {
    pub fn is_async(&self) -> bool {
        matches!(self, Engine::Async(_))
    }

    pub fn url(&self) -> &DatabaseUrl {
        match self {
            Engine::Sync(engine) => engine.url(),
            Engine::Async(engine) => engine.url(),
        }
    }

    pub fn connect_args(&self) -> &ConnectArgs {
        match self {
            Engine::Sync(engine) => engine.connect_args(),
            Engine::Async(engine) => engine.connect_args(),
        }
    }

    pub fn pool_policy(&self) -> PoolPolicy {
        match self {
            Engine::Sync(engine) => engine.pool_policy(),
            Engine::Async(engine) => engine.pool_policy(),
        }
    }

    pub fn as_sync(&self) -> Option<&SyncEngine> {
        match self {
            Engine::Sync(engine) => Some(engine),
            Engine::Async(_) => None,
        }
    }

    pub fn as_async(&self) -> Option<&AsyncEngine> {
        match self {
            Engine::Async(engine) => Some(engine),
            Engine::Sync(_) => None,
        }
    }

    pub fn into_sync(self) -> Option<SyncEngine> {
        match self {
            Engine::Sync(engine) => Some(engine),
            Engine::Async(_) => None,
        }
    }

    pub fn into_async(self) -> Option<AsyncEngine> {
        match self {
            Engine::Async(engine) => Some(engine),
            Engine::Sync(_) => None,
        }
    }
}

/// Registry of dialects used to build engines.
///
/// `EngineFactory::default()` knows the dialects compiled in through cargo
/// features. Use [`EngineFactory::register`] to add or replace one.
#[derive(Clone)]
pub struct EngineFactory {
    dialects: HashMap<&'static str, Arc<dyn Dialect>>,
}

impl EngineFactory {
    /// A factory with no dialects registered.
    pub fn empty() -> Self {
        Self {
            dialects: HashMap::new(),
        }
    }

    /// Register `dialect` under its name, replacing any previous entry.
    pub fn register(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialects.insert(dialect.name(), dialect);
        self
    }

    /// Names of all registered dialects, sorted.
    pub fn dialect_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.dialects.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Build a sync engine; no connection is attempted.
    pub fn create_engine(
        &self,
        url: DatabaseUrl,
        connect_args: ConnectArgs,
        pool_policy: PoolPolicy,
    ) -> Result<SyncEngine> {
        let dialect = self.resolve(&url)?;
        if !dialect.supports_sync() {
            return Err(CredentialsError::DriverNotAvailable(format!(
                "dialect `{}` has no sync driver",
                dialect.name()
            )));
        }
        info!(url = %url, dialect = dialect.name(), "Created sync engine");
        Ok(SyncEngine {
            url,
            connect_args,
            pool_policy,
            dialect,
        })
    }

    /// Build an async engine; no connection is attempted.
    pub fn create_async_engine(
        &self,
        url: DatabaseUrl,
        connect_args: ConnectArgs,
        pool_policy: PoolPolicy,
    ) -> Result<AsyncEngine> {
        let dialect = self.resolve(&url)?;
        if !dialect.supports_async() {
            return Err(CredentialsError::DriverNotAvailable(format!(
                "dialect `{}` has no async driver",
                dialect.name()
            )));
        }
        info!(url = %url, dialect = dialect.name(), "Created async engine");
        Ok(AsyncEngine {
            url,
            connect_args,
            pool_policy,
            dialect,
        })
    }

    fn resolve(&self, url: &DatabaseUrl) -> Result<Arc<dyn Dialect>> {
        let backend = match url.get_backend_name() {
            "postgres" => "postgresql",
            "mariadb" => "mysql",
            backend => backend,
        };
        self.dialects.get(backend).cloned().ok_or_else(|| {
            CredentialsError::DriverNotAvailable(format!(
                "no dialect registered for `{}` (not compiled?)",
                url.drivername()
            ))
        })
    }
}

impl Default for EngineFactory {
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut factory = Self::empty();
        #[cfg(feature = "postgres")]
        {
            factory = factory.register(Arc::new(crate::dialects::PostgresDialect));
        }
        #[cfg(feature = "mysql")]
        {
            factory = factory.register(Arc::new(crate::dialects::MySqlDialect));
        }
        #[cfg(feature = "sqlite")]
        {
            factory = factory.register(Arc::new(crate::dialects::SqliteDialect));
        }
        factory
    }
}

impl fmt::Debug for EngineFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineFactory")
            .field("dialects", &self.dialect_names())
            .finish()
    }
}

/// Build a sync engine with the default dialects.
pub fn create_engine(
    url: DatabaseUrl,
    connect_args: ConnectArgs,
    pool_policy: PoolPolicy,
) -> Result<SyncEngine> {
    EngineFactory::default().create_engine(url, connect_args, pool_policy)
}

/// Build an async engine with the default dialects.
pub fn create_async_engine(
    url: DatabaseUrl,
    connect_args: ConnectArgs,
    pool_policy: PoolPolicy,
) -> Result<AsyncEngine> {
    EngineFactory::default().create_async_engine(url, connect_args, pool_policy)
}
