//! dbcreds - stored database credentials that build engines on demand
//!
//! Credentials are given either as discrete params (driver, username,
//! password, database, host, port, query) or as one complete URL. Building
//! them validates the combination, renders a canonical URL and decides from
//! the driver name whether engines are sync or async.
//!
//! # Example
//! ```no_run
//! use dbcreds::{DatabaseCredentials, SyncConnection, SyncDriver};
//!
//! # fn main() -> dbcreds::Result<()> {
//! let credentials = DatabaseCredentials::builder()
//!     .driver(SyncDriver::SqlitePysqlite)
//!     .database("/tmp/app.db")
//!     .build()?;
//!
//! let engine = credentials.get_engine()?;
//! let mut connection = engine.as_sync().expect("sqlite+pysqlite is sync").connect()?;
//! println!("{}", connection.server_version()?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dialects;
pub mod engine;
pub mod error;
pub mod traits;
pub mod types;

mod credentials;

// Re-export main types for convenient access
pub use config::CredentialsStore;
pub use credentials::{CredentialsBuilder, DatabaseCredentials, UrlSource};
pub use engine::{
    create_async_engine, create_engine, AsyncEngine, Engine, EngineFactory, PoolPolicy, SyncEngine,
};
pub use error::{CredentialsError, Result};
pub use traits::{AsyncConnection, Dialect, SyncConnection};
pub use types::{AsyncDriver, ConnectArgs, DatabaseUrl, Driver, SecretString, SyncDriver};
